//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Periodic liveness probing with reconnect-on-failure.
//!
//! The loop is in one of two states: probing, where it waits for the next
//! tick or for cancellation, and terminated. On every tick it sends a ping
//! through the [`ConnectionManager`]:
//!
//! | probe result                  | action                                   |
//! |-------------------------------|------------------------------------------|
//! | ping response                 | keep probing                             |
//! | transport error or timeout    | one reconnect attempt, keep probing      |
//! | reconnect finds listener shut | terminate ([`HeartbeatExit::ListenerClosed`]) |
//! | well-formed, wrong variant    | terminate ([`HeartbeatExit::UnexpectedResponse`]) |
//!
//! A wrong-variant answer means the signer is alive but speaks a different
//! protocol. Reconnecting cannot fix that, so the loop stops without touching
//! the connection and direct requests keep working.

use crate::endpoint::{ConnectOutcome, ConnectionManager, EndpointError};
use crate::transport::SignerListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[cfg(feature = "observability")]
use tracing::{debug, error, info};

/// Why the heartbeat loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// The cancellation signal fired or its sender was dropped.
    Cancelled,
    /// The signer answered a ping with a different message variant.
    UnexpectedResponse,
    /// A reconnect attempt found the listener closed.
    ListenerClosed,
}

impl std::fmt::Display for HeartbeatExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::UnexpectedResponse => write!(f, "unexpected response"),
            Self::ListenerClosed => write!(f, "listener closed"),
        }
    }
}

/// Spawns the heartbeat loop onto the current runtime.
///
/// Returns the cancellation sender and the task handle. Sending on, or
/// dropping, the sender ends the loop at its next wait point.
pub(crate) fn spawn_heartbeat<L: SignerListener>(
    manager: Arc<ConnectionManager<L>>,
    period: Duration,
) -> (oneshot::Sender<()>, JoinHandle<HeartbeatExit>) {
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let handle = tokio::spawn(run_heartbeat(manager, period, cancel_rx));
    (cancel_tx, handle)
}

/// Runs the heartbeat loop until it is cancelled or hits a fatal condition.
///
/// The first probe happens one `period` after the call. If a probe or
/// reconnect overruns the period, the next tick is pushed back rather than
/// fired in a burst, so reconnects are attempted at most once per period.
pub(crate) async fn run_heartbeat<L: SignerListener>(
    manager: Arc<ConnectionManager<L>>,
    period: Duration,
    mut cancel: oneshot::Receiver<()>,
) -> HeartbeatExit {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    #[cfg(feature = "observability")]
    debug!(?period, "Heartbeat loop started");

    let exit = loop {
        tokio::select! {
            biased;
            _ = &mut cancel => break HeartbeatExit::Cancelled,
            _ = ticker.tick() => {}
        }

        if let Some(exit) = probe(&manager).await {
            break exit;
        }
    };

    #[cfg(feature = "observability")]
    info!(%exit, "Heartbeat loop stopped");

    exit
}

/// One tick: ping, and on a recoverable failure try a single reconnect.
async fn probe<L: SignerListener>(manager: &ConnectionManager<L>) -> Option<HeartbeatExit> {
    let metrics = manager.metrics();

    let err = match manager.ping().await {
        Ok(()) => {
            metrics.record_heartbeat_sent();
            return None;
        }
        Err(err) => err,
    };

    metrics.record_heartbeat_failure();

    #[cfg(feature = "observability")]
    error!("Heartbeat to remote signer failed: {}", err);

    if err.is_fatal_for_heartbeat() {
        return Some(match err {
            EndpointError::ListenerClosed => HeartbeatExit::ListenerClosed,
            _ => HeartbeatExit::UnexpectedResponse,
        });
    }

    metrics.record_reconnect_attempt();

    match manager.connect().await {
        Ok(ConnectOutcome::Connected) => {
            #[cfg(feature = "observability")]
            info!("Re-established connection to remote signer");
            None
        }
        Ok(ConnectOutcome::ListenerClosed) => Some(HeartbeatExit::ListenerClosed),
        Err(_e) => {
            #[cfg(feature = "observability")]
            error!("Reconnecting to remote signer failed: {}", _e);
            None
        }
    }
}
