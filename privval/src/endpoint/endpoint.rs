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

//! The listener-side signer endpoint.

use crate::endpoint::heartbeat::{HeartbeatExit, spawn_heartbeat};
use crate::endpoint::{ConnectOutcome, ConnectionManager, EndpointConfig, EndpointError};
use crate::observability::EndpointStats;
use crate::serialization::SignerMessage;
use crate::transport::SignerListener;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[cfg(feature = "observability")]
use tracing::{info, instrument, warn};

/// Lifecycle state of a [`SignerListenerEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Constructed, or a previous `start` failed.
    Idle,
    /// `start` is waiting for the first signer to connect.
    Starting,
    /// Connected at least once; the heartbeat loop was launched.
    Running,
    /// `stop` was called. Terminal.
    Stopped,
}

struct HeartbeatTask {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<HeartbeatExit>,
}

enum Lifecycle {
    Idle,
    Starting,
    Running(HeartbeatTask),
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> EndpointState {
        match self {
            Self::Idle => EndpointState::Idle,
            Self::Starting => EndpointState::Starting,
            Self::Running(_) => EndpointState::Running,
            Self::Stopped => EndpointState::Stopped,
        }
    }
}

/// The validator side of a remote-signer link.
///
/// The endpoint listens, a remote signer dials in, and from then on the
/// endpoint keeps that single link alive: a background heartbeat probes it
/// every [`heartbeat_period`](EndpointConfig::heartbeat_period) and accepts a
/// replacement connection when a probe fails. Signing requests are sent with
/// [`send_request`](Self::send_request) from any number of tasks; they are
/// serialized with the heartbeat on one mutex.
///
/// # Lifecycle
///
/// `Idle -> Starting -> Running -> Stopped`. `start` may be retried after it
/// fails; nothing can be restarted after `stop`.
///
/// # Examples
///
/// ```rust
/// use privval::endpoint::{EndpointConfig, SignerListenerEndpoint};
/// use privval::serialization::{SignerMessage, framing};
/// use privval::transport::memory_listener;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (listener, dialer) = memory_listener("validator");
/// let endpoint = SignerListenerEndpoint::with_config(
///     listener,
///     EndpointConfig::new().with_heartbeat_period(Duration::from_secs(30)),
/// );
///
/// let mut signer = dialer.dial().await?;
/// endpoint.start().await?;
///
/// let signer_task = tokio::spawn(async move {
///     let _request = framing::read_message(&mut signer).await?;
///     let response = SignerMessage::PubKeyResponse { pub_key: vec![7; 32], error: None };
///     framing::write_message(&mut signer, &response).await
/// });
///
/// let response = endpoint.send_request(&SignerMessage::PubKeyRequest).await?;
/// assert_eq!(response.name(), "PubKeyResponse");
/// signer_task.await??;
///
/// endpoint.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct SignerListenerEndpoint<L> {
    config: EndpointConfig,
    manager: Arc<ConnectionManager<L>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<L: SignerListener> SignerListenerEndpoint<L> {
    /// Creates an idle endpoint with the default configuration.
    pub fn new(listener: L) -> Self {
        Self::with_config(listener, EndpointConfig::default())
    }

    /// Creates an idle endpoint. The configuration is validated by
    /// [`start`](Self::start).
    pub fn with_config(listener: L, config: EndpointConfig) -> Self {
        let manager = Arc::new(ConnectionManager::new(listener, &config));
        Self {
            config,
            manager,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> EndpointState {
        self.lifecycle.lock().state()
    }

    /// Returns `true` between a successful `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.state() == EndpointState::Running
    }

    /// Returns `true` while the heartbeat task is alive.
    ///
    /// Becomes `false` once the loop terminates on its own, for example
    /// after an unexpected ping response, even though the endpoint is still
    /// running and usable for requests.
    pub fn is_heartbeat_running(&self) -> bool {
        match &*self.lifecycle.lock() {
            Lifecycle::Running(task) => !task.handle.is_finished(),
            _ => false,
        }
    }

    /// Returns a snapshot of the endpoint counters.
    pub fn stats(&self) -> EndpointStats {
        self.manager.metrics().snapshot()
    }

    /// Returns the listener's address, for logs and for telling the signer
    /// where to dial.
    pub fn local_addr(&self) -> Result<String, EndpointError> {
        Ok(self.manager.listener().local_addr()?)
    }

    /// Waits for the first signer connection, then launches the heartbeat.
    ///
    /// The wait has no deadline. A concurrent [`stop`](Self::stop) ends it.
    ///
    /// # Errors
    ///
    /// - [`EndpointError::InvalidConfiguration`] if the configuration fails
    ///   [`EndpointConfig::validate`]
    /// - [`EndpointError::AlreadyStarted`] / [`EndpointError::AlreadyStopped`]
    ///   for lifecycle misuse
    /// - [`EndpointError::ListenerClosed`] if the listener closed before a
    ///   signer connected
    /// - [`EndpointError::Transport`] if accepting failed
    ///
    /// On the last two the endpoint returns to [`EndpointState::Idle`] and no
    /// heartbeat is started.
    #[cfg_attr(
        feature = "observability",
        instrument(skip(self), fields(endpoint = self.config.display_id()))
    )]
    pub async fn start(&self) -> Result<(), EndpointError> {
        self.config.validate()?;

        {
            let mut lifecycle = self.lifecycle.lock();
            match *lifecycle {
                Lifecycle::Idle => *lifecycle = Lifecycle::Starting,
                Lifecycle::Starting | Lifecycle::Running(_) => {
                    return Err(EndpointError::AlreadyStarted);
                }
                Lifecycle::Stopped => return Err(EndpointError::AlreadyStopped),
            }
        }

        let outcome = self.manager.connect().await;

        let mut lifecycle = self.lifecycle.lock();
        if matches!(*lifecycle, Lifecycle::Stopped) {
            // `stop` ran while we were accepting and owns the teardown.
            return Err(EndpointError::AlreadyStopped);
        }

        match outcome {
            Ok(ConnectOutcome::Connected) => {}
            Ok(ConnectOutcome::ListenerClosed) => {
                *lifecycle = Lifecycle::Idle;
                return Err(EndpointError::ListenerClosed);
            }
            Err(e) => {
                #[cfg(feature = "observability")]
                warn!("Failed to accept first signer connection: {}", e);
                *lifecycle = Lifecycle::Idle;
                return Err(e.into());
            }
        }

        let (cancel, handle) = spawn_heartbeat(self.manager.clone(), self.config.heartbeat_period);
        *lifecycle = Lifecycle::Running(HeartbeatTask { cancel, handle });

        #[cfg(feature = "observability")]
        info!(period = ?self.config.heartbeat_period, "Signer endpoint started");

        Ok(())
    }

    /// Cancels the heartbeat and closes the connection and the listener.
    ///
    /// Any accept or exchange blocked on the link is released with an error.
    /// The heartbeat task is awaited before returning. Calling `stop` again
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// - [`EndpointError::NotStarted`] if `start` was never called
    /// - [`EndpointError::Transport`] if closing the listener or the
    ///   connection failed; teardown still ran to completion
    #[cfg_attr(
        feature = "observability",
        instrument(skip(self), fields(endpoint = self.config.display_id()))
    )]
    pub async fn stop(&self) -> Result<(), EndpointError> {
        let heartbeat = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Idle => {
                    *lifecycle = Lifecycle::Idle;
                    return Err(EndpointError::NotStarted);
                }
                Lifecycle::Stopped => return Ok(()),
                Lifecycle::Starting => None,
                Lifecycle::Running(task) => Some(task),
            }
        };

        let handle = heartbeat.map(|task| {
            // The loop may already have exited on its own.
            let _ = task.cancel.send(());
            task.handle
        });

        let closed = self.manager.close().await;

        if let Some(handle) = handle {
            match handle.await {
                Ok(_exit) => {
                    #[cfg(feature = "observability")]
                    info!(exit = %_exit, "Heartbeat task joined");
                }
                Err(_e) => {
                    #[cfg(feature = "observability")]
                    warn!("Heartbeat task failed: {}", _e);
                }
            }
        }

        #[cfg(feature = "observability")]
        info!(stats = %self.stats(), "Signer endpoint stopped");

        Ok(closed?)
    }

    /// Sends a request to the signer and returns its response.
    ///
    /// Waits for any exchange or reconnect in progress. Errors are returned
    /// as-is and nothing is retried; the heartbeat is responsible for
    /// replacing a broken connection.
    pub async fn send_request(&self, request: &SignerMessage) -> Result<SignerMessage, EndpointError> {
        Ok(self.manager.send_request(request).await?)
    }
}

impl<L> std::fmt::Debug for SignerListenerEndpoint<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerListenerEndpoint")
            .field("config", &self.config)
            .field("state", &self.lifecycle.lock().state())
            .field("manager", &self.manager)
            .finish()
    }
}
