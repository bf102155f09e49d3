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

//! Counters for the signer link.
//!
//! Counters are plain atomics so they can be read back through
//! [`EndpointMetrics::snapshot`] with or without an exporter installed. With
//! the `observability` feature enabled every increment is mirrored to the
//! `metrics` facade under the `privval.` prefix.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one endpoint.
///
/// # Examples
///
/// ```rust
/// use privval::observability::EndpointMetrics;
///
/// let metrics = EndpointMetrics::new();
/// metrics.record_connection_accepted();
/// metrics.record_request_sent();
///
/// let stats = metrics.snapshot();
/// assert_eq!(stats.connections_accepted, 1);
/// assert_eq!(stats.requests_sent, 1);
/// assert_eq!(stats.active_connections(), 1);
/// ```
#[derive(Debug, Default)]
pub struct EndpointMetrics {
    connections_accepted: AtomicU64,
    connections_closed: AtomicU64,
    requests_sent: AtomicU64,
    request_failures: AtomicU64,
    heartbeats_sent: AtomicU64,
    heartbeat_failures: AtomicU64,
    reconnect_attempts: AtomicU64,
}

impl EndpointMetrics {
    /// Creates a tracker with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a signer connection being accepted.
    pub fn record_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("privval.connections.accepted").increment(1);
            metrics::gauge!("privval.connections.active").increment(1.0);
        }
    }

    /// Records a signer connection being retired.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("privval.connections.closed").increment(1);
            metrics::gauge!("privval.connections.active").decrement(1.0);
        }
    }

    /// Records a request that completed an exchange.
    pub fn record_request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("privval.requests.sent").increment(1);
    }

    /// Records a request whose exchange failed.
    pub fn record_request_failure(&self) {
        self.request_failures.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("privval.requests.failed").increment(1);
    }

    /// Records a successful liveness probe.
    pub fn record_heartbeat_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("privval.heartbeats.sent").increment(1);
    }

    /// Records a failed liveness probe.
    pub fn record_heartbeat_failure(&self) {
        self.heartbeat_failures.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("privval.heartbeats.failed").increment(1);
    }

    /// Records a reconnect attempt started by the heartbeat loop.
    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("privval.reconnects.attempted").increment(1);
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> EndpointStats {
        EndpointStats {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            request_failures: self.request_failures.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            heartbeat_failures: self.heartbeat_failures.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`EndpointMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Signer connections accepted, including the first one
    pub connections_accepted: u64,
    /// Signer connections closed
    pub connections_closed: u64,
    /// Requests that received a response
    pub requests_sent: u64,
    /// Requests that failed at the transport level
    pub request_failures: u64,
    /// Liveness probes answered with a ping response
    pub heartbeats_sent: u64,
    /// Liveness probes that failed
    pub heartbeat_failures: u64,
    /// Reconnects started by the heartbeat loop
    pub reconnect_attempts: u64,
}

impl EndpointStats {
    /// Number of connections accepted and not yet closed.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.connections_accepted
            .saturating_sub(self.connections_closed)
    }
}

impl std::fmt::Display for EndpointStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connections: {} accepted / {} closed, requests: {} sent / {} failed, \
             heartbeats: {} sent / {} failed, reconnects: {}",
            self.connections_accepted,
            self.connections_closed,
            self.requests_sent,
            self.request_failures,
            self.heartbeats_sent,
            self.heartbeat_failures,
            self.reconnect_attempts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(EndpointMetrics::new().snapshot(), EndpointStats::default());
    }

    #[test]
    fn test_active_connections() {
        let metrics = EndpointMetrics::new();
        metrics.record_connection_accepted();
        metrics.record_connection_accepted();
        metrics.record_connection_closed();

        let stats = metrics.snapshot();
        assert_eq!(stats.active_connections(), 1);

        // Closing more than accepted never underflows.
        metrics.record_connection_closed();
        metrics.record_connection_closed();
        assert_eq!(metrics.snapshot().active_connections(), 0);
    }

    #[test]
    fn test_heartbeat_and_reconnect_counters() {
        let metrics = EndpointMetrics::new();
        metrics.record_heartbeat_sent();
        metrics.record_heartbeat_failure();
        metrics.record_reconnect_attempt();
        metrics.record_request_failure();

        let stats = metrics.snapshot();
        assert_eq!(stats.heartbeats_sent, 1);
        assert_eq!(stats.heartbeat_failures, 1);
        assert_eq!(stats.reconnect_attempts, 1);
        assert_eq!(stats.request_failures, 1);
    }

    #[test]
    fn test_stats_display() {
        let metrics = EndpointMetrics::new();
        metrics.record_reconnect_attempt();
        let text = metrics.snapshot().to_string();
        assert!(text.contains("reconnects: 1"));
    }
}
