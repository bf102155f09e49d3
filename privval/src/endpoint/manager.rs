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

//! Ownership of the listener and the single active signer connection.
//!
//! [`ConnectionManager`] keeps the current [`SignerConnection`] behind one
//! async mutex. Every exchange and every connection replacement takes that
//! mutex, so request and response frames of different callers can never
//! interleave on the wire and a reconnect can never happen in the middle of
//! an exchange.
//!
//! A separate shutdown latch is checked by everything that blocks while
//! holding the mutex. [`ConnectionManager::close`] trips the latch first, so
//! a pending accept or exchange gives the mutex up promptly instead of
//! stalling teardown until its deadline.

use crate::endpoint::{EndpointConfig, EndpointError};
use crate::observability::EndpointMetrics;
use crate::serialization::SignerMessage;
use crate::transport::latch::CloseLatch;
use crate::transport::{SignerConnection, SignerListener, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[cfg(feature = "observability")]
use tracing::{debug, info, instrument, warn};

/// Result of a successful [`ConnectionManager::connect`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A signer connected and is now the active connection.
    Connected,
    /// The listener is closed; no connection is held.
    ListenerClosed,
}

/// Owns a [`SignerListener`] and at most one active [`SignerConnection`].
pub struct ConnectionManager<L> {
    listener: L,
    connection: Mutex<Option<SignerConnection>>,
    shutdown: CloseLatch,
    read_timeout: Duration,
    write_timeout: Duration,
    label: String,
    metrics: Arc<EndpointMetrics>,
}

impl<L: SignerListener> ConnectionManager<L> {
    /// Creates a manager with no active connection.
    pub fn new(listener: L, config: &EndpointConfig) -> Self {
        Self {
            listener,
            connection: Mutex::new(None),
            shutdown: CloseLatch::new(),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            label: config.display_id().to_string(),
            metrics: Arc::new(EndpointMetrics::new()),
        }
    }

    /// Returns the listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Returns the counters shared with the endpoint.
    pub fn metrics(&self) -> &Arc<EndpointMetrics> {
        &self.metrics
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    /// Returns `true` if a connection is currently held.
    ///
    /// Waits for the mutex, so this blocks while an accept or an exchange
    /// is in progress.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Replaces the active connection with the next one the listener accepts.
    ///
    /// The previous connection, if any, is closed before accepting. A failure
    /// to close it is logged and otherwise ignored. The accept itself has no
    /// deadline.
    ///
    /// # Errors
    ///
    /// Returns the listener's accept error. The manager holds no connection
    /// afterwards.
    #[cfg_attr(
        feature = "observability",
        instrument(skip(self), fields(endpoint = %self.label))
    )]
    pub async fn connect(&self) -> Result<ConnectOutcome, TransportError> {
        if self.shutdown.is_closed() {
            return Ok(ConnectOutcome::ListenerClosed);
        }

        let mut connection = self.connection.lock().await;

        if let Some(previous) = connection.take() {
            // Failure is already logged; the replacement does not depend on it.
            let _ = self.close_connection(previous).await;
        }

        let accepted = tokio::select! {
            biased;
            _ = self.shutdown.closed() => None,
            result = self.listener.accept() => result?,
        };

        let Some(transport) = accepted else {
            #[cfg(feature = "observability")]
            info!("Signer listener closed while waiting for a connection");
            return Ok(ConnectOutcome::ListenerClosed);
        };

        let accepted = SignerConnection::new(transport, self.read_timeout, self.write_timeout);

        #[cfg(feature = "observability")]
        info!(transport = %accepted.metadata(), "Signer connected");

        self.metrics.record_connection_accepted();
        *connection = Some(accepted);

        Ok(ConnectOutcome::Connected)
    }

    /// Sends one request and waits for its response.
    ///
    /// The mutex is held from the start of the write until the response is
    /// read, so exchanges are atomic with respect to each other and to
    /// [`connect`](Self::connect). Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotConnected`] if no connection is held
    /// - [`TransportError::Closed`] if the manager is closed mid-exchange
    /// - any error from writing the request or reading the response; the
    ///   read is skipped if the write fails
    ///
    /// Every error that leaves the stream out of step (a timeout, an I/O or
    /// decode failure, or a close mid-exchange) also drops the connection,
    /// so later calls fail with [`TransportError::NotConnected`] until the
    /// next [`connect`](Self::connect). A well-formed response of the wrong
    /// kind keeps it.
    pub async fn send_request(&self, request: &SignerMessage) -> Result<SignerMessage, TransportError> {
        let result = self.exchange(request).await;

        match &result {
            Ok(_response) => {
                #[cfg(feature = "observability")]
                debug!(request = request.name(), response = _response.name(), "Exchange completed");
                self.metrics.record_request_sent();
            }
            Err(_e) => {
                #[cfg(feature = "observability")]
                debug!(request = request.name(), "Exchange failed: {}", _e);
                self.metrics.record_request_failure();
            }
        }

        result
    }

    /// Sends a liveness probe.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::UnexpectedResponse`] if the signer answers
    /// with anything other than a ping response, and
    /// [`EndpointError::Transport`] for every other failure.
    pub async fn ping(&self) -> Result<(), EndpointError> {
        let response = self.exchange(&SignerMessage::PingRequest).await?;

        if response.is_ping_response() {
            Ok(())
        } else {
            Err(EndpointError::UnexpectedResponse {
                expected: SignerMessage::PingResponse.name(),
                actual: response.name(),
            })
        }
    }

    /// Closes the listener and the active connection.
    ///
    /// Both are attempted even if one of them fails. Each failure is logged;
    /// the listener's error is returned in preference to the connection's.
    /// Calling `close` again only retries the listener close, which is a
    /// no-op for the bundled listeners.
    ///
    /// Safe to call while another task is blocked in
    /// [`connect`](Self::connect) or [`send_request`](Self::send_request):
    /// that call returns promptly with [`ConnectOutcome::ListenerClosed`] or
    /// [`TransportError::Closed`].
    pub async fn close(&self) -> Result<(), TransportError> {
        self.shutdown.close();

        let listener_result = self.listener.close();
        if let Err(_e) = &listener_result {
            #[cfg(feature = "observability")]
            warn!(endpoint = %self.label, "Failed to close signer listener: {}", _e);
        }

        let previous = self.connection.lock().await.take();
        let connection_result = match previous {
            Some(connection) => self.close_connection(connection).await,
            None => Ok(()),
        };

        listener_result.and(connection_result)
    }

    async fn exchange(&self, request: &SignerMessage) -> Result<SignerMessage, TransportError> {
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let result = tokio::select! {
            biased;
            _ = self.shutdown.closed() => Err(TransportError::Closed),
            result = connection.exchange(request) => result,
        };

        // A late response must never reach the next caller.
        if let Err(e) = &result {
            if e.poisons_connection() {
                if let Some(poisoned) = guard.take() {
                    #[cfg(feature = "observability")]
                    warn!(endpoint = %self.label, request = request.name(), "Dropping signer connection: {}", e);
                    // Failure is already logged by close_connection.
                    let _ = self.close_connection(poisoned).await;
                }
            }
        }

        result
    }

    async fn close_connection(&self, connection: SignerConnection) -> Result<(), TransportError> {
        #[cfg(feature = "observability")]
        let transport = connection.metadata().to_string();

        let result = connection.close().await;
        self.metrics.record_connection_closed();

        match &result {
            Ok(()) => {
                #[cfg(feature = "observability")]
                debug!(endpoint = %self.label, %transport, "Closed signer connection");
            }
            Err(_e) => {
                #[cfg(feature = "observability")]
                warn!(endpoint = %self.label, %transport, "Failed to close signer connection: {}", _e);
            }
        }

        result
    }
}

impl<L> std::fmt::Debug for ConnectionManager<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("label", &self.label)
            .field("closed", &self.shutdown.is_closed())
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::framing;
    use crate::transport::{MemoryDialer, MemoryListener, MemoryTransport, memory_listener};
    use tokio::io::AsyncWriteExt;

    fn manager(name: &str) -> (Arc<ConnectionManager<MemoryListener>>, MemoryDialer) {
        let (listener, dialer) = memory_listener(name);
        let config = EndpointConfig::new().with_io_timeout(Duration::from_millis(200));
        (Arc::new(ConnectionManager::new(listener, &config)), dialer)
    }

    async fn answer(signer: &mut MemoryTransport, response: SignerMessage) -> SignerMessage {
        let request = framing::read_message(signer).await.unwrap();
        framing::write_message(signer, &response).await.unwrap();
        request
    }

    #[tokio::test]
    async fn test_send_without_connection_is_not_connected() {
        let (manager, _dialer) = manager("not-connected");
        let err = manager
            .send_request(&SignerMessage::PingRequest)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
        assert_eq!(manager.metrics().snapshot().request_failures, 1);
    }

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let (manager, dialer) = manager("exchange");
        let mut signer = dialer.dial().await.unwrap();

        assert_eq!(manager.connect().await.unwrap(), ConnectOutcome::Connected);
        assert!(manager.is_connected().await);

        let peer = tokio::spawn(async move {
            answer(&mut signer, SignerMessage::PingResponse).await
        });
        manager.ping().await.unwrap();
        assert_eq!(peer.await.unwrap(), SignerMessage::PingRequest);

        let stats = manager.metrics().snapshot();
        assert_eq!(stats.connections_accepted, 1);
        assert_eq!(stats.requests_sent, 0);
    }

    #[tokio::test]
    async fn test_ping_with_wrong_response_is_unexpected() {
        let (manager, dialer) = manager("wrong-kind");
        let mut signer = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        tokio::spawn(async move {
            answer(&mut signer, SignerMessage::PubKeyRequest).await;
            signer
        });

        let err = manager.ping().await.unwrap_err();
        assert!(matches!(
            err,
            EndpointError::UnexpectedResponse {
                expected: "PingResponse",
                actual: "PubKeyRequest"
            }
        ));
    }

    #[tokio::test]
    async fn test_late_response_is_not_delivered_to_next_request() {
        let (manager, dialer) = manager("late-response");
        let mut signer = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        let late = tokio::spawn(async move {
            let request = framing::read_message(&mut signer).await.unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            // The endpoint has hung up by now, so this write may fail.
            let response = SignerMessage::PubKeyResponse {
                pub_key: vec![7; 32],
                error: None,
            };
            let _ = framing::write_message(&mut signer, &response).await;
            request
        });

        let err = manager
            .send_request(&SignerMessage::PubKeyRequest)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(!manager.is_connected().await);
        assert_eq!(late.await.unwrap(), SignerMessage::PubKeyRequest);

        let err = manager
            .send_request(&SignerMessage::SignVoteRequest { vote: vec![1] })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));

        // A fresh connection serves requests again.
        let mut replacement = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();
        let peer = tokio::spawn(async move {
            answer(&mut replacement, SignerMessage::PingResponse).await
        });
        manager.ping().await.unwrap();
        assert_eq!(peer.await.unwrap(), SignerMessage::PingRequest);

        let stats = manager.metrics().snapshot();
        assert_eq!(stats.connections_accepted, 2);
        assert_eq!(stats.connections_closed, 1);
        assert_eq!(stats.request_failures, 2);
    }

    #[tokio::test]
    async fn test_partially_read_response_drops_connection() {
        let (manager, dialer) = manager("half-frame");
        let mut signer = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        let peer = tokio::spawn(async move {
            framing::read_message(&mut signer).await.unwrap();
            let payload = framing::encode(&SignerMessage::PingResponse).unwrap();
            signer
                .write_all(&(payload.len() as u32).to_be_bytes())
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            let _ = signer.write_all(&payload).await;
        });

        let err = manager.ping().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(!manager.is_connected().await);

        peer.await.unwrap();
        let err = manager.ping().await.unwrap_err();
        assert!(matches!(
            err,
            EndpointError::Transport(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_wrong_response_keeps_connection() {
        let (manager, dialer) = manager("wrong-keeps");
        let mut signer = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        let peer = tokio::spawn(async move {
            answer(&mut signer, SignerMessage::PubKeyRequest).await;
            answer(&mut signer, SignerMessage::PingResponse).await
        });

        assert!(manager.ping().await.is_err());
        assert!(manager.is_connected().await);
        manager.ping().await.unwrap();
        assert_eq!(peer.await.unwrap(), SignerMessage::PingRequest);
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_connection() {
        let (manager, dialer) = manager("replace");
        let mut first = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        let _second = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        // The first signer sees end-of-stream once its connection is retired.
        assert!(framing::read_message(&mut first).await.is_err());

        let stats = manager.metrics().snapshot();
        assert_eq!(stats.connections_accepted, 2);
        assert_eq!(stats.connections_closed, 1);
        assert_eq!(stats.active_connections(), 1);
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_connect() {
        let (manager, _dialer) = manager("pending-connect");

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.connect().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        manager.close().await.unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ConnectOutcome::ListenerClosed);
        assert_eq!(manager.connect().await.unwrap(), ConnectOutcome::ListenerClosed);
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_exchange() {
        let (listener, dialer) = memory_listener("pending-exchange");
        let config = EndpointConfig::new().with_io_timeout(Duration::from_secs(30));
        let manager = Arc::new(ConnectionManager::new(listener, &config));

        let _silent = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.send_request(&SignerMessage::PubKeyRequest).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), manager.close())
            .await
            .unwrap()
            .unwrap();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_close_is_repeatable() {
        let (manager, dialer) = manager("close-twice");
        let _signer = dialer.dial().await.unwrap();
        manager.connect().await.unwrap();

        manager.close().await.unwrap();
        manager.close().await.unwrap();
        assert!(manager.is_closed());
        assert_eq!(manager.metrics().snapshot().connections_closed, 1);
    }
}
