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

//! Error types for the endpoint layer.

use crate::transport::TransportError;
use std::fmt;

/// Errors reported by the signer endpoint.
///
/// Transport failures are wrapped unchanged so callers can still tell a
/// timeout apart from a broken link. The remaining variants are either
/// protocol violations or lifecycle misuse.
#[derive(Debug)]
pub enum EndpointError {
    /// A transport-layer error occurred.
    Transport(TransportError),

    /// The signer answered with a well-formed message of the wrong kind.
    UnexpectedResponse {
        /// The variant that was expected.
        expected: &'static str,
        /// The variant that arrived.
        actual: &'static str,
    },

    /// The listener was closed, so no signer can connect any more.
    ListenerClosed,

    /// `start` was called on a running endpoint.
    AlreadyStarted,

    /// `stop` was called before `start`.
    NotStarted,

    /// `start` was called on an endpoint that has been stopped.
    AlreadyStopped,

    /// Invalid configuration.
    InvalidConfiguration {
        /// Description of the configuration error.
        reason: String,
    },
}

impl EndpointError {
    /// Returns `true` if the heartbeat loop must terminate on this error
    /// instead of attempting a reconnect.
    ///
    /// ```rust
    /// use privval::endpoint::EndpointError;
    /// use privval::transport::TransportError;
    ///
    /// let wrong_kind = EndpointError::UnexpectedResponse {
    ///     expected: "PingResponse",
    ///     actual: "PubKeyResponse",
    /// };
    /// assert!(wrong_kind.is_fatal_for_heartbeat());
    /// assert!(!EndpointError::Transport(TransportError::NotConnected).is_fatal_for_heartbeat());
    /// ```
    pub fn is_fatal_for_heartbeat(&self) -> bool {
        matches!(self, Self::UnexpectedResponse { .. } | Self::ListenerClosed)
    }

    /// Returns `true` if this error is a read or write deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::UnexpectedResponse { expected, actual } => {
                write!(f, "unexpected response: expected {}, got {}", expected, actual)
            }
            Self::ListenerClosed => write!(f, "signer listener is closed"),
            Self::AlreadyStarted => write!(f, "endpoint is already started"),
            Self::NotStarted => write!(f, "endpoint is not started"),
            Self::AlreadyStopped => write!(f, "endpoint is already stopped"),
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for EndpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for EndpointError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let err = EndpointError::UnexpectedResponse {
            expected: "PingResponse",
            actual: "SignedVoteResponse",
        };
        assert_eq!(
            err.to_string(),
            "unexpected response: expected PingResponse, got SignedVoteResponse"
        );
        assert_eq!(
            EndpointError::ListenerClosed.to_string(),
            "signer listener is closed"
        );
        assert_eq!(
            EndpointError::AlreadyStarted.to_string(),
            "endpoint is already started"
        );
    }

    #[test]
    fn test_error_from_transport() {
        let endpoint_err: EndpointError = TransportError::Closed.into();
        assert!(matches!(endpoint_err, EndpointError::Transport(_)));
        assert!(endpoint_err.source().is_some());
    }

    #[test]
    fn test_heartbeat_classification() {
        let timeout = EndpointError::Transport(TransportError::Timeout {
            duration: Duration::from_millis(10),
        });
        assert!(timeout.is_timeout());
        assert!(!timeout.is_fatal_for_heartbeat());

        assert!(!EndpointError::Transport(TransportError::FrameTooLarge { size: 1, max: 0 })
            .is_fatal_for_heartbeat());
        assert!(EndpointError::ListenerClosed.is_fatal_for_heartbeat());
        assert!(!EndpointError::ListenerClosed.is_timeout());
    }
}
