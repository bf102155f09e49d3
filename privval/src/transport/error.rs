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

//! Transport layer error types.
//!
//! Transport errors are the lowest level of the endpoint's error hierarchy.
//! They describe why a single frame exchange or accept call failed.
//!
//! # Error Categories
//!
//! - **Connection errors**: no connection held, listener could not bind or accept
//! - **I/O errors**: read/write failures on an established connection
//! - **Timeout errors**: a frame read or write exceeded its deadline
//! - **Framing errors**: oversized frame, undecodable payload
//!
//! # Recovery Strategy
//!
//! Every transport error observed by the heartbeat loop leads to one
//! reconnect attempt. Errors returned to an external caller are never retried
//! by the endpoint.

use crate::serialization::{DeserializationError, FrameError, SerializationError};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use privval::transport::TransportError;
/// use std::time::Duration;
///
/// let error = TransportError::Timeout {
///     duration: Duration::from_secs(3),
/// };
/// assert!(error.is_timeout());
/// assert!(error.poisons_connection());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection is currently held.
    #[error("endpoint is not connected")]
    NotConnected,

    /// A frame read or write exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The deadline that was exceeded
        duration: Duration,
    },

    /// Failed to read a frame from the connection.
    #[error("read failed: {source}")]
    ReadFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to write a frame to the connection.
    #[error("write failed: {source}")]
    WriteFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The listener failed to accept a connection.
    #[error("accept failed: {source}")]
    AcceptFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to bind a listener to the requested address.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// The address that failed to bind
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The endpoint or listener has been closed.
    #[error("transport is closed")]
    Closed,

    /// A frame declared or carried more bytes than allowed.
    #[error("frame size {size} exceeds maximum allowed size {max}")]
    FrameTooLarge {
        /// Declared or actual payload size in bytes
        size: usize,
        /// Maximum payload size in bytes
        max: usize,
    },

    /// A message could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] SerializationError),

    /// A frame payload could not be decoded into a known message.
    #[error("decode failed: {0}")]
    Decode(#[source] DeserializationError),

    /// An I/O error outside a frame read or write.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Returns `true` if this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// Returns `true` if the connection that produced this error can no
    /// longer keep requests and responses paired.
    ///
    /// An abandoned exchange may leave a late response or the tail of a
    /// frame in flight, which the next reader would take for its own. Only a
    /// missing connection and an encode failure, which happens before any
    /// byte is written, leave the stream untouched.
    pub fn poisons_connection(&self) -> bool {
        !matches!(self, TransportError::NotConnected | TransportError::Encode(_))
    }

    /// Classifies a framing failure that happened while reading.
    pub(crate) fn from_read(error: FrameError, deadline: Duration) -> Self {
        match error {
            FrameError::Io(source) => Self::classify_io(source, deadline, |source| {
                TransportError::ReadFailed { source }
            }),
            other => other.into(),
        }
    }

    /// Classifies a framing failure that happened while writing.
    pub(crate) fn from_write(error: FrameError, deadline: Duration) -> Self {
        match error {
            FrameError::Io(source) => Self::classify_io(source, deadline, |source| {
                TransportError::WriteFailed { source }
            }),
            other => other.into(),
        }
    }

    fn classify_io(
        source: io::Error,
        deadline: Duration,
        otherwise: impl FnOnce(io::Error) -> Self,
    ) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout {
                duration: deadline,
            },
            _ => otherwise(source),
        }
    }
}

impl From<FrameError> for TransportError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Io(source) => TransportError::Io { source },
            FrameError::TooLarge { size, max } => TransportError::FrameTooLarge { size, max },
            FrameError::Encode(err) => TransportError::Encode(err),
            FrameError::Decode(err) => TransportError::Decode(err),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io { source: error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEADLINE: Duration = Duration::from_secs(3);

    #[test]
    fn test_os_timeout_is_classified_as_timeout() {
        let error = TransportError::from_read(
            FrameError::Io(io::Error::new(io::ErrorKind::TimedOut, "deadline")),
            DEADLINE,
        );
        assert!(error.is_timeout());
        assert_eq!(error.to_string(), "operation timed out after 3s");
    }

    #[test]
    fn test_eof_is_read_failure() {
        let error = TransportError::from_read(
            FrameError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")),
            DEADLINE,
        );
        assert!(matches!(error, TransportError::ReadFailed { .. }));
        assert!(error.poisons_connection());
    }

    #[test]
    fn test_broken_pipe_is_write_failure() {
        let error = TransportError::from_write(
            FrameError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe")),
            DEADLINE,
        );
        assert!(matches!(error, TransportError::WriteFailed { .. }));
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_frame_errors_map_to_transport_errors() {
        let error = TransportError::from_read(
            FrameError::TooLarge {
                size: 20_000,
                max: 10_240,
            },
            DEADLINE,
        );
        assert!(matches!(
            error,
            TransportError::FrameTooLarge {
                size: 20_000,
                max: 10_240
            }
        ));
        assert!(error.poisons_connection());

        let error = TransportError::from_read(
            FrameError::Decode(DeserializationError::new("bad tag")),
            DEADLINE,
        );
        assert!(matches!(error, TransportError::Decode(_)));
        assert!(error.poisons_connection());
    }

    #[test]
    fn test_only_untouched_streams_survive_an_error() {
        assert!(TransportError::Closed.poisons_connection());
        assert!(TransportError::Timeout { duration: DEADLINE }.poisons_connection());
        assert!(!TransportError::NotConnected.poisons_connection());
    }
}
