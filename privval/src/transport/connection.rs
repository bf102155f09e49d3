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

//! Framed message I/O over one accepted connection.

use crate::serialization::SignerMessage;
use crate::serialization::framing::{read_message, write_message};
use crate::transport::{Transport, TransportError, TransportMetadata};
use std::time::Duration;

#[cfg(feature = "observability")]
use tracing::trace;

/// An accepted signer connection with per-frame read and write deadlines.
///
/// Each deadline bounds one whole frame: a peer that trickles bytes cannot
/// extend it. Expiry is reported as [`TransportError::Timeout`].
///
/// A connection does no retrying of its own. After an error for which
/// [`TransportError::poisons_connection`] holds, the frame boundary can no
/// longer be trusted and the owner must discard the connection.
pub struct SignerConnection {
    transport: Box<dyn Transport>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SignerConnection {
    /// Wraps an accepted transport.
    pub fn new(transport: Box<dyn Transport>, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            transport,
            read_timeout,
            write_timeout,
        }
    }

    /// Returns metadata of the underlying transport.
    pub fn metadata(&self) -> &TransportMetadata {
        self.transport.metadata()
    }

    /// Writes one message as a single length-prefixed frame.
    pub async fn write_message(&mut self, message: &SignerMessage) -> Result<(), TransportError> {
        #[cfg(feature = "observability")]
        trace!(transport_id = %self.metadata().id, message = message.name(), "Writing frame");

        let deadline = self.write_timeout;
        match tokio::time::timeout(deadline, write_message(&mut self.transport, message)).await {
            Ok(result) => result.map_err(|e| TransportError::from_write(e, deadline)),
            Err(_elapsed) => Err(TransportError::Timeout { duration: deadline }),
        }
    }

    /// Reads one length-prefixed frame and decodes it.
    pub async fn read_message(&mut self) -> Result<SignerMessage, TransportError> {
        let deadline = self.read_timeout;
        let message = match tokio::time::timeout(deadline, read_message(&mut self.transport)).await
        {
            Ok(result) => result.map_err(|e| TransportError::from_read(e, deadline))?,
            Err(_elapsed) => return Err(TransportError::Timeout { duration: deadline }),
        };

        #[cfg(feature = "observability")]
        trace!(transport_id = %self.metadata().id, message = message.name(), "Read frame");

        Ok(message)
    }

    /// Writes `request` and reads the reply. The first error wins; the read is
    /// skipped if the write fails.
    pub async fn exchange(&mut self, request: &SignerMessage) -> Result<SignerMessage, TransportError> {
        self.write_message(request).await?;
        self.read_message().await
    }

    /// Shuts the connection down and releases it.
    ///
    /// The connection is consumed whether or not the shutdown succeeds.
    pub async fn close(mut self) -> Result<(), TransportError> {
        let deadline = self.write_timeout;
        match tokio::time::timeout(deadline, self.transport.shutdown()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(TransportError::Timeout { duration: deadline }),
        }
    }
}

impl std::fmt::Debug for SignerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConnection")
            .field("transport", self.transport.metadata())
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}
