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

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global counter for generating unique transport IDs.
static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an accepted connection.
///
/// Every connection accepted by any listener in the process gets a fresh ID,
/// which makes reconnects easy to follow in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    /// Creates a transport ID from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide transport ID.
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport({})", self.0)
    }
}

/// Metadata associated with an accepted connection.
///
/// Addresses are kept as strings because Unix-domain peers have no
/// `SocketAddr`.
#[derive(Debug, Clone)]
pub struct TransportMetadata {
    /// Unique identifier for this transport
    pub id: TransportId,

    /// Local address of the connection, if available
    pub local_addr: Option<String>,

    /// Remote peer address, if available
    pub peer_addr: Option<String>,

    /// Transport type (e.g., "tcp", "unix", "memory")
    pub transport_type: &'static str,

    /// When the transport was created
    pub created_at: Instant,
}

impl TransportMetadata {
    /// Creates new transport metadata.
    pub fn new(id: TransportId, transport_type: &'static str) -> Self {
        Self {
            id,
            local_addr: None,
            peer_addr: None,
            transport_type,
            created_at: Instant::now(),
        }
    }

    /// Sets the local address.
    pub fn with_local_addr(mut self, addr: impl fmt::Display) -> Self {
        self.local_addr = Some(addr.to_string());
        self
    }

    /// Sets the peer address.
    pub fn with_peer_addr(mut self, addr: impl fmt::Display) -> Self {
        self.peer_addr = Some(addr.to_string());
        self
    }

    /// Returns the age of this transport.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Display for TransportMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.transport_type, self.id)?;
        if let Some(peer) = &self.peer_addr {
            write!(f, " peer={}", peer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_ids_are_unique() {
        let a = TransportId::next();
        let b = TransportId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_metadata_display() {
        let metadata =
            TransportMetadata::new(TransportId::new(7), "tcp").with_peer_addr("127.0.0.1:26659");
        assert_eq!(metadata.to_string(), "tcp Transport(7) peer=127.0.0.1:26659");
        assert!(metadata.local_addr.is_none());
    }
}
