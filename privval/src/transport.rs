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

//! Transport layer for the signer link.
//!
//! The listener side of a remote-signer connection is inverted: this process
//! binds and listens, and the signer dials in. The module provides:
//!
//! - [`SignerListener`]: accepts inbound signer connections and can be
//!   closed from any task, which unblocks a pending accept
//! - [`Transport`]: a bidirectional byte stream with metadata
//! - [`SignerConnection`]: length-prefixed message framing with read and
//!   write deadlines on top of a [`Transport`]
//!
//! Three listener implementations are included:
//!
//! - [`TcpSignerListener`]: TCP/IP
//! - [`UnixSignerListener`]: Unix domain sockets (Unix only)
//! - [`MemoryListener`]: in-process, dialed through a [`MemoryDialer`]
//!
//! # Example
//!
//! ```rust
//! use privval::serialization::SignerMessage;
//! use privval::serialization::framing;
//! use privval::transport::{SignerConnection, SignerListener, memory_listener};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (listener, dialer) = memory_listener("doc");
//!
//! tokio::spawn(async move {
//!     let mut signer = dialer.dial().await?;
//!     let _request = framing::read_message(&mut signer).await?;
//!     framing::write_message(&mut signer, &SignerMessage::PingResponse).await?;
//!     Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
//! });
//!
//! let transport = listener.accept().await?.expect("listener is open");
//! let mut conn = SignerConnection::new(transport, Duration::from_secs(1), Duration::from_secs(1));
//! let reply = conn.exchange(&SignerMessage::PingRequest).await?;
//! assert_eq!(reply, SignerMessage::PingResponse);
//! # Ok(())
//! # }
//! ```

mod connection;
mod error;
pub(crate) mod latch;
mod memory;
mod tcp;
mod traits;
mod types;
#[cfg(unix)]
mod unix;

pub use connection::SignerConnection;
pub use error::TransportError;
pub use memory::{MemoryDialer, MemoryListener, MemoryTransport, memory_listener};
pub use tcp::{TcpSignerListener, TcpTransport};
pub use traits::{SignerListener, Transport};
pub use types::{TransportId, TransportMetadata};
#[cfg(unix)]
pub use unix::{UnixSignerListener, UnixTransport};
