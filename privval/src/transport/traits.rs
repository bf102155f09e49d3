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

use crate::transport::{TransportError, TransportMetadata};
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};

/// Core abstraction for an accepted byte stream.
///
/// The `Transport` trait combines Tokio's `AsyncRead` and `AsyncWrite` with
/// connection metadata and a graceful shutdown hook. The endpoint only ever
/// holds transports as `Box<dyn Transport>`, so listeners are free to hand out
/// TCP, Unix-domain or in-memory streams.
///
/// # Examples
///
/// ## Implementing a custom transport
///
/// ```rust
/// use privval::transport::{Transport, TransportMetadata, TransportError};
/// use tokio::io::{AsyncRead, AsyncWrite};
/// use std::pin::Pin;
/// use std::task::{Context, Poll};
///
/// struct NullTransport {
///     metadata: TransportMetadata,
/// }
///
/// impl Transport for NullTransport {
///     fn metadata(&self) -> &TransportMetadata {
///         &self.metadata
///     }
///
///     fn shutdown(&mut self) -> Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + '_>> {
///         Box::pin(async move { Ok(()) })
///     }
/// }
///
/// impl AsyncRead for NullTransport {
///     fn poll_read(
///         self: Pin<&mut Self>,
///         _cx: &mut Context<'_>,
///         _buf: &mut tokio::io::ReadBuf<'_>,
///     ) -> Poll<std::io::Result<()>> {
///         Poll::Ready(Ok(()))
///     }
/// }
///
/// impl AsyncWrite for NullTransport {
///     fn poll_write(
///         self: Pin<&mut Self>,
///         _cx: &mut Context<'_>,
///         buf: &[u8],
///     ) -> Poll<std::io::Result<usize>> {
///         Poll::Ready(Ok(buf.len()))
///     }
///
///     fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
///         Poll::Ready(Ok(()))
///     }
///
///     fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
///         Poll::Ready(Ok(()))
///     }
/// }
/// ```
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Returns metadata about this transport.
    fn metadata(&self) -> &TransportMetadata;

    /// Gracefully shuts down the transport.
    ///
    /// Pending writes are flushed and the peer observes end-of-stream. The
    /// transport must not be used for I/O afterwards.
    fn shutdown(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;
}

/// A listening socket that remote signers dial into.
///
/// `accept` returns `Ok(None)` once the listener has been closed: this is the
/// "listener closed" signal the endpoint uses to stop reconnecting.
///
/// # Concurrency
///
/// `close` must be safe to call while another task is blocked in `accept`,
/// and must make that pending `accept` return `Ok(None)` promptly. The
/// endpoint relies on this to shut down while its heartbeat task is waiting
/// for a signer to reconnect.
#[async_trait::async_trait]
pub trait SignerListener: Send + Sync + 'static {
    /// Waits for the next inbound connection.
    ///
    /// Blocks without a deadline until a peer connects, the listener is
    /// closed (`Ok(None)`), or accepting fails.
    async fn accept(&self) -> Result<Option<Box<dyn Transport>>, TransportError>;

    /// Closes the listener. Idempotent.
    #[allow(clippy::result_large_err)]
    fn close(&self) -> Result<(), TransportError>;

    /// Returns `true` once [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;

    /// Returns the local address this listener is bound to.
    #[allow(clippy::result_large_err)]
    fn local_addr(&self) -> Result<String, TransportError>;
}
