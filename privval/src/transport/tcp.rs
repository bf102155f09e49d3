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

//! TCP listener and transport.
//!
//! The validator binds a [`TcpSignerListener`] and waits for the remote
//! signer to dial in. Accepted streams are wrapped in [`TcpTransport`] with
//! `TCP_NODELAY` enabled, since every exchange is a small request followed by
//! a small response.

use crate::transport::latch::CloseLatch;
use crate::transport::{SignerListener, Transport, TransportError, TransportId, TransportMetadata};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};

#[cfg(feature = "observability")]
use tracing::{debug, error, info, instrument, warn};

/// TCP transport for one accepted signer connection.
pub struct TcpTransport {
    stream: TcpStream,
    metadata: TransportMetadata,
}

impl TcpTransport {
    /// Creates a new TCP transport from an accepted stream.
    #[cfg_attr(
        feature = "observability",
        instrument(skip(stream), fields(transport_id, peer_addr))
    )]
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let id = TransportId::next();
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;

        #[cfg(feature = "observability")]
        {
            tracing::Span::current().record("transport_id", format!("{}", id));
            tracing::Span::current().record("peer_addr", format!("{}", peer_addr));
            debug!("Created TCP transport from stream");
        }

        let metadata = TransportMetadata::new(id, "tcp")
            .with_local_addr(local_addr)
            .with_peer_addr(peer_addr);

        Ok(Self { stream, metadata })
    }

    /// Returns the peer address of this transport.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Gets the TCP_NODELAY option on the underlying socket.
    pub fn nodelay(&self) -> io::Result<bool> {
        self.stream.nodelay()
    }
}

impl Transport for TcpTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn shutdown(
        &mut self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;

            self.stream.shutdown().await.map_err(|e| {
                #[cfg(feature = "observability")]
                error!(transport_id = %self.metadata.id, "Failed to shutdown: {}", e);
                TransportError::Io { source: e }
            })
        })
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// TCP listener the remote signer dials into.
///
/// # Examples
///
/// ```rust,no_run
/// use privval::transport::{SignerListener, TcpSignerListener};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let listener = TcpSignerListener::bind("127.0.0.1:26659").await?;
/// println!("waiting for signer on {}", listener.local_addr()?);
/// # Ok(())
/// # }
/// ```
///
/// Closing releases the socket: later connection attempts are refused by the
/// operating system instead of queueing in the backlog.
#[derive(Debug)]
pub struct TcpSignerListener {
    listener: Mutex<Option<Arc<TcpListener>>>,
    local_addr: SocketAddr,
    latch: CloseLatch,
}

impl TcpSignerListener {
    /// Binds to a local address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address cannot be bound.
    #[cfg_attr(feature = "observability", instrument(skip(addr), fields(address)))]
    pub async fn bind(addr: impl Into<String>) -> Result<Self, TransportError> {
        let addr_str = addr.into();

        #[cfg(feature = "observability")]
        tracing::Span::current().record("address", addr_str.as_str());

        let listener = TcpListener::bind(&addr_str).await.map_err(|e| {
            #[cfg(feature = "observability")]
            error!("Failed to bind: {}", e);
            TransportError::BindFailed {
                address: addr_str.clone(),
                source: e,
            }
        })?;

        let listener = Self::from_listener(listener)?;

        #[cfg(feature = "observability")]
        info!(local_addr = %listener.local_addr, "TCP signer listener bound");

        Ok(listener)
    }

    /// Wraps an already bound Tokio listener.
    #[allow(clippy::result_large_err)]
    pub fn from_listener(listener: TcpListener) -> Result<Self, TransportError> {
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener: Mutex::new(Some(Arc::new(listener))),
            local_addr,
            latch: CloseLatch::new(),
        })
    }

    /// Returns the bound socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait::async_trait]
impl SignerListener for TcpSignerListener {
    async fn accept(&self) -> Result<Option<Box<dyn Transport>>, TransportError> {
        // The clone keeps the socket alive only until this accept returns.
        let listener = self.listener.lock().clone();
        let Some(listener) = listener else {
            return Ok(None);
        };

        let (stream, _peer) = tokio::select! {
            biased;
            _ = self.latch.closed() => return Ok(None),
            accepted = listener.accept() => accepted.map_err(|e| {
                #[cfg(feature = "observability")]
                error!("Failed to accept connection: {}", e);
                TransportError::AcceptFailed { source: e }
            })?,
        };

        if let Err(_e) = stream.set_nodelay(true) {
            #[cfg(feature = "observability")]
            warn!("Failed to set TCP_NODELAY on signer connection: {}", _e);
        }

        let transport =
            TcpTransport::from_stream(stream).map_err(|e| TransportError::AcceptFailed { source: e })?;

        #[cfg(feature = "observability")]
        info!(transport = %transport.metadata(), "Accepted TCP signer connection");

        Ok(Some(Box::new(transport)))
    }

    fn close(&self) -> Result<(), TransportError> {
        let released = self.listener.lock().take();
        if self.latch.close() {
            #[cfg(feature = "observability")]
            info!(local_addr = %self.local_addr, "TCP signer listener closed");
        }
        drop(released);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.latch.is_closed()
    }

    fn local_addr(&self) -> Result<String, TransportError> {
        Ok(self.local_addr.to_string())
    }
}
