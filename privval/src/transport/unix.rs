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

//! Unix-domain socket listener and transport.
//!
//! Co-located signers usually connect over a Unix socket, which keeps the
//! signing link off the network entirely.

use crate::transport::latch::CloseLatch;
use crate::transport::{SignerListener, Transport, TransportError, TransportId, TransportMetadata};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{UnixListener, UnixStream};

#[cfg(feature = "observability")]
use tracing::{error, info, warn};

/// Unix-domain transport for one accepted signer connection.
pub struct UnixTransport {
    stream: UnixStream,
    metadata: TransportMetadata,
}

impl UnixTransport {
    /// Creates a new Unix transport from an accepted stream.
    pub fn from_stream(stream: UnixStream, path: &Path) -> Self {
        let metadata =
            TransportMetadata::new(TransportId::next(), "unix").with_local_addr(path.display());
        Self { stream, metadata }
    }
}

impl Transport for UnixTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn shutdown(
        &mut self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;

            self.stream
                .shutdown()
                .await
                .map_err(|e| TransportError::Io { source: e })
        })
    }
}

impl AsyncRead for UnixTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for UnixTransport {
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

/// Unix-domain socket listener the remote signer dials into.
///
/// A stale socket file left behind by a previous process is removed before
/// binding, and the socket file is unlinked again when the listener closes.
#[derive(Debug)]
pub struct UnixSignerListener {
    listener: Mutex<Option<Arc<UnixListener>>>,
    path: PathBuf,
    latch: CloseLatch,
}

impl UnixSignerListener {
    /// Binds a listener at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the stale socket cannot be
    /// removed or the path cannot be bound.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        let bind_failed = |source: io::Error| TransportError::BindFailed {
            address: path.display().to_string(),
            source,
        };

        match std::fs::remove_file(&path) {
            Ok(()) => {
                #[cfg(feature = "observability")]
                warn!(path = %path.display(), "Removed stale signer socket");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(bind_failed(e)),
        }

        let listener = UnixListener::bind(&path).map_err(bind_failed)?;

        #[cfg(feature = "observability")]
        info!(path = %path.display(), "Unix signer listener bound");

        Ok(Self {
            listener: Mutex::new(Some(Arc::new(listener))),
            path,
            latch: CloseLatch::new(),
        })
    }

    /// Returns the socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SignerListener for UnixSignerListener {
    async fn accept(&self) -> Result<Option<Box<dyn Transport>>, TransportError> {
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

        let transport = UnixTransport::from_stream(stream, &self.path);

        #[cfg(feature = "observability")]
        info!(transport = %transport.metadata(), "Accepted Unix signer connection");

        Ok(Some(Box::new(transport)))
    }

    fn close(&self) -> Result<(), TransportError> {
        drop(self.listener.lock().take());
        if !self.latch.close() {
            return Ok(());
        }

        #[cfg(feature = "observability")]
        info!(path = %self.path.display(), "Unix signer listener closed");

        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TransportError::Io { source: e }),
        }
    }

    fn is_closed(&self) -> bool {
        self.latch.is_closed()
    }

    fn local_addr(&self) -> Result<String, TransportError> {
        Ok(self.path.display().to_string())
    }
}
