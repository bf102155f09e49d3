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

//! In-memory listener and transport.
//!
//! [`MemoryListener`] behaves like a real listening socket, but peers connect
//! through a [`MemoryDialer`] handle inside the same process. This lets tests
//! and benchmarks play the remote signer: connect, answer requests, vanish,
//! and reconnect, all without touching the network stack.

use crate::transport::latch::CloseLatch;
use crate::transport::{SignerListener, Transport, TransportError, TransportId, TransportMetadata};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::{Mutex, mpsc};

#[cfg(feature = "observability")]
use tracing::{debug, info};

/// Number of dialed connections that may wait for `accept`.
const DEFAULT_BACKLOG: usize = 16;

/// In-memory transport backed by a pair of unbounded Tokio `mpsc` channels.
///
/// Writes never wait: each write is queued as one chunk for the peer.
/// Dropping or shutting down one side makes the other side read
/// end-of-stream; writing towards a dropped side fails with `BrokenPipe`.
///
/// # Examples
///
/// ```rust
/// use privval::transport::MemoryTransport;
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (mut validator, mut signer) = MemoryTransport::pair();
///
/// signer.write_all(b"Hello!").await?;
///
/// let mut buffer = vec![0u8; 1024];
/// let n = validator.read(&mut buffer).await?;
/// assert_eq!(&buffer[..n], b"Hello!");
/// # Ok(())
/// # }
/// ```
pub struct MemoryTransport {
    metadata: TransportMetadata,
    reader: MemoryReader,
    writer: MemoryWriter,
}

/// Reader half of a memory transport.
struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    current_chunk: Option<Vec<u8>>,
    chunk_offset: usize,
}

/// Writer half of a memory transport. `None` after shutdown.
struct MemoryWriter {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl MemoryTransport {
    /// Creates a pair of connected memory transports.
    pub fn pair() -> (Self, Self) {
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();

        let id1 = TransportId::next();
        let id2 = TransportId::next();

        #[cfg(feature = "observability")]
        debug!(%id1, %id2, "Created memory transport pair");

        let transport1 = Self {
            metadata: TransportMetadata::new(id1, "memory").with_peer_addr(id2),
            reader: MemoryReader {
                rx: rx2,
                current_chunk: None,
                chunk_offset: 0,
            },
            writer: MemoryWriter { tx: Some(tx1) },
        };

        let transport2 = Self {
            metadata: TransportMetadata::new(id2, "memory").with_peer_addr(id1),
            reader: MemoryReader {
                rx: rx1,
                current_chunk: None,
                chunk_offset: 0,
            },
            writer: MemoryWriter { tx: Some(tx2) },
        };

        (transport1, transport2)
    }
}

impl Transport for MemoryTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn shutdown(
        &mut self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            // Dropping the sender is what the peer observes as end-of-stream.
            self.writer.tx = None;
            Ok(())
        })
    }
}

impl AsyncRead for MemoryTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let reader = &mut self.reader;

        if let Some(chunk) = &reader.current_chunk {
            let remaining = chunk.len() - reader.chunk_offset;
            let to_read = remaining.min(buf.remaining());

            if to_read > 0 {
                let start = reader.chunk_offset;
                let end = start + to_read;
                buf.put_slice(&chunk[start..end]);

                let chunk_len = chunk.len();
                reader.chunk_offset = end;

                if reader.chunk_offset >= chunk_len {
                    reader.current_chunk = None;
                    reader.chunk_offset = 0;
                }

                return Poll::Ready(Ok(()));
            }
        }

        match reader.rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                let to_read = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..to_read]);

                if to_read < chunk.len() {
                    reader.current_chunk = Some(chunk);
                    reader.chunk_offset = to_read;
                }

                Poll::Ready(Ok(()))
            }
            // Channel closed: end-of-stream
            Poll::Ready(None) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl AsyncWrite for MemoryTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let Some(tx) = &this.writer.tx else {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "memory transport shut down",
            )));
        };

        match tx.send(buf.to_vec()) {
            Ok(()) => Poll::Ready(Ok(buf.len())),
            Err(_closed) => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory transport closed",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().writer.tx = None;
        Poll::Ready(Ok(()))
    }
}

/// In-process listener. Pair it with a [`MemoryDialer`] via [`memory_listener`].
pub struct MemoryListener {
    incoming: Mutex<mpsc::Receiver<MemoryTransport>>,
    latch: CloseLatch,
    name: String,
}

/// Dialing side of a [`MemoryListener`]. Cheap to clone.
#[derive(Clone)]
pub struct MemoryDialer {
    tx: mpsc::Sender<MemoryTransport>,
}

/// Creates a connected listener/dialer pair.
///
/// # Examples
///
/// ```rust
/// use privval::transport::{SignerListener, memory_listener};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (listener, dialer) = memory_listener("signer");
///
/// let _signer_side = dialer.dial().await?;
/// let validator_side = listener.accept().await?;
/// assert!(validator_side.is_some());
/// # Ok(())
/// # }
/// ```
pub fn memory_listener(name: impl Into<String>) -> (MemoryListener, MemoryDialer) {
    let (tx, rx) = mpsc::channel(DEFAULT_BACKLOG);
    let listener = MemoryListener {
        incoming: Mutex::new(rx),
        latch: CloseLatch::new(),
        name: name.into(),
    };
    (listener, MemoryDialer { tx })
}

impl MemoryDialer {
    /// Connects to the listener and returns the dialer's end of the link.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the listener has been dropped.
    pub async fn dial(&self) -> Result<MemoryTransport, TransportError> {
        let (local, remote) = MemoryTransport::pair();
        self.tx
            .send(remote)
            .await
            .map_err(|_| TransportError::Closed)?;
        Ok(local)
    }
}

#[async_trait::async_trait]
impl SignerListener for MemoryListener {
    /// Waits for the next dialed connection.
    ///
    /// Once every [`MemoryDialer`] has been dropped no peer can ever connect
    /// again, which is reported the same way as a closed listener.
    async fn accept(&self) -> Result<Option<Box<dyn Transport>>, TransportError> {
        if self.latch.is_closed() {
            return Ok(None);
        }

        let mut incoming = self.incoming.lock().await;
        let transport = tokio::select! {
            biased;
            _ = self.latch.closed() => None,
            transport = incoming.recv() => transport,
        };

        match transport {
            Some(transport) => {
                #[cfg(feature = "observability")]
                info!(listener = %self.name, transport = %transport.metadata(), "Accepted memory connection");
                Ok(Some(Box::new(transport)))
            }
            None => Ok(None),
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.latch.close() {
            #[cfg(feature = "observability")]
            info!(listener = %self.name, "Memory listener closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.latch.is_closed()
    }

    fn local_addr(&self) -> Result<String, TransportError> {
        Ok(format!("memory://{}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_memory_transport_bidirectional() {
        let (mut t1, mut t2) = MemoryTransport::pair();

        t1.write_all(b"Hello").await.unwrap();
        let mut buffer = vec![0u8; 1024];
        let n = t2.read(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..n], b"Hello");

        t2.write_all(b"World").await.unwrap();
        let n = t1.read(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..n], b"World");
    }

    #[tokio::test]
    async fn test_memory_transport_partial_reads() {
        let (mut tx, mut rx) = MemoryTransport::pair();
        tx.write_all(b"abcdef").await.unwrap();

        let mut buffer = [0u8; 4];
        rx.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"abcd");

        let mut rest = [0u8; 2];
        rx.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"ef");
    }

    #[tokio::test]
    async fn test_memory_transport_shutdown_is_eof_for_peer() {
        let (mut tx, mut rx) = MemoryTransport::pair();
        Transport::shutdown(&mut tx).await.unwrap();

        let mut buffer = vec![0u8; 16];
        assert_eq!(rx.read(&mut buffer).await.unwrap(), 0);
        assert!(tx.write_all(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_transport_writes_do_not_wait_for_reader() {
        let (mut tx, mut rx) = MemoryTransport::pair();

        let writes = async {
            for i in 0..4096u32 {
                tx.write_all(&i.to_be_bytes()).await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(1), writes)
            .await
            .expect("writes completed without a reader");

        let mut last = [0u8; 4];
        for _ in 0..4096 {
            rx.read_exact(&mut last).await.unwrap();
        }
        assert_eq!(u32::from_be_bytes(last), 4095);
    }

    #[tokio::test]
    async fn test_memory_transport_write_to_dropped_peer() {
        let (mut tx, rx) = MemoryTransport::pair();
        drop(rx);

        let err = tx.write_all(b"lost").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_memory_listener_accepts_dialed_connection() {
        let (listener, dialer) = memory_listener("test");
        let mut signer = dialer.dial().await.unwrap();

        let mut validator = listener.accept().await.unwrap().expect("connection");
        assert_eq!(validator.metadata().transport_type, "memory");

        signer.write_all(b"hi").await.unwrap();
        let mut buffer = [0u8; 2];
        validator.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"hi");
        assert_eq!(listener.local_addr().unwrap(), "memory://test");
    }

    #[tokio::test]
    async fn test_memory_listener_close_unblocks_accept() {
        let (listener, _dialer) = memory_listener("close");
        let listener = Arc::new(listener);

        let pending = {
            let listener = Arc::clone(&listener);
            tokio::spawn(async move { listener.accept().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        listener.close().unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("accept should return after close")
            .unwrap();
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_memory_listener_without_dialers_reports_closed() {
        let (listener, dialer) = memory_listener("orphan");
        drop(dialer);
        assert!(matches!(listener.accept().await, Ok(None)));
    }

    #[tokio::test]
    async fn test_dial_after_listener_dropped() {
        let (listener, dialer) = memory_listener("gone");
        drop(listener);
        assert!(matches!(dialer.dial().await, Err(TransportError::Closed)));
    }
}
