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

//! Length-prefixed message framing for the signer link.
//!
//! Each message is prefixed with a 4-byte (u32) length header in big-endian
//! format, followed by the postcard-encoded [`SignerMessage`].
//!
//! # Protocol
//!
//! ```text
//! +------------------+-------------------+
//! | Length (4 bytes) | Payload (N bytes) |
//! +------------------+-------------------+
//! ```
//!
//! - **Length**: u32 in big-endian format, payload size in bytes
//! - **Payload**: variant discriminator followed by the variant fields
//! - **Max size**: [`MAX_FRAME_SIZE`] (10 KiB)
//!
//! # Examples
//!
//! ```rust
//! use privval::serialization::SignerMessage;
//! use privval::serialization::framing::{read_message, write_message};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut buffer = Vec::new();
//! write_message(&mut buffer, &SignerMessage::PingRequest).await?;
//!
//! let mut reader = &buffer[..];
//! let message = read_message(&mut reader).await?;
//! assert_eq!(message, SignerMessage::PingRequest);
//! # Ok(())
//! # }
//! ```

use crate::serialization::{FrameError, SignerMessage};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame payload size (10 KiB).
///
/// Signing payloads are small; anything larger is treated as a corrupt or
/// hostile stream.
pub const MAX_FRAME_SIZE: usize = 10 * 1024;

/// Size of the frame length header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Writes a length-prefixed frame to an async writer.
///
/// The frame is flushed before returning.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if the payload exceeds [`MAX_FRAME_SIZE`]
/// (nothing is written in that case) and [`FrameError::Io`] if writing fails.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len();
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    // Header and payload go out in one buffer so a frame is never split
    // across two write calls on the transport.
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + len);
    frame.extend_from_slice(&(len as u32).to_be_bytes());
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;

    Ok(())
}

/// Reads a length-prefixed frame from an async reader.
///
/// The length prefix is validated before any payload byte is read, so an
/// oversized declaration never causes an allocation.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if the declared length exceeds
/// [`MAX_FRAME_SIZE`] and [`FrameError::Io`] if the reader fails or the
/// stream ends before the frame is complete.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut len_bytes).await?;

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(payload)
}

/// Encodes a [`SignerMessage`] into a frame payload.
pub fn encode(message: &SignerMessage) -> Result<Vec<u8>, FrameError> {
    postcard::to_stdvec(message).map_err(|e| FrameError::Encode(e.into()))
}

/// Decodes a frame payload into a [`SignerMessage`].
pub fn decode(payload: &[u8]) -> Result<SignerMessage, FrameError> {
    postcard::from_bytes(payload).map_err(|e| FrameError::Decode(e.into()))
}

/// Encodes and writes one message as a single frame.
pub async fn write_message<W>(writer: &mut W, message: &SignerMessage) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let payload = encode(message)?;
    write_frame(writer, &payload).await
}

/// Reads one frame and decodes it into a message.
pub async fn read_message<R>(reader: &mut R) -> Result<SignerMessage, FrameError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_frame(reader).await?;
    decode(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_write_read_frame() {
        let mut buffer = Vec::new();
        let message = b"Hello, signer!";

        write_frame(&mut buffer, message).await.unwrap();
        assert_eq!(&buffer[0..4], &(message.len() as u32).to_be_bytes());

        let mut reader = &buffer[..];
        let decoded = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"").await.unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 0]);

        let mut reader = &buffer[..];
        assert!(read_frame(&mut reader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_frame_at_limit() {
        let mut buffer = Vec::new();
        let message = vec![7u8; MAX_FRAME_SIZE];

        write_frame(&mut buffer, &message).await.unwrap();

        let mut reader = &buffer[..];
        assert_eq!(read_frame(&mut reader).await.unwrap(), message);
    }

    #[tokio::test]
    async fn test_write_frame_too_large() {
        let mut buffer = Vec::new();
        let message = vec![0u8; MAX_FRAME_SIZE + 1];

        let result = write_frame(&mut buffer, &message).await;
        assert!(matches!(
            result,
            Err(FrameError::TooLarge { size, max }) if size == MAX_FRAME_SIZE + 1 && max == MAX_FRAME_SIZE
        ));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_read_frame_too_large_does_not_consume_payload() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&(u32::MAX).to_be_bytes());
        buffer.extend_from_slice(b"trailing");

        let mut reader = &buffer[..];
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FrameError::TooLarge { .. })));
        assert_eq!(reader, b"trailing");
    }

    #[tokio::test]
    async fn test_incomplete_frame() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&10u32.to_be_bytes());
        buffer.extend_from_slice(b"short");

        let mut reader = &buffer[..];
        match read_frame(&mut reader).await {
            Err(FrameError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let messages = vec![
            SignerMessage::PingRequest,
            SignerMessage::SignVoteRequest {
                vote: vec![1, 2, 3],
            },
            SignerMessage::PubKeyResponse {
                pub_key: vec![9; 32],
                error: None,
            },
        ];

        let mut buffer = Vec::new();
        for message in &messages {
            write_message(&mut buffer, message).await.unwrap();
        }

        let mut reader = &buffer[..];
        for expected in &messages {
            assert_eq!(&read_message(&mut reader).await.unwrap(), expected);
        }
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_discriminator_is_decode_error() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &[0xEE]).await.unwrap();

        let mut reader = &buffer[..];
        assert!(matches!(
            read_message(&mut reader).await,
            Err(FrameError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_message_rejected_on_write() {
        let message = SignerMessage::SignProposalRequest {
            proposal: vec![0u8; MAX_FRAME_SIZE],
        };
        let mut buffer = Vec::new();
        assert!(matches!(
            write_message(&mut buffer, &message).await,
            Err(FrameError::TooLarge { .. })
        ));
    }
}
