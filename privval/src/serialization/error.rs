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

//! Serialization and framing error types.
//!
//! Codec failures are reported as [`SerializationError`] and
//! [`DeserializationError`]. Framing failures are reported as [`FrameError`],
//! which keeps the underlying I/O error intact so the transport layer can
//! classify timeouts separately from other failures.

use std::fmt;
use std::io;

/// Error that occurs while encoding a message.
///
/// # Examples
///
/// ```rust
/// use privval::serialization::SerializationError;
///
/// let error = SerializationError::new("payload too large");
/// assert!(error.to_string().contains("payload too large"));
/// ```
#[derive(Debug)]
pub struct SerializationError {
    /// The underlying error message
    message: String,
    /// Optional source error
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SerializationError {
    /// Creates a new serialization error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new serialization error with a message and source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Serialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error that occurs while decoding a message.
///
/// Common causes are an unknown variant discriminator, a truncated payload
/// or trailing garbage in a frame.
#[derive(Debug)]
pub struct DeserializationError {
    /// The underlying error message
    message: String,
    /// Optional source error
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DeserializationError {
    /// Creates a new deserialization error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new deserialization error with a message and source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deserialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for DeserializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<postcard::Error> for SerializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("Postcard serialization failed", err)
    }
}

impl From<postcard::Error> for DeserializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("Postcard deserialization failed", err)
    }
}

/// Error produced while reading or writing a single length-prefixed frame.
#[derive(Debug)]
pub enum FrameError {
    /// The underlying reader or writer failed.
    Io(io::Error),

    /// The frame length exceeds the configured maximum.
    ///
    /// On the read side this is detected from the length prefix alone; the
    /// payload is never read or buffered.
    TooLarge {
        /// Declared or actual payload length in bytes.
        size: usize,
        /// Maximum accepted payload length in bytes.
        max: usize,
    },

    /// The message could not be encoded.
    Encode(SerializationError),

    /// The frame payload could not be decoded into a message.
    Decode(DeserializationError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "frame I/O failed: {}", err),
            Self::TooLarge { size, max } => {
                write!(f, "frame size {} exceeds maximum allowed size {}", size, max)
            }
            Self::Encode(err) => write!(f, "{}", err),
            Self::Decode(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::TooLarge { .. } => None,
            Self::Encode(err) => Some(err),
            Self::Decode(err) => Some(err),
        }
    }
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SerializationError> for FrameError {
    fn from(err: SerializationError) -> Self {
        Self::Encode(err)
    }
}

impl From<DeserializationError> for FrameError {
    fn from(err: DeserializationError) -> Self {
        Self::Decode(err)
    }
}
