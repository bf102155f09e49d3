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

//! Serialization layer for the signer link.
//!
//! Messages are encoded with [postcard](https://docs.rs/postcard), a compact
//! binary serde format in which the variant index of [`SignerMessage`] is the
//! wire discriminator, and carried in length-prefixed frames produced by the
//! [`framing`] module.
//!
//! # Message Framing
//!
//! ```text
//! +------------------+----------------------+
//! | Length (4 bytes) | Payload (N bytes)    |
//! +------------------+----------------------+
//! ```
//!
//! - **Length**: u32 in big-endian format
//! - **Payload**: postcard-encoded [`SignerMessage`]
//! - **Max size**: [`MAX_FRAME_SIZE`](framing::MAX_FRAME_SIZE), 10 KiB

mod error;
pub mod framing;
mod message;

pub use error::{DeserializationError, FrameError, SerializationError};
pub use message::{RemoteSignerError, SignerMessage};
