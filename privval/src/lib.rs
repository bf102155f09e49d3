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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! - **[`serialization`]**: the [`SignerMessage`] set, postcard codec and
//!   length-prefixed framing
//! - **[`transport`]**: listeners, transports and the framed
//!   [`SignerConnection`](transport::SignerConnection)
//! - **[`endpoint`]**: connection ownership, heartbeat loop and the
//!   [`SignerListenerEndpoint`] lifecycle
//! - **[`observability`]**: counters and the `tracing` integration
//!
//! ## Features
//!
//! - **`observability`** (default): `tracing` spans and events plus
//!   `metrics` counters
//!
//! ## Error Handling
//!
//! - [`TransportError`]: framing, I/O, deadline and listener failures
//! - [`EndpointError`]: protocol violations and lifecycle misuse, wrapping
//!   [`TransportError`] for everything else
//!
//! ## Safety
//!
//! Written in safe Rust with `#![deny(unsafe_code)]`.

pub mod endpoint;
pub mod observability;
pub mod serialization;
pub mod transport;

pub use endpoint::{EndpointConfig, EndpointError, SignerListenerEndpoint};
pub use observability::{EndpointMetrics, EndpointStats};
pub use serialization::{RemoteSignerError, SignerMessage};
pub use transport::{SignerListener, Transport, TransportError};
