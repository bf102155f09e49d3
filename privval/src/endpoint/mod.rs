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

//! Endpoint layer: lifecycle, connection ownership and heartbeat.
//!
//! # Overview
//!
//! - **[`SignerListenerEndpoint`]**: the public surface. `start`, `stop` and
//!   `send_request`.
//! - **[`ConnectionManager`]**: owns the listener and the one active
//!   connection; every exchange and every reconnect runs under its mutex.
//! - **Heartbeat loop**: a background task that pings the signer every
//!   period and reconnects when a ping fails. It ends with a
//!   [`HeartbeatExit`] reason.
//! - **[`EndpointConfig`]** and **[`EndpointError`]**.
//!
//! # Failure handling
//!
//! | failure                                  | direct caller  | heartbeat loop      |
//! |------------------------------------------|----------------|---------------------|
//! | timeout, I/O error, oversized/bad frame  | error returned | reconnect next tick |
//! | no connection held                       | error returned | reconnect next tick |
//! | wrong message variant to a ping          | n/a            | loop terminates     |
//! | listener closed                          | `start` fails  | loop terminates     |
//!
//! A timeout or a broken frame also drops the connection, so requests fail
//! with `NotConnected` until the heartbeat accepts a new signer. Heartbeat
//! failures never close the endpoint. If the loop terminates, requests keep
//! using whatever connection is held until `stop`.

mod config;
mod endpoint;
mod error;
mod heartbeat;
mod manager;

pub use config::{
    DEFAULT_HEARTBEAT_PERIOD, DEFAULT_MAX_DIAL_RETRIES, DEFAULT_READ_TIMEOUT,
    DEFAULT_WRITE_TIMEOUT, EndpointConfig,
};
pub use endpoint::{EndpointState, SignerListenerEndpoint};
pub use error::EndpointError;
pub use heartbeat::HeartbeatExit;
pub use manager::{ConnectOutcome, ConnectionManager};
