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

//! Observability support for the signer link.
//!
//! Logging goes through `tracing` and is compiled in with the default
//! `observability` feature. Counters live in [`EndpointMetrics`] and are
//! always available; the same feature mirrors them to the `metrics` facade
//! so any installed exporter picks them up.
//!
//! ```rust
//! use privval::endpoint::SignerListenerEndpoint;
//! use privval::transport::memory_listener;
//!
//! let (listener, _dialer) = memory_listener("stats");
//! let endpoint = SignerListenerEndpoint::new(listener);
//! let stats = endpoint.stats();
//! assert_eq!(stats.connections_accepted, 0);
//! ```

mod metrics;

pub use metrics::{EndpointMetrics, EndpointStats};
