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

//! Configuration types for the signer endpoint.

use crate::endpoint::EndpointError;
use std::time::Duration;

/// Default interval between liveness probes.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(2);

/// Default deadline for reading one frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Default deadline for writing one frame.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default retry bound for callers that layer their own dial policy on top
/// of the endpoint.
///
/// The heartbeat loop does not consult it: reconnects are attempted once per
/// tick until one succeeds or the listener closes.
pub const DEFAULT_MAX_DIAL_RETRIES: u32 = 10;

/// Configuration for a [`SignerListenerEndpoint`](crate::endpoint::SignerListenerEndpoint).
///
/// # Examples
///
/// ```rust
/// use privval::endpoint::EndpointConfig;
/// use std::time::Duration;
///
/// let config = EndpointConfig::new()
///     .with_heartbeat_period(Duration::from_millis(500))
///     .with_endpoint_id("validator-0");
///
/// assert_eq!(config.heartbeat_period, Duration::from_millis(500));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Time between liveness probes. Also bounds how quickly a lost signer
    /// is noticed and how often a reconnect is attempted.
    ///
    /// Default: 2 seconds
    pub heartbeat_period: Duration,

    /// Deadline for reading one response frame.
    ///
    /// Default: 3 seconds
    pub read_timeout: Duration,

    /// Deadline for writing one request frame.
    ///
    /// Default: 3 seconds
    pub write_timeout: Duration,

    /// Retry bound exposed to callers. Not enforced by the heartbeat loop.
    ///
    /// Default: 10
    pub max_dial_retries: u32,

    /// Label used in log output.
    ///
    /// Default: None
    pub endpoint_id: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_dial_retries: DEFAULT_MAX_DIAL_RETRIES,
            endpoint_id: None,
        }
    }
}

impl EndpointConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the heartbeat period.
    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    /// Sets the frame read deadline.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the frame write deadline.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets both frame deadlines at once.
    ///
    /// ```rust
    /// use privval::endpoint::EndpointConfig;
    /// use std::time::Duration;
    ///
    /// let config = EndpointConfig::new().with_io_timeout(Duration::from_millis(250));
    /// assert_eq!(config.read_timeout, config.write_timeout);
    /// ```
    pub fn with_io_timeout(self, timeout: Duration) -> Self {
        self.with_read_timeout(timeout).with_write_timeout(timeout)
    }

    /// Sets the advertised retry bound.
    pub fn with_max_dial_retries(mut self, retries: u32) -> Self {
        self.max_dial_retries = retries;
        self
    }

    /// Sets the endpoint label.
    pub fn with_endpoint_id(mut self, id: impl Into<String>) -> Self {
        self.endpoint_id = Some(id.into());
        self
    }

    /// Returns the label used in logs, `"signer-endpoint"` if none was set.
    pub fn display_id(&self) -> &str {
        self.endpoint_id.as_deref().unwrap_or("signer-endpoint")
    }

    /// Checks the configuration for values the endpoint cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidConfiguration`] when any duration is
    /// zero. A zero heartbeat period would make the ticker panic and a zero
    /// deadline would fail every exchange.
    pub fn validate(&self) -> Result<(), EndpointError> {
        let durations = [
            ("heartbeat_period", self.heartbeat_period),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ];

        for (name, value) in durations {
            if value.is_zero() {
                return Err(EndpointError::InvalidConfiguration {
                    reason: format!("{name} must be greater than zero"),
                });
            }
        }

        Ok(())
    }
}
