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

//! Messages exchanged between the validator endpoint and a remote signer.
//!
//! The link carries a closed set of message variants. Signing payloads
//! (votes, proposals, public keys) are opaque byte strings: the endpoint only
//! moves them across the wire and never inspects them. The only variants the
//! endpoint itself produces or interprets are [`SignerMessage::PingRequest`]
//! and [`SignerMessage::PingResponse`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error reported in-band by a remote signer alongside a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSignerError {
    /// Signer-defined error code
    pub code: i32,
    /// Human readable description
    pub description: String,
}

impl RemoteSignerError {
    /// Creates a new remote signer error.
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl fmt::Display for RemoteSignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signer error {}: {}", self.code, self.description)
    }
}

impl std::error::Error for RemoteSignerError {}

/// Every message that can travel over the signer link.
///
/// The variant index is the wire discriminator, so variants must only ever
/// be appended.
///
/// # Examples
///
/// ```rust
/// use privval::serialization::SignerMessage;
///
/// let request = SignerMessage::SignVoteRequest { vote: vec![1, 2, 3] };
/// assert_eq!(request.name(), "SignVoteRequest");
/// assert!(request.is_request());
/// assert!(SignerMessage::PingResponse.is_ping_response());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerMessage {
    /// Ask the signer for its public key.
    PubKeyRequest,
    /// Public key held by the signer.
    PubKeyResponse {
        /// Encoded public key
        pub_key: Vec<u8>,
        /// Set when the signer could not produce the key
        error: Option<RemoteSignerError>,
    },
    /// Ask the signer to sign a vote.
    SignVoteRequest {
        /// Encoded vote
        vote: Vec<u8>,
    },
    /// Vote returned by the signer with its signature attached.
    SignedVoteResponse {
        /// Encoded signed vote
        vote: Vec<u8>,
        /// Set when the signer refused or failed to sign
        error: Option<RemoteSignerError>,
    },
    /// Ask the signer to sign a block proposal.
    SignProposalRequest {
        /// Encoded proposal
        proposal: Vec<u8>,
    },
    /// Proposal returned by the signer with its signature attached.
    SignedProposalResponse {
        /// Encoded signed proposal
        proposal: Vec<u8>,
        /// Set when the signer refused or failed to sign
        error: Option<RemoteSignerError>,
    },
    /// Liveness probe.
    PingRequest,
    /// Answer to a liveness probe.
    PingResponse,
}

impl SignerMessage {
    /// Returns the variant name, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PubKeyRequest => "PubKeyRequest",
            Self::PubKeyResponse { .. } => "PubKeyResponse",
            Self::SignVoteRequest { .. } => "SignVoteRequest",
            Self::SignedVoteResponse { .. } => "SignedVoteResponse",
            Self::SignProposalRequest { .. } => "SignProposalRequest",
            Self::SignedProposalResponse { .. } => "SignedProposalResponse",
            Self::PingRequest => "PingRequest",
            Self::PingResponse => "PingResponse",
        }
    }

    /// Returns `true` for variants sent by the endpoint to the signer.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::PubKeyRequest
                | Self::SignVoteRequest { .. }
                | Self::SignProposalRequest { .. }
                | Self::PingRequest
        )
    }

    /// Returns `true` if this is the expected answer to a liveness probe.
    pub fn is_ping_response(&self) -> bool {
        matches!(self, Self::PingResponse)
    }

    /// Returns the in-band signer error carried by a response, if any.
    pub fn remote_error(&self) -> Option<&RemoteSignerError> {
        match self {
            Self::PubKeyResponse { error, .. }
            | Self::SignedVoteResponse { error, .. }
            | Self::SignedProposalResponse { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for SignerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_classification() {
        assert!(SignerMessage::PingRequest.is_request());
        assert!(SignerMessage::PubKeyRequest.is_request());
        assert!(!SignerMessage::PingResponse.is_request());
        assert!(
            !SignerMessage::SignedVoteResponse {
                vote: vec![],
                error: None
            }
            .is_request()
        );
    }

    #[test]
    fn test_ping_response_detection() {
        assert!(SignerMessage::PingResponse.is_ping_response());
        assert!(!SignerMessage::PingRequest.is_ping_response());
        assert!(!SignerMessage::PubKeyRequest.is_ping_response());
    }

    #[test]
    fn test_remote_error_is_exposed() {
        let message = SignerMessage::SignedProposalResponse {
            proposal: vec![],
            error: Some(RemoteSignerError::new(2, "double sign")),
        };
        let error = message.remote_error().unwrap();
        assert_eq!(error.code, 2);
        assert_eq!(error.to_string(), "signer error 2: double sign");
        assert!(SignerMessage::PingResponse.remote_error().is_none());
    }

    #[test]
    fn test_ping_variants_have_distinct_discriminators() {
        let ping = postcard::to_stdvec(&SignerMessage::PingRequest).unwrap();
        let pong = postcard::to_stdvec(&SignerMessage::PingResponse).unwrap();
        assert_eq!(ping.len(), 1);
        assert_ne!(ping, pong);
    }
}
