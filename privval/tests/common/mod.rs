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

//! Scripted remote signer used by the integration tests.

#![allow(dead_code)]

use privval::SignerMessage;
use privval::serialization::framing;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

/// What the fake signer does with one request.
pub enum Reply {
    /// Write this response.
    Send(SignerMessage),
    /// Write this response once the delay has passed.
    Late(Duration, SignerMessage),
    /// Read the request and never answer it.
    Silence,
    /// Drop the connection.
    HangUp,
}

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Answers like a well-behaved signer. Signing requests are echoed back so a
/// test can match every response to its request.
pub fn honest(request: &SignerMessage) -> Reply {
    Reply::Send(match request {
        SignerMessage::PingRequest => SignerMessage::PingResponse,
        SignerMessage::PubKeyRequest => SignerMessage::PubKeyResponse {
            pub_key: vec![0xAB; 32],
            error: None,
        },
        SignerMessage::SignVoteRequest { vote } => SignerMessage::SignedVoteResponse {
            vote: vote.clone(),
            error: None,
        },
        SignerMessage::SignProposalRequest { proposal } => SignerMessage::SignedProposalResponse {
            proposal: proposal.clone(),
            error: None,
        },
        _ => return Reply::HangUp,
    })
}

/// Answers pings with a public key response and everything else honestly.
pub fn wrong_pong(request: &SignerMessage) -> Reply {
    match request {
        SignerMessage::PingRequest => Reply::Send(SignerMessage::PubKeyResponse {
            pub_key: Vec::new(),
            error: None,
        }),
        other => honest(other),
    }
}

/// Answers the first request after `delay` and the rest honestly.
pub fn late_first(delay: Duration) -> impl FnMut(&SignerMessage) -> Reply + Send + 'static {
    let mut first = true;
    move |request| match (std::mem::take(&mut first), honest(request)) {
        (true, Reply::Send(response)) => Reply::Late(delay, response),
        (_, reply) => reply,
    }
}

/// Reads requests and never answers.
pub fn silent(_request: &SignerMessage) -> Reply {
    Reply::Silence
}

/// Handle to a running fake signer.
pub struct FakeSigner {
    requests: Arc<Mutex<Vec<SignerMessage>>>,
    task: JoinHandle<()>,
}

impl FakeSigner {
    /// Serves requests on `transport` until the endpoint hangs up or the
    /// script returns [`Reply::HangUp`].
    pub fn spawn<T, F>(mut transport: T, mut script: F) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        F: FnMut(&SignerMessage) -> Reply + Send + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        let task = tokio::spawn(async move {
            while let Ok(request) = framing::read_message(&mut transport).await {
                let reply = script(&request);
                log.lock().unwrap().push(request);

                match reply {
                    Reply::Send(response) => {
                        if framing::write_message(&mut transport, &response).await.is_err() {
                            break;
                        }
                    }
                    Reply::Late(delay, response) => {
                        tokio::time::sleep(delay).await;
                        if framing::write_message(&mut transport, &response).await.is_err() {
                            break;
                        }
                    }
                    Reply::Silence => {}
                    Reply::HangUp => break,
                }
            }
        });

        Self { requests, task }
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<SignerMessage> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns how many pings were received.
    pub fn pings(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|m| matches!(m, SignerMessage::PingRequest))
            .count()
    }

    /// Kills the signer, dropping its end of the connection.
    pub async fn crash(self) {
        self.task.abort();
        let _ = self.task.await;
    }

    /// Waits for the endpoint to hang up on this signer.
    pub async fn disconnected(self, within: Duration) -> bool {
        tokio::time::timeout(within, self.task).await.is_ok()
    }
}

/// Polls `condition` every few milliseconds until it holds or `within`
/// elapses. Returns whether it held.
pub async fn eventually(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(within, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
