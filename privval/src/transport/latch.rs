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

//! One-way close signal shared by listeners and the connection manager.

use tokio::sync::watch;

/// A latch that flips from open to closed exactly once.
///
/// Any number of tasks can wait on [`CloseLatch::closed`]; all of them wake
/// when [`CloseLatch::close`] is called, including tasks that start waiting
/// afterwards.
#[derive(Debug)]
pub(crate) struct CloseLatch {
    tx: watch::Sender<bool>,
}

impl CloseLatch {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Closes the latch. Returns `true` only for the call that closed it.
    pub(crate) fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the latch is closed.
    pub(crate) async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` can only end by observing `true`.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for CloseLatch {
    fn default() -> Self {
        Self::new()
    }
}
