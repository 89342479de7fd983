//
// Copyright 2026 Ferrum RPC Contributors.
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

//! Dispatch layer error types.
//!
//! Callers need to tell a deadline miss from a transport failure: a timed
//! out call may have executed remotely, a network failure before send did
//! not. The two stay distinct variants for that reason.

use crate::connection::ConnectionError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of [`Invoker::invoke`](crate::dispatch::Invoker::invoke).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No response arrived before the call deadline. The remote side may
    /// still have executed the call.
    #[error("call to {method} on {address} timed out after {elapsed:?}")]
    Timeout {
        /// The invoked method.
        method: String,
        /// Target address.
        address: String,
        /// How long the caller waited.
        elapsed: Duration,
    },

    /// The call failed below the dispatch layer before completing.
    #[error("call to {method} on {address} failed: {source}")]
    Network {
        /// The invoked method.
        method: String,
        /// Target address.
        address: String,
        /// The underlying connection failure.
        #[source]
        source: ConnectionError,
    },

    /// The invoker was destroyed; no further calls are possible.
    #[error("invoker for {address} is destroyed")]
    Destroyed {
        /// Target address.
        address: String,
    },
}

impl DispatchError {
    /// `true` for the deadline-miss case.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
