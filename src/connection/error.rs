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

//! Connection layer error types.

use crate::codec::CodecError;
use crate::url::UrlError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by connection establishment, teardown, and frame exchange.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A connect attempt did not produce a live channel.
    #[error(
        "failed to connect to {address} with protocol version {}: {reason}",
        crate::codec::PROTOCOL_VERSION
    )]
    ConnectFailed {
        /// Target address.
        address: String,
        /// Why the attempt failed.
        reason: String,
    },

    /// An operation that needs a live channel found none.
    #[error("not connected to {address}")]
    NotConnected {
        /// Target address.
        address: String,
    },

    /// The connection or handle was already closed.
    #[error("connection to {address} is closed")]
    Closed {
        /// Target address.
        address: String,
    },

    /// A lazy connection was asked for state it cannot have before first use.
    #[error("connection not yet initialized: {operation} requires an established channel")]
    NotInitialized {
        /// The operation that was refused.
        operation: &'static str,
    },

    /// The server is at its configured connection limit.
    #[error("connection from {address} rejected: accept limit {limit} reached")]
    AcceptLimit {
        /// Configured limit.
        limit: usize,
        /// The rejected peer.
        address: String,
    },

    /// The underlying channel went away mid-operation.
    #[error("channel to {address} closed while in use")]
    ChannelClosed {
        /// Peer address.
        address: String,
    },

    /// No response arrived within the allowed window.
    #[error("request to {address} timed out after {elapsed:?}")]
    RequestTimeout {
        /// Target address.
        address: String,
        /// How long the caller waited.
        elapsed: Duration,
    },

    /// The address is already bound by another server.
    #[error("address {address} is already bound")]
    AddressInUse {
        /// The contested address.
        address: String,
    },

    /// A frame body failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A connection parameter on the service URL was malformed.
    #[error(transparent)]
    Url(#[from] UrlError),
}

impl ConnectionError {
    /// `true` when retrying the operation after a reconnect could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. }
                | Self::NotConnected { .. }
                | Self::ChannelClosed { .. }
                | Self::RequestTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let retryable = ConnectionError::NotConnected {
            address: "127.0.0.1:20880".to_string(),
        };
        assert!(retryable.is_retryable());

        let terminal = ConnectionError::Closed {
            address: "127.0.0.1:20880".to_string(),
        };
        assert!(!terminal.is_retryable());
    }

    #[test]
    fn test_connect_failed_names_protocol_version() {
        let err = ConnectionError::ConnectFailed {
            address: "127.0.0.1:20880".to_string(),
            reason: "refused".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("127.0.0.1:20880"));
        assert!(message.contains(crate::codec::PROTOCOL_VERSION));
        assert!(message.contains("refused"));
    }

    #[test]
    fn test_display_carries_address() {
        let err = ConnectionError::RequestTimeout {
            address: "127.0.0.1:20880".to_string(),
            elapsed: Duration::from_millis(1000),
        };
        assert!(err.to_string().contains("127.0.0.1:20880"));
    }
}
