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

//! Top-level error type.
//!
//! Each layer of the engine has its own error enum; [`RpcError`] composes
//! them for callers that cross layers. The layers carry distinct recovery
//! strategies:
//!
//! - **Codec errors** → drop the frame, keep the channel
//! - **Connection errors** → reconnect or give the connection up
//! - **Dispatch errors** → surface to the caller per call
//! - **Routing errors** → reply with a fault, keep serving
//!
//! # Examples
//!
//! ```rust
//! use ferrum_rpc::connection::ConnectionError;
//! use ferrum_rpc::RpcError;
//!
//! let err: RpcError = ConnectionError::NotConnected {
//!     address: "127.0.0.1:20880".to_string(),
//! }
//! .into();
//! assert!(err.is_connection_error());
//! ```

use crate::codec::CodecError;
use crate::connection::ConnectionError;
use crate::dispatch::DispatchError;
use crate::router::RoutingError;
use crate::url::UrlError;
use std::error::Error as StdError;
use std::fmt;

/// Unified error type across every layer of the engine.
#[derive(Debug)]
pub enum RpcError {
    /// A frame body failed to encode or decode.
    Codec(CodecError),
    /// Connection establishment, teardown, or exchange failed.
    Connection(ConnectionError),
    /// A dispatched call failed or timed out.
    Dispatch(DispatchError),
    /// An inbound invocation could not be routed.
    Routing(RoutingError),
    /// A service URL parameter was malformed.
    Url(UrlError),
}

impl RpcError {
    /// Returns `true` for the codec layer.
    #[must_use]
    pub const fn is_codec_error(&self) -> bool {
        matches!(self, Self::Codec(_))
    }

    /// Returns `true` for the connection layer.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` for the dispatch layer.
    #[must_use]
    pub const fn is_dispatch_error(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Returns `true` for the routing layer.
    #[must_use]
    pub const fn is_routing_error(&self) -> bool {
        matches!(self, Self::Routing(_))
    }

    /// Returns `true` when retrying after a reconnect could succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Dispatch(e) => e.is_timeout(),
            Self::Codec(_) | Self::Routing(_) | Self::Url(_) => false,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch error: {e}"),
            Self::Routing(e) => write!(f, "routing error: {e}"),
            Self::Url(e) => write!(f, "url error: {e}"),
        }
    }
}

impl StdError for RpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Connection(e) => Some(e),
            Self::Dispatch(e) => Some(e),
            Self::Routing(e) => Some(e),
            Self::Url(e) => Some(e),
        }
    }
}

impl From<CodecError> for RpcError {
    fn from(error: CodecError) -> Self {
        Self::Codec(error)
    }
}

impl From<ConnectionError> for RpcError {
    fn from(error: ConnectionError) -> Self {
        Self::Connection(error)
    }
}

impl From<DispatchError> for RpcError {
    fn from(error: DispatchError) -> Self {
        Self::Dispatch(error)
    }
}

impl From<RoutingError> for RpcError {
    fn from(error: RoutingError) -> Self {
        Self::Routing(error)
    }
}

impl From<UrlError> for RpcError {
    fn from(error: UrlError) -> Self {
        Self::Url(error)
    }
}
