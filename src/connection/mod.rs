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

//! Connection layer: channels, clients, servers, sharing, and laziness.
//!
//! The layer is built around two traits. [`ExchangeClient`] is the caller's
//! view of one logical connection; [`Client`] is the real thing,
//! [`SharedClient`] a reference-counted handle onto a pooled one, and
//! [`LazyClient`] a decorator that defers the physical connect until first
//! use. [`RequestHandler`] is the inbound seam: both clients and servers
//! push peer-initiated invocations through it, which is what makes the
//! protocol bidirectional.

mod channel;
mod client;
mod error;
mod lazy;
mod server;
mod shared;
mod state;

pub use channel::{
    AttributeMap, ChannelAddress, ChannelInfo, Connector, Frame, FrameKind, MemoryChannel,
    MemoryNetwork, RawChannel,
};
pub use client::{Client, ResponseFuture};
pub use error::ConnectionError;
pub use lazy::LazyClient;
pub use server::Server;
pub use shared::{ClientPool, SharedClient};
pub use state::{ConnectionState, StateCell};

use crate::invocation::{Invocation, RpcResult};
use crate::url::ServiceUrl;
use async_trait::async_trait;
use std::time::Duration;

/// Channel attribute set once the peer announces it is draining.
pub const READONLY_KEY: &str = "channel.readonly";

/// The caller's view of one logical connection.
///
/// Implemented by [`Client`], [`SharedClient`], and [`LazyClient`]; the
/// dispatcher only ever talks through this trait.
#[async_trait]
pub trait ExchangeClient: Send + Sync + 'static {
    /// The URL this connection was created from.
    fn url(&self) -> &ServiceUrl;

    /// `true` while a live channel is installed.
    fn is_connected(&self) -> bool;

    /// `true` once the connection is terminally closed.
    fn is_closed(&self) -> bool;

    /// Reads one connection attribute.
    fn attribute(&self, key: &str) -> Option<String>;

    /// Writes one connection attribute.
    ///
    /// # Errors
    ///
    /// A lazy connection refuses this before its first use with
    /// [`ConnectionError::NotInitialized`].
    fn set_attribute(&self, key: &str, value: &str) -> Result<(), ConnectionError>;

    /// Sends a two-way request, returning a future for its response.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] when no channel is available or the
    /// request could not be encoded or sent.
    async fn request(&self, invocation: Invocation) -> Result<ResponseFuture, ConnectionError>;

    /// Sends a one-way invocation. With `sent=true` the call waits for the
    /// transport to accept the frame rather than returning on enqueue.
    /// Transports whose [`RawChannel::send`] already confirms acceptance,
    /// like the in-process [`MemoryChannel`], behave the same in both modes.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] when no channel is available or the
    /// frame could not be sent.
    async fn send(&self, invocation: Invocation, sent: bool) -> Result<(), ConnectionError>;

    /// Tears down the current channel and establishes a fresh one.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] when the new connect attempt fails.
    async fn reconnect(&self) -> Result<(), ConnectionError>;

    /// Closes the connection. Idempotent; a second call is a no-op.
    async fn close(&self);

    /// Closes after waiting up to `timeout` for in-flight requests to
    /// complete. Requests still pending when the window expires fail the
    /// same way they do under [`close`](Self::close).
    async fn close_timeout(&self, timeout: Duration);
}

/// Receives peer-initiated invocations from a channel.
///
/// The server pushes every inbound request through its handler; a client
/// does the same for requests arriving on its outbound channel. Returning
/// `None` sends no response frame.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handles one inbound invocation, producing an optional reply.
    async fn handle(&self, channel: &ChannelInfo, invocation: Invocation) -> Option<RpcResult>;

    /// Called when a channel becomes live.
    async fn connected(&self, _channel: &ChannelInfo) {}

    /// Called when a channel goes away.
    async fn disconnected(&self, _channel: &ChannelInfo) {}
}

/// Handler for pure clients that never serve inbound requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

#[async_trait]
impl RequestHandler for NoopHandler {
    async fn handle(&self, _channel: &ChannelInfo, invocation: Invocation) -> Option<RpcResult> {
        tracing::debug!(method = invocation.method(), "no handler installed, dropping request");
        None
    }
}
