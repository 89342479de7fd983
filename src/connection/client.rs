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

//! The exchange client: one logical connection to one remote address.
//!
//! A [`Client`] owns the physical channel, a correlation table for in-flight
//! requests, and two background tasks: the reader that pumps inbound frames,
//! and the reconnect loop that quietly re-establishes a lost channel. The
//! reconnect loop throttles its own logging so an unreachable peer does not
//! flood the log: one warning every `reconnect.warning.period` failed
//! attempts, plus a single error once failures outlast `shutdown.timeout`.

use crate::codec::RpcCodec;
use crate::connection::channel::{
    ChannelInfo, Connector, Frame, FrameKind, RawChannel,
};
use crate::connection::state::{ConnectionState, StateCell};
use crate::connection::{
    AttributeMap, ConnectionError, ExchangeClient, RequestHandler, READONLY_KEY,
};
use crate::invocation::{Invocation, RpcResult, WireFault};
use crate::url::ServiceUrl;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

struct PendingEntry {
    sender: oneshot::Sender<Result<RpcResult, ConnectionError>>,
    original: Invocation,
}

type PendingMap = Mutex<HashMap<u64, PendingEntry>>;

/// Handle to one in-flight request.
///
/// Dropping the future abandons the request; waiting past the deadline
/// cancels the correlation entry so a late response is discarded instead of
/// leaking table space.
#[derive(Debug)]
pub struct ResponseFuture {
    id: u64,
    address: String,
    receiver: oneshot::Receiver<Result<RpcResult, ConnectionError>>,
    pending: Weak<PendingMap>,
}

impl ResponseFuture {
    /// The request's correlation id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits up to `timeout` for the response.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::RequestTimeout`] when the deadline passes,
    /// or the failure the connection recorded for this request.
    pub async fn wait(self, timeout: Duration) -> Result<RpcResult, ConnectionError> {
        let Self {
            id,
            address,
            receiver,
            pending,
        } = self;
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ConnectionError::Closed { address }),
            Err(_) => {
                if let Some(pending) = pending.upgrade() {
                    pending.lock().remove(&id);
                }
                Err(ConnectionError::RequestTimeout {
                    address,
                    elapsed: timeout,
                })
            }
        }
    }
}

struct ClientInner {
    url: ServiceUrl,
    codec: RpcCodec,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn RequestHandler>,
    state: StateCell,
    channel: parking_lot::RwLock<Option<Arc<dyn RawChannel>>>,
    connect_lock: tokio::sync::Mutex<()>,
    pending: Arc<PendingMap>,
    next_id: AtomicU64,
    attributes: AttributeMap,
    reconnect_attempts: AtomicU64,
    reconnect_warnings: AtomicU64,
    reconnect_error_logged: AtomicBool,
    last_connected: Mutex<Instant>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

/// One logical connection to a remote address, with auto-reconnect.
///
/// Cheap to clone; all clones share the same physical channel and state.
///
/// # Examples
///
/// ```rust,no_run
/// use ferrum_rpc::codec::RpcCodec;
/// use ferrum_rpc::connection::{Client, ExchangeClient, MemoryNetwork, NoopHandler};
/// use ferrum_rpc::ServiceUrl;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let network = MemoryNetwork::new();
/// let url = ServiceUrl::new("127.0.0.1", 20880, "demo.Service");
/// let client = Client::connect(
///     url,
///     RpcCodec::new(),
///     network,
///     Arc::new(NoopHandler),
/// )
/// .await?;
/// assert!(client.is_connected());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.inner.url.address())
            .field("state", &self.inner.state.get())
            .finish()
    }
}

impl Client {
    /// Creates a client and attempts the initial connect.
    ///
    /// With `check=true` (the default) a failed initial connect aborts
    /// construction. With `check=false` the client is returned disconnected
    /// and the reconnect loop keeps trying in the background.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ConnectFailed`] under `check=true`, or a
    /// [`crate::url::UrlError`] for a malformed `reconnect` parameter.
    pub async fn connect(
        url: ServiceUrl,
        codec: RpcCodec,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self, ConnectionError> {
        let reconnect_period = url.reconnect_period()?;
        let inner = Arc::new(ClientInner {
            url,
            codec,
            connector,
            handler,
            state: StateCell::new(ConnectionState::Disconnected),
            channel: parking_lot::RwLock::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            attributes: AttributeMap::new(),
            reconnect_attempts: AtomicU64::new(0),
            reconnect_warnings: AtomicU64::new(0),
            reconnect_error_logged: AtomicBool::new(false),
            last_connected: Mutex::new(Instant::now()),
            reader_task: Mutex::new(None),
            reconnect_task: Mutex::new(None),
        });

        if let Err(error) = ClientInner::establish(&inner).await {
            if inner.url.check() {
                return Err(error);
            }
            warn!(
                address = %inner.url.address(),
                %error,
                "initial connect failed, continuing disconnected (check=false)"
            );
        }

        if let Some(period) = reconnect_period {
            ClientInner::spawn_reconnect(&inner, period);
        }
        Ok(Self { inner })
    }

    /// Failed reconnect attempts since the last successful connect.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u64 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Reconnect warnings emitted since the last successful connect.
    #[must_use]
    pub fn reconnect_warnings(&self) -> u64 {
        self.inner.reconnect_warnings.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    /// Closes the channel without tearing the client down; the reconnect
    /// loop (if any) will bring it back.
    pub async fn disconnect(&self) {
        self.inner.drop_channel(ConnectionState::Disconnected).await;
    }

    async fn require_channel(&self) -> Result<Arc<dyn RawChannel>, ConnectionError> {
        let inner = &self.inner;
        if inner.state.is_terminal() {
            return Err(ConnectionError::Closed {
                address: inner.url.address(),
            });
        }
        if let Some(channel) = inner.channel.read().clone() {
            if channel.is_open() {
                return Ok(channel);
            }
        }
        if inner.url.send_reconnect() {
            ClientInner::establish(inner).await?;
            if let Some(channel) = inner.channel.read().clone() {
                return Ok(channel);
            }
        }
        Err(ConnectionError::NotConnected {
            address: inner.url.address(),
        })
    }
}

#[async_trait]
impl ExchangeClient for Client {
    fn url(&self) -> &ServiceUrl {
        &self.inner.url
    }

    fn is_connected(&self) -> bool {
        self.inner.state.is_connected()
            && self
                .inner
                .channel
                .read()
                .as_ref()
                .is_some_and(|c| c.is_open())
    }

    fn is_closed(&self) -> bool {
        self.inner.state.get() == ConnectionState::Closed
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.inner.attributes.get(key)
    }

    fn set_attribute(&self, key: &str, value: &str) -> Result<(), ConnectionError> {
        self.inner.attributes.set(key, value);
        Ok(())
    }

    async fn request(&self, invocation: Invocation) -> Result<ResponseFuture, ConnectionError> {
        let channel = self.require_channel().await?;
        let inner = &self.inner;
        let id = inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        let (sender, receiver) = oneshot::channel();
        inner.pending.lock().insert(
            id,
            PendingEntry {
                sender,
                original: invocation.clone(),
            },
        );

        let encoded = inner.codec.encode_request(&invocation);
        let (serialization, body) = match encoded {
            Ok(parts) => parts,
            Err(error) => {
                inner.pending.lock().remove(&id);
                return Err(error.into());
            }
        };
        let frame = Frame {
            id,
            kind: FrameKind::Request,
            serialization,
            body,
        };
        if let Err(error) = channel.send(frame).await {
            inner.pending.lock().remove(&id);
            return Err(error);
        }
        Ok(ResponseFuture {
            id,
            address: inner.url.address(),
            receiver,
            pending: Arc::downgrade(&inner.pending),
        })
    }

    // The channel's send confirms acceptance before returning, so the
    // assured and unassured modes collapse here; `sent` matters only for
    // transports that buffer below the frame seam.
    async fn send(&self, invocation: Invocation, _sent: bool) -> Result<(), ConnectionError> {
        let channel = self.require_channel().await?;
        let (serialization, body) = self.inner.codec.encode_request(&invocation)?;
        channel
            .send(Frame {
                id: 0,
                kind: FrameKind::Oneway,
                serialization,
                body,
            })
            .await
    }

    async fn reconnect(&self) -> Result<(), ConnectionError> {
        self.disconnect().await;
        ClientInner::establish(&self.inner).await
    }

    async fn close(&self) {
        let inner = &self.inner;
        loop {
            let current = inner.state.get();
            if current.is_terminal() {
                return;
            }
            if inner.state.transition(current, ConnectionState::Closing) {
                break;
            }
        }

        if let Some(task) = inner.reconnect_task.lock().take() {
            task.abort();
        }
        inner.fail_pending();
        let channel = { inner.channel.write().take() };
        if let Some(channel) = channel {
            channel.close().await;
        }
        if let Some(task) = inner.reader_task.lock().take() {
            task.abort();
        }
        inner.state.set(ConnectionState::Closed);
        info!(address = %inner.url.address(), "client closed");
    }

    async fn close_timeout(&self, timeout: Duration) {
        let inner = &self.inner;
        let deadline = Instant::now() + timeout;
        while !inner.pending.lock().is_empty() && Instant::now() < deadline {
            if inner.state.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.close().await;
    }
}

impl ClientInner {
    /// Connects under the connect lock; a no-op when already connected.
    async fn establish(inner: &Arc<Self>) -> Result<(), ConnectionError> {
        let _guard = inner.connect_lock.lock().await;

        if inner.state.is_terminal() {
            return Err(ConnectionError::Closed {
                address: inner.url.address(),
            });
        }
        if inner.state.is_connected()
            && inner.channel.read().as_ref().is_some_and(|c| c.is_open())
        {
            return Ok(());
        }

        inner.state.set(ConnectionState::Connecting);
        match inner.connector.connect(&inner.url).await {
            Ok(channel) => {
                let old = { inner.channel.write().replace(channel.clone()) };
                if let Some(old) = old {
                    old.close().await;
                }
                Self::spawn_reader(inner, channel.clone());
                inner.state.set(ConnectionState::Connected);
                // A readonly hint belongs to the connection that carried it.
                inner.attributes.remove(READONLY_KEY);
                inner.reconnect_attempts.store(0, Ordering::SeqCst);
                inner.reconnect_warnings.store(0, Ordering::SeqCst);
                inner.reconnect_error_logged.store(false, Ordering::SeqCst);
                *inner.last_connected.lock() = Instant::now();
                info!(address = %inner.url.address(), "connected");
                let info = inner.channel_info(channel.as_ref());
                inner.handler.connected(&info).await;
                Ok(())
            }
            Err(error) => {
                inner.state.set(ConnectionState::Disconnected);
                Err(error)
            }
        }
    }

    fn spawn_reader(inner: &Arc<Self>, channel: Arc<dyn RawChannel>) {
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            loop {
                let Some(frame) = channel.recv().await else { break };
                let Some(inner) = weak.upgrade() else { break };
                inner.process_frame(channel.as_ref(), frame).await;
            }
            if let Some(inner) = weak.upgrade() {
                inner.on_channel_lost(&channel).await;
            }
        });
        let old = inner.reader_task.lock().replace(handle);
        if let Some(old) = old {
            old.abort();
        }
    }

    fn spawn_reconnect(inner: &Arc<Self>, period: Duration) {
        let weak = Arc::downgrade(inner);
        let warning_period = inner.url.reconnect_warning_period();
        let shutdown_timeout = inner.url.shutdown_timeout();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.state.is_terminal() {
                    break;
                }
                if inner.state.is_connected() {
                    continue;
                }
                if let Err(error) = Self::establish(&inner).await {
                    inner.note_reconnect_failure(&error, warning_period, shutdown_timeout);
                }
            }
        });
        *inner.reconnect_task.lock() = Some(handle);
    }

    fn note_reconnect_failure(
        &self,
        error: &ConnectionError,
        warning_period: u64,
        shutdown_timeout: Duration,
    ) {
        let attempts = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let silent_for = self.last_connected.lock().elapsed();
        if silent_for > shutdown_timeout
            && !self.reconnect_error_logged.swap(true, Ordering::SeqCst)
        {
            error!(
                address = %self.url.address(),
                attempts,
                ?silent_for,
                %error,
                "reconnect has failed for longer than the shutdown timeout"
            );
        }
        if attempts % warning_period == 0 {
            self.reconnect_warnings.fetch_add(1, Ordering::SeqCst);
            warn!(
                address = %self.url.address(),
                attempts,
                %error,
                "reconnect still failing"
            );
        }
    }

    fn channel_info(&self, channel: &dyn RawChannel) -> ChannelInfo {
        ChannelInfo {
            url: self.url.clone(),
            local: channel.local_address(),
            remote: channel.remote_address(),
        }
    }

    async fn process_frame(&self, channel: &dyn RawChannel, frame: Frame) {
        match frame.kind {
            FrameKind::Response => {
                let entry = self.pending.lock().remove(&frame.id);
                let Some(entry) = entry else {
                    debug!(id = frame.id, "response for unknown or expired request");
                    return;
                };
                let outcome = self
                    .codec
                    .decode_response(frame.serialization, &entry.original, &frame.body)
                    .map_err(ConnectionError::from);
                let _ = entry.sender.send(outcome);
            }
            FrameKind::Request | FrameKind::Oneway => {
                self.serve_request(channel, frame).await;
            }
            FrameKind::Readonly => {
                self.attributes.set(READONLY_KEY, "true");
                info!(address = %self.url.address(), "peer marked channel readonly");
            }
        }
    }

    /// Serves a peer-initiated request arriving on this client's channel.
    async fn serve_request(&self, channel: &dyn RawChannel, frame: Frame) {
        let info = self.channel_info(channel);
        let reply = match self.codec.decode_request(frame.serialization, &frame.body) {
            Ok(invocation) => self.handler.handle(&info, invocation).await,
            Err(error) => {
                warn!(remote = %info.remote, %error, "dropping undecodable inbound request");
                Some(RpcResult::fault(WireFault::new(error.to_string())))
            }
        };
        if frame.kind != FrameKind::Request {
            return;
        }
        let Some(result) = reply else { return };
        match self.codec.encode_response(frame.serialization, &result) {
            Ok(body) => {
                let response = Frame {
                    id: frame.id,
                    kind: FrameKind::Response,
                    serialization: frame.serialization,
                    body,
                };
                if let Err(error) = channel.send(response).await {
                    warn!(remote = %info.remote, %error, "failed to send response");
                }
            }
            Err(error) => {
                warn!(remote = %info.remote, %error, "failed to encode response");
            }
        }
    }

    /// Reacts to the channel ending underneath the reader.
    async fn on_channel_lost(&self, channel: &Arc<dyn RawChannel>) {
        let was_active = {
            let mut slot = self.channel.write();
            match slot.as_ref() {
                Some(current) if Arc::ptr_eq(current, channel) => {
                    slot.take();
                    true
                }
                _ => false,
            }
        };
        self.fail_pending();
        if was_active && !self.state.is_terminal() {
            self.state.set(ConnectionState::Disconnected);
            warn!(address = %self.url.address(), "channel lost");
        }
        let info = self.channel_info(channel.as_ref());
        self.handler.disconnected(&info).await;
    }

    async fn drop_channel(&self, next: ConnectionState) {
        let channel = { self.channel.write().take() };
        if let Some(channel) = channel {
            channel.close().await;
        }
        self.fail_pending();
        if !self.state.is_terminal() {
            self.state.set(next);
        }
    }

    fn fail_pending(&self) {
        let entries: Vec<PendingEntry> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            let _ = entry.sender.send(Err(ConnectionError::ChannelClosed {
                address: self.url.address(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemoryNetwork;
    use serde_json::json;

    fn url() -> ServiceUrl {
        ServiceUrl::new("127.0.0.1", 20880, "demo.Service")
    }

    async fn connected_client(
        network: &Arc<MemoryNetwork>,
        url: ServiceUrl,
    ) -> (Client, Arc<dyn RawChannel>) {
        let mut listener = network.bind(&url.address()).unwrap();
        let client = Client::connect(
            url,
            RpcCodec::new(),
            network.clone(),
            Arc::new(crate::connection::NoopHandler),
        )
        .await
        .unwrap();
        let server_half = listener.recv().await.unwrap();
        (client, server_half)
    }

    #[tokio::test]
    async fn test_connect_failure_with_check_aborts() {
        let network = MemoryNetwork::new();
        let result = Client::connect(
            url(),
            RpcCodec::new(),
            network,
            Arc::new(crate::connection::NoopHandler),
        )
        .await;
        assert!(matches!(result, Err(ConnectionError::ConnectFailed { .. })));
    }

    #[tokio::test]
    async fn test_connect_failure_without_check_returns_disconnected() {
        let network = MemoryNetwork::new();
        let url = url()
            .with_param("check", "false")
            .with_param("reconnect", "false");
        let client = Client::connect(
            url,
            RpcCodec::new(),
            network,
            Arc::new(crate::connection::NoopHandler),
        )
        .await
        .unwrap();
        assert!(!client.is_connected());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_request_correlates_response() {
        let network = MemoryNetwork::new();
        let (client, server_half) = connected_client(&network, url()).await;

        let invocation = Invocation::new("echo").with_argument("string", json!("hi"));
        let future = client.request(invocation).await.unwrap();

        // Hand-rolled peer: echo the first argument back.
        let codec = RpcCodec::new();
        let frame = server_half.recv().await.unwrap();
        let decoded = codec.decode_request(frame.serialization, &frame.body).unwrap();
        let result = RpcResult::value(decoded.arguments()[0].clone());
        let body = codec.encode_response(frame.serialization, &result).unwrap();
        server_half
            .send(Frame {
                id: frame.id,
                kind: FrameKind::Response,
                serialization: frame.serialization,
                body,
            })
            .await
            .unwrap();

        let outcome = future.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome.as_value(), Some(&json!("hi")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_cancels_pending() {
        let network = MemoryNetwork::new();
        let (client, _server_half) = connected_client(&network, url()).await;

        let future = client.request(Invocation::new("slow")).await.unwrap();
        let outcome = future.wait(Duration::from_millis(100)).await;
        assert!(matches!(
            outcome,
            Err(ConnectionError::RequestTimeout { .. })
        ));
        assert!(client.inner.pending.lock().is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_terminal() {
        let network = MemoryNetwork::new();
        let (client, _server_half) = connected_client(&network, url()).await;

        client.close().await;
        client.close().await;
        assert!(client.is_closed());

        let result = client.request(Invocation::new("echo")).await;
        assert!(matches!(result, Err(ConnectionError::Closed { .. })));
    }

    #[tokio::test]
    async fn test_close_timeout_drains_inflight_request() {
        let network = MemoryNetwork::new();
        let (client, server_half) = connected_client(&network, url()).await;

        let invocation = Invocation::new("echo").with_argument("string", json!("hi"));
        let future = client.request(invocation).await.unwrap();

        let closer = tokio::spawn({
            let client = client.clone();
            async move { client.close_timeout(Duration::from_secs(5)).await }
        });

        // Answer while the close is draining.
        let codec = RpcCodec::new();
        let frame = server_half.recv().await.unwrap();
        let result = RpcResult::value(json!("hi"));
        let body = codec.encode_response(frame.serialization, &result).unwrap();
        server_half
            .send(Frame {
                id: frame.id,
                kind: FrameKind::Response,
                serialization: frame.serialization,
                body,
            })
            .await
            .unwrap();

        let outcome = future.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome.as_value(), Some(&json!("hi")));
        closer.await.unwrap();
        assert!(client.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_timeout_gives_up_at_deadline() {
        let network = MemoryNetwork::new();
        let (client, _server_half) = connected_client(&network, url()).await;

        let future = client.request(Invocation::new("slow")).await.unwrap();
        client.close_timeout(Duration::from_millis(50)).await;
        assert!(client.is_closed());

        // The unanswered request fails the way an immediate close fails it.
        let outcome = future.wait(Duration::from_secs(1)).await;
        assert!(matches!(outcome, Err(ConnectionError::ChannelClosed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_channel_loss() {
        let network = MemoryNetwork::new();
        let url = url().with_param("reconnect", "50");
        let mut listener = network.bind(&url.address()).unwrap();
        let client = Client::connect(
            url,
            RpcCodec::new(),
            network.clone(),
            Arc::new(crate::connection::NoopHandler),
        )
        .await
        .unwrap();
        let first = listener.recv().await.unwrap();

        first.close().await;
        // The reconnect loop should re-establish within a few periods.
        let second = tokio::time::timeout(Duration::from_secs(5), listener.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(second.is_open());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_warning_throttling() {
        // No listener, so every attempt fails. Period 10ms, warn every 5
        // attempts; after ~52 periods the warn count is attempts/5 within 1.
        let network = MemoryNetwork::new();
        let url = url()
            .with_param("check", "false")
            .with_param("reconnect", "10")
            .with_param("reconnect.warning.period", "5");
        let client = Client::connect(
            url,
            RpcCodec::new(),
            network,
            Arc::new(crate::connection::NoopHandler),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(525)).await;
        let attempts = client.reconnect_attempts();
        let warnings = client.reconnect_warnings();
        assert!(attempts >= 50, "expected ~52 attempts, got {attempts}");
        let expected = attempts / 5;
        assert!(
            warnings >= expected.saturating_sub(1) && warnings <= expected + 1,
            "attempts={attempts} warnings={warnings}"
        );
        client.close().await;
    }

    #[tokio::test]
    async fn test_readonly_frame_sets_attribute() {
        let network = MemoryNetwork::new();
        let (client, server_half) = connected_client(&network, url()).await;

        server_half
            .send(Frame {
                id: 0,
                kind: FrameKind::Readonly,
                serialization: 0,
                body: Vec::new(),
            })
            .await
            .unwrap();
        // Give the reader task a turn.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.attribute(READONLY_KEY).as_deref(), Some("true"));
    }
}
