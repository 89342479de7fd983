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

//! The exchange server: accepts channels and serves inbound requests.
//!
//! Every accepted channel gets its own reader task feeding the shared
//! [`RequestHandler`]. The `accepts` URL parameter caps concurrent channels;
//! channels past the cap are closed immediately. Shutdown is graceful: peers
//! first receive a readonly marker so they stop routing new work here, then
//! the channels close after the drain window.

use crate::codec::RpcCodec;
use crate::connection::channel::{ChannelInfo, Frame, FrameKind, MemoryNetwork, RawChannel};
use crate::connection::state::{ConnectionState, StateCell};
use crate::connection::{ConnectionError, RequestHandler};
use crate::invocation::{RpcResult, WireFault};
use crate::url::ServiceUrl;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct ServerInner {
    url: ServiceUrl,
    codec: RpcCodec,
    handler: Arc<dyn RequestHandler>,
    network: Arc<MemoryNetwork>,
    state: StateCell,
    channels: Mutex<Vec<Arc<dyn RawChannel>>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

/// Serves one bound address on an in-process network.
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.inner.url.address())
            .field("state", &self.inner.state.get())
            .finish()
    }
}

impl Server {
    /// Binds `url`'s address and starts accepting channels.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::AddressInUse`] when the address is taken.
    pub fn bind(
        url: ServiceUrl,
        codec: RpcCodec,
        handler: Arc<dyn RequestHandler>,
        network: Arc<MemoryNetwork>,
    ) -> Result<Self, ConnectionError> {
        let address = url.address();
        let mut acceptor = network.bind(&address)?;
        let inner = Arc::new(ServerInner {
            url,
            codec,
            handler,
            network,
            state: StateCell::new(ConnectionState::Connected),
            channels: Mutex::new(Vec::new()),
            accept_task: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let handle = tokio::spawn(async move {
            while let Some(channel) = acceptor.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                ServerInner::accept(&inner, channel).await;
            }
        });
        *inner.accept_task.lock() = Some(handle);
        info!(%address, "server listening");
        Ok(Self { inner })
    }

    /// The bind URL.
    #[must_use]
    pub fn url(&self) -> &ServiceUrl {
        &self.inner.url
    }

    /// Currently accepted channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.channels.lock().len()
    }

    /// `true` until [`close`](Self::close).
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.inner.state.is_terminal()
    }

    /// Stops accepting, marks peers readonly, waits out the drain window,
    /// then closes every channel. Idempotent.
    pub async fn close(&self, drain: Duration) {
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

        inner.network.unbind(&inner.url.address());
        if let Some(task) = inner.accept_task.lock().take() {
            task.abort();
        }

        let channels: Vec<Arc<dyn RawChannel>> = inner.channels.lock().clone();
        for channel in &channels {
            let readonly = Frame {
                id: 0,
                kind: FrameKind::Readonly,
                serialization: 0,
                body: Vec::new(),
            };
            if let Err(error) = channel.send(readonly).await {
                warn!(remote = %channel.remote_address(), %error, "readonly notice failed");
            }
        }
        if !drain.is_zero() {
            tokio::time::sleep(drain).await;
        }

        let channels: Vec<Arc<dyn RawChannel>> = {
            let mut held = inner.channels.lock();
            held.drain(..).collect()
        };
        for channel in channels {
            channel.close().await;
        }
        inner.state.set(ConnectionState::Closed);
        info!(address = %inner.url.address(), "server closed");
    }
}

impl ServerInner {
    async fn accept(inner: &Arc<Self>, channel: Arc<dyn RawChannel>) {
        let limit = inner.url.accepts();
        if limit > 0 && inner.channels.lock().len() >= limit {
            let error = ConnectionError::AcceptLimit {
                limit,
                address: channel.remote_address().to_string(),
            };
            warn!(%error, "rejecting channel");
            channel.close().await;
            return;
        }

        channel.attributes().set(
            "idle.timeout",
            inner.url.idle_timeout().as_millis().to_string(),
        );
        inner.channels.lock().push(channel.clone());

        let info = inner.channel_info(channel.as_ref());
        inner.handler.connected(&info).await;

        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            loop {
                let Some(frame) = channel.recv().await else { break };
                let Some(inner) = weak.upgrade() else { break };
                inner.serve(channel.as_ref(), frame).await;
            }
            if let Some(inner) = weak.upgrade() {
                inner.forget(&channel).await;
            }
        });
    }

    fn channel_info(&self, channel: &dyn RawChannel) -> ChannelInfo {
        ChannelInfo {
            url: self.url.clone(),
            local: channel.local_address(),
            remote: channel.remote_address(),
        }
    }

    async fn serve(&self, channel: &dyn RawChannel, frame: Frame) {
        if !matches!(frame.kind, FrameKind::Request | FrameKind::Oneway) {
            return;
        }
        let info = self.channel_info(channel);
        let reply = match self.codec.decode_request(frame.serialization, &frame.body) {
            Ok(invocation) => self.handler.handle(&info, invocation).await,
            Err(error) => {
                warn!(remote = %info.remote, %error, "dropping undecodable request");
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
            Err(error) => warn!(remote = %info.remote, %error, "failed to encode response"),
        }
    }

    async fn forget(&self, channel: &Arc<dyn RawChannel>) {
        self.channels.lock().retain(|held| !Arc::ptr_eq(held, channel));
        if !self.state.is_terminal() {
            let info = self.channel_info(channel.as_ref());
            self.handler.disconnected(&info).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connector, MemoryNetwork, NoopHandler};
    use crate::invocation::Invocation;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl RequestHandler for Echo {
        async fn handle(
            &self,
            _channel: &ChannelInfo,
            invocation: Invocation,
        ) -> Option<RpcResult> {
            Some(RpcResult::value(invocation.arguments()[0].clone()))
        }
    }

    fn url() -> ServiceUrl {
        ServiceUrl::new("127.0.0.1", 20880, "demo.Service")
    }

    #[tokio::test]
    async fn test_serves_request_frames() {
        let network = MemoryNetwork::new();
        let _server = Server::bind(url(), RpcCodec::new(), Arc::new(Echo), network.clone())
            .unwrap();

        let channel = network.connect(&url()).await.unwrap();
        let codec = RpcCodec::new();
        let invocation = Invocation::new("echo").with_argument("string", json!("hi"));
        let (serialization, body) = codec.encode_request(&invocation).unwrap();
        channel
            .send(Frame {
                id: 9,
                kind: FrameKind::Request,
                serialization,
                body,
            })
            .await
            .unwrap();

        let response = channel.recv().await.unwrap();
        assert_eq!(response.id, 9);
        assert_eq!(response.kind, FrameKind::Response);
        let result = codec
            .decode_response(response.serialization, &invocation, &response.body)
            .unwrap();
        assert_eq!(result.as_value(), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn test_accept_limit_rejects_extra_channels() {
        let network = MemoryNetwork::new();
        let url = url().with_param("accepts", "1");
        let server = Server::bind(url.clone(), RpcCodec::new(), Arc::new(NoopHandler), network.clone())
            .unwrap();

        let first = network.connect(&url).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(server.channel_count(), 1);

        let second = network.connect(&url).await.unwrap();
        // The server closes the rejected channel, which ends our recv.
        assert!(second.recv().await.is_none());
        assert_eq!(server.channel_count(), 1);
        assert!(first.is_open());
    }

    #[tokio::test]
    async fn test_close_marks_peers_readonly_then_closes() {
        let network = MemoryNetwork::new();
        let server = Server::bind(url(), RpcCodec::new(), Arc::new(NoopHandler), network.clone())
            .unwrap();

        let channel = network.connect(&url()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        server.close(Duration::ZERO).await;
        let frame = channel.recv().await.unwrap();
        assert_eq!(frame.kind, FrameKind::Readonly);
        assert!(channel.recv().await.is_none());
        assert!(!server.is_running());

        // The address is free again.
        assert!(network.bind("127.0.0.1:20880").is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let network = MemoryNetwork::new();
        let server = Server::bind(url(), RpcCodec::new(), Arc::new(NoopHandler), network)
            .unwrap();
        server.close(Duration::ZERO).await;
        server.close(Duration::ZERO).await;
        assert!(!server.is_running());
    }
}
