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

//! Lazy connection establishment.
//!
//! A [`LazyClient`] satisfies the [`ExchangeClient`] contract without
//! touching the network until the first request or send. Until then
//! `is_connected` reports the URL's `lazy.initial.state` (default `true`, so
//! availability checks pass), and `set_attribute` fails fast rather than
//! silently writing state a real connection will never see.

use crate::codec::RpcCodec;
use crate::connection::client::{Client, ResponseFuture};
use crate::connection::{ConnectionError, Connector, ExchangeClient, RequestHandler};
use crate::invocation::Invocation;
use crate::url::ServiceUrl;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Defers the physical connect until the first request.
pub struct LazyClient {
    url: ServiceUrl,
    codec: RpcCodec,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn RequestHandler>,
    slot: RwLock<Option<Client>>,
    init_lock: tokio::sync::Mutex<()>,
    initial_state: bool,
    closed: AtomicBool,
}

impl fmt::Debug for LazyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyClient")
            .field("address", &self.url.address())
            .field("initialized", &self.slot.read().is_some())
            .finish()
    }
}

impl LazyClient {
    /// Creates the decorator without connecting.
    #[must_use]
    pub fn new(
        url: ServiceUrl,
        codec: RpcCodec,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        let initial_state = url.lazy_initial_state();
        Self {
            url,
            codec,
            connector,
            handler,
            slot: RwLock::new(None),
            init_lock: tokio::sync::Mutex::new(()),
            initial_state,
            closed: AtomicBool::new(false),
        }
    }

    /// `true` once the first use has established the real client.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Double-checked init: at most one connect races through the lock, the
    /// rest reuse the installed client.
    async fn ensure_client(&self) -> Result<Client, ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed {
                address: self.url.address(),
            });
        }
        if let Some(client) = self.slot.read().clone() {
            return Ok(client);
        }
        let _guard = self.init_lock.lock().await;
        if let Some(client) = self.slot.read().clone() {
            return Ok(client);
        }
        info!(address = %self.url.address(), "lazy client connecting on first use");
        let client = Client::connect(
            self.url.clone(),
            self.codec.clone(),
            self.connector.clone(),
            self.handler.clone(),
        )
        .await?;
        *self.slot.write() = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl ExchangeClient for LazyClient {
    fn url(&self) -> &ServiceUrl {
        &self.url
    }

    fn is_connected(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        match self.slot.read().as_ref() {
            Some(client) => client.is_connected(),
            None => self.initial_state,
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.slot.read().as_ref().and_then(|c| c.attribute(key))
    }

    fn set_attribute(&self, key: &str, value: &str) -> Result<(), ConnectionError> {
        match self.slot.read().as_ref() {
            Some(client) => client.set_attribute(key, value),
            None => Err(ConnectionError::NotInitialized {
                operation: "set_attribute",
            }),
        }
    }

    async fn request(&self, invocation: Invocation) -> Result<ResponseFuture, ConnectionError> {
        let client = self.ensure_client().await?;
        client.request(invocation).await
    }

    async fn send(&self, invocation: Invocation, sent: bool) -> Result<(), ConnectionError> {
        let client = self.ensure_client().await?;
        client.send(invocation, sent).await
    }

    async fn reconnect(&self) -> Result<(), ConnectionError> {
        let client = self.ensure_client().await?;
        client.reconnect().await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let client = self.slot.read().clone();
        if let Some(client) = client {
            client.close().await;
        }
    }

    async fn close_timeout(&self, timeout: Duration) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let client = self.slot.read().clone();
        if let Some(client) = client {
            client.close_timeout(timeout).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{MemoryNetwork, NoopHandler};
    use serde_json::json;

    fn lazy_url() -> ServiceUrl {
        ServiceUrl::new("127.0.0.1", 20880, "demo.Service").with_param("lazy", "true")
    }

    fn lazy_client(network: Arc<MemoryNetwork>, url: ServiceUrl) -> LazyClient {
        LazyClient::new(url, RpcCodec::new(), network, Arc::new(NoopHandler))
    }

    #[tokio::test]
    async fn test_no_connect_until_first_use() {
        let network = MemoryNetwork::new();
        let mut listener = network.bind("127.0.0.1:20880").unwrap();
        let client = lazy_client(network, lazy_url());

        // Nothing has connected yet.
        assert!(!client.is_initialized());
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), listener.recv())
                .await
                .is_err()
        );

        let _future = client
            .request(Invocation::new("echo").with_argument("string", json!("hi")))
            .await
            .unwrap();
        assert!(client.is_initialized());
        assert!(listener.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_initial_state_reported_before_use() {
        let network = MemoryNetwork::new();
        let optimistic = lazy_client(network.clone(), lazy_url());
        assert!(optimistic.is_connected());

        let pessimistic = lazy_client(
            network,
            lazy_url().with_param("lazy.initial.state", "false"),
        );
        assert!(!pessimistic.is_connected());
    }

    #[tokio::test]
    async fn test_set_attribute_fails_before_init() {
        let network = MemoryNetwork::new();
        let client = lazy_client(network, lazy_url());
        assert!(matches!(
            client.set_attribute("k", "v"),
            Err(ConnectionError::NotInitialized { .. })
        ));
        assert!(client.attribute("k").is_none());
    }

    #[tokio::test]
    async fn test_deferred_connect_failure_surfaces_on_use() {
        // No listener bound, so the first use fails.
        let network = MemoryNetwork::new();
        let client = lazy_client(network, lazy_url());
        let result = client.request(Invocation::new("echo")).await;
        assert!(matches!(result, Err(ConnectionError::ConnectFailed { .. })));
    }

    #[tokio::test]
    async fn test_close_before_init_prevents_later_use() {
        let network = MemoryNetwork::new();
        let mut listener = network.bind("127.0.0.1:20880").unwrap();
        let client = lazy_client(network, lazy_url());

        client.close().await;
        let result = client.request(Invocation::new("echo")).await;
        assert!(matches!(result, Err(ConnectionError::Closed { .. })));
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), listener.recv())
                .await
                .is_err()
        );
    }
}
