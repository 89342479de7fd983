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

//! Reference-counted sharing of physical connections.
//!
//! Many service references to the same remote address multiplex one
//! physical [`Client`]. The pool hands out [`SharedClient`] handles; each
//! handle closes exactly once, and the physical client is torn down and
//! removed from the pool when the last handle closes. Share and close both
//! run under the pool's registry lock, so a handle is never issued against
//! a client that is concurrently being torn down.

use crate::codec::RpcCodec;
use crate::connection::client::{Client, ResponseFuture};
use crate::connection::lazy::LazyClient;
use crate::connection::{
    ConnectionError, Connector, ExchangeClient, NoopHandler, RequestHandler,
};
use crate::invocation::Invocation;
use crate::url::ServiceUrl;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct PoolEntry {
    client: Client,
    refs: usize,
    generation: u64,
}

type Registry = Mutex<HashMap<String, PoolEntry>>;

/// Creates and shares physical clients keyed by remote address.
pub struct ClientPool {
    codec: RpcCodec,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn RequestHandler>,
    registry: Arc<Registry>,
    next_generation: AtomicU64,
}

impl fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool").finish_non_exhaustive()
    }
}

impl ClientPool {
    /// Creates a pool with no inbound request handling.
    #[must_use]
    pub fn new(codec: RpcCodec, connector: Arc<dyn Connector>) -> Self {
        Self::with_handler(codec, connector, Arc::new(NoopHandler))
    }

    /// Creates a pool whose clients serve peer-initiated requests through
    /// `handler`.
    #[must_use]
    pub fn with_handler(
        codec: RpcCodec,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        Self {
            codec,
            connector,
            handler,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Returns a handle onto the shared client for `url`'s address,
    /// creating the physical client on first use or after the previous one
    /// closed.
    ///
    /// # Errors
    ///
    /// Propagates the [`ConnectionError`] from a failed initial connect
    /// (subject to the URL's `check` flag).
    pub async fn share(&self, url: &ServiceUrl) -> Result<SharedClient, ConnectionError> {
        let address = url.address();
        let mut registry = self.registry.lock().await;

        if let Some(entry) = registry.get_mut(&address) {
            if !entry.client.is_closed() {
                entry.refs += 1;
                debug!(%address, refs = entry.refs, "sharing existing client");
                return Ok(SharedClient {
                    client: entry.client.clone(),
                    registry: self.registry.clone(),
                    address,
                    generation: entry.generation,
                    closed: AtomicBool::new(false),
                });
            }
            // Stale entry from a client closed out-of-band.
            registry.remove(&address);
        }

        let client = Client::connect(
            url.clone(),
            self.codec.clone(),
            self.connector.clone(),
            self.handler.clone(),
        )
        .await?;
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        registry.insert(
            address.clone(),
            PoolEntry {
                client: client.clone(),
                refs: 1,
                generation,
            },
        );
        info!(%address, "created shared client");
        Ok(SharedClient {
            client,
            registry: self.registry.clone(),
            address,
            generation,
            closed: AtomicBool::new(false),
        })
    }

    /// Builds the client set for one referred service from its URL.
    ///
    /// `connections=0` (the default) yields a single handle onto the shared
    /// per-address client; a positive count opens that many dedicated
    /// connections instead. `lazy=true` defers every connect until first
    /// use, so no channel exists until the first request.
    ///
    /// # Errors
    ///
    /// Propagates the [`ConnectionError`] from a failed eager connect
    /// (subject to the URL's `check` flag); lazy references cannot fail
    /// here.
    pub async fn refer(
        &self,
        url: &ServiceUrl,
    ) -> Result<Vec<Arc<dyn ExchangeClient>>, ConnectionError> {
        let connections = url.connections();
        if url.lazy() {
            let count = connections.max(1);
            return Ok((0..count)
                .map(|_| {
                    Arc::new(LazyClient::new(
                        url.clone(),
                        self.codec.clone(),
                        self.connector.clone(),
                        self.handler.clone(),
                    )) as Arc<dyn ExchangeClient>
                })
                .collect());
        }
        if connections == 0 {
            let shared = self.share(url).await?;
            return Ok(vec![Arc::new(shared)]);
        }
        let mut clients: Vec<Arc<dyn ExchangeClient>> = Vec::with_capacity(connections);
        for _ in 0..connections {
            let client = Client::connect(
                url.clone(),
                self.codec.clone(),
                self.connector.clone(),
                self.handler.clone(),
            )
            .await?;
            clients.push(Arc::new(client));
        }
        debug!(address = %url.address(), connections, "opened dedicated connections");
        Ok(clients)
    }

    /// Live handle count for `address`; `0` when no client is pooled there.
    pub async fn reference_count(&self, address: &str) -> usize {
        self.registry
            .lock()
            .await
            .get(address)
            .map_or(0, |entry| entry.refs)
    }

    /// Closes every pooled client and empties the registry.
    pub async fn destroy(&self) {
        let entries: Vec<PoolEntry> = {
            let mut registry = self.registry.lock().await;
            registry.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            entry.client.close().await;
        }
        info!("client pool destroyed");
    }
}

/// One reference onto a pooled [`Client`].
///
/// Closing decrements the pool's count exactly once, no matter how many
/// times `close` is called; the physical client closes when the count
/// reaches zero. A closed handle refuses further traffic instead of
/// resurrecting the connection.
pub struct SharedClient {
    client: Client,
    registry: Arc<Registry>,
    address: String,
    generation: u64,
    closed: AtomicBool,
}

impl fmt::Debug for SharedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedClient")
            .field("address", &self.address)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl SharedClient {
    fn guard(&self) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed {
                address: self.address.clone(),
            });
        }
        Ok(())
    }

    /// Drops this handle's reference. Returns `true` exactly once, when the
    /// last reference went away and the physical client must be torn down.
    async fn release(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut registry = self.registry.lock().await;
        match registry.get_mut(&self.address) {
            Some(entry) if entry.generation == self.generation => {
                entry.refs -= 1;
                if entry.refs == 0 {
                    registry.remove(&self.address);
                    true
                } else {
                    debug!(address = %self.address, refs = entry.refs, "shared client released");
                    false
                }
            }
            // The pool entry was replaced or destroyed underneath us.
            _ => false,
        }
    }
}

#[async_trait]
impl ExchangeClient for SharedClient {
    fn url(&self) -> &ServiceUrl {
        self.client.url()
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.client.is_connected()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.client.is_closed()
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.client.attribute(key)
    }

    fn set_attribute(&self, key: &str, value: &str) -> Result<(), ConnectionError> {
        self.guard()?;
        self.client.set_attribute(key, value)
    }

    async fn request(&self, invocation: Invocation) -> Result<ResponseFuture, ConnectionError> {
        self.guard()?;
        self.client.request(invocation).await
    }

    async fn send(&self, invocation: Invocation, sent: bool) -> Result<(), ConnectionError> {
        self.guard()?;
        self.client.send(invocation, sent).await
    }

    async fn reconnect(&self) -> Result<(), ConnectionError> {
        self.guard()?;
        self.client.reconnect().await
    }

    async fn close(&self) {
        if self.release().await {
            info!(address = %self.address, "last reference closed, tearing down client");
            self.client.close().await;
        }
    }

    async fn close_timeout(&self, timeout: Duration) {
        if self.release().await {
            info!(address = %self.address, "last reference closed, draining client");
            self.client.close_timeout(timeout).await;
        }
    }
}
