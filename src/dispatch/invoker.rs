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

//! The invoker: per-service dispatch over one or more connections.
//!
//! An [`Invoker`] stamps routing metadata onto each invocation and runs it
//! in one of three modes, chosen per method from the URL: synchronous
//! (default, wait for the result), `async` (return immediately, stash the
//! response future for later collection), or oneway (`return=false`, send
//! and forget).

use crate::connection::{ConnectionError, ExchangeClient, ResponseFuture, READONLY_KEY};
use crate::dispatch::DispatchError;
use crate::invocation::{keys, Invocation, RpcResult};
use crate::url::ServiceUrl;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Dispatches calls for one referred service.
pub struct Invoker {
    url: ServiceUrl,
    clients: Vec<Arc<dyn ExchangeClient>>,
    index: AtomicUsize,
    destroyed: AtomicBool,
    stashed: Mutex<VecDeque<ResponseFuture>>,
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("service", &self.url.service_key())
            .field("clients", &self.clients.len())
            .field("destroyed", &self.destroyed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Invoker {
    /// Creates an invoker over `clients`, round-robining when more than one
    /// is configured.
    #[must_use]
    pub fn new(url: ServiceUrl, clients: Vec<Arc<dyn ExchangeClient>>) -> Self {
        Self {
            url,
            clients,
            index: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
            stashed: Mutex::new(VecDeque::new()),
        }
    }

    /// The referred service's URL.
    #[must_use]
    pub fn url(&self) -> &ServiceUrl {
        &self.url
    }

    /// Runs one call in the mode the URL selects for its method.
    ///
    /// Async and oneway modes return [`RpcResult::Null`] immediately; for
    /// async mode the real response is collected later through
    /// [`take_response_future`](Self::take_response_future).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Destroyed`] after [`destroy`](Self::destroy),
    /// [`DispatchError::Timeout`] on a missed deadline, and
    /// [`DispatchError::Network`] for everything the connection layer
    /// reports.
    pub async fn invoke(&self, invocation: Invocation) -> Result<RpcResult, DispatchError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(DispatchError::Destroyed {
                address: self.url.address(),
            });
        }

        let method = invocation.method().to_string();
        let mut invocation = invocation;
        invocation.set_attachment(keys::PATH, self.url.path());
        if !self.url.version().is_empty() {
            invocation.set_attachment(keys::VERSION, self.url.version());
        }
        if !self.url.group().is_empty() {
            invocation.set_attachment(keys::GROUP, self.url.group());
        }

        let client = self.pick().ok_or_else(|| DispatchError::Network {
            method: method.clone(),
            address: self.url.address(),
            source: ConnectionError::NotConnected {
                address: self.url.address(),
            },
        })?;

        if !self.url.method_expects_return(&method) {
            let sent = self.url.method_sent(&method);
            client
                .send(invocation, sent)
                .await
                .map_err(|source| self.network(&method, source))?;
            return Ok(RpcResult::Null);
        }

        let future = client
            .request(invocation)
            .await
            .map_err(|source| self.network(&method, source))?;

        if self.url.method_async(&method) {
            debug!(method, "stashing response future for async collection");
            self.stashed.lock().push_back(future);
            return Ok(RpcResult::Null);
        }

        let timeout = self.url.method_timeout(&method);
        match future.wait(timeout).await {
            Ok(result) => Ok(result),
            Err(ConnectionError::RequestTimeout { elapsed, .. }) => Err(DispatchError::Timeout {
                method,
                address: self.url.address(),
                elapsed,
            }),
            Err(source) => Err(self.network(&method, source)),
        }
    }

    /// Takes the oldest stashed response future. Async-mode calls queue
    /// their futures, so interleaved calls each keep their own response;
    /// collect in the order the calls were issued.
    #[must_use]
    pub fn take_response_future(&self) -> Option<ResponseFuture> {
        self.stashed.lock().pop_front()
    }

    /// `true` while at least one connection is live and not marked readonly
    /// by the peer.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.destroyed.load(Ordering::SeqCst)
            && self.clients.iter().any(|client| {
                client.is_connected()
                    && client.attribute(READONLY_KEY).as_deref() != Some("true")
            })
    }

    /// `true` after [`destroy`](Self::destroy).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Closes every underlying connection. Only the first call does work.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        for client in &self.clients {
            client.close().await;
        }
        info!(service = %self.url.service_key(), "invoker destroyed");
    }

    fn pick(&self) -> Option<&Arc<dyn ExchangeClient>> {
        match self.clients.len() {
            0 => None,
            1 => self.clients.first(),
            len => {
                let start = self.index.fetch_add(1, Ordering::SeqCst);
                // Prefer a connected client; fall back to the rotation slot.
                (0..len)
                    .map(|offset| &self.clients[(start + offset) % len])
                    .find(|client| client.is_connected())
                    .or_else(|| Some(&self.clients[start % len]))
            }
        }
    }

    fn network(&self, method: &str, source: ConnectionError) -> DispatchError {
        DispatchError::Network {
            method: method.to_string(),
            address: self.url.address(),
            source,
        }
    }
}
