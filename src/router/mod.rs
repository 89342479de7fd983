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

//! Request routing: from inbound invocation to exported service.
//!
//! The [`Router`] keeps the table of exported services keyed by the
//! composite `group/path:version:port` key, resolves each inbound
//! invocation against it, and enforces the callback allowlist. It plugs into
//! the connection layer as a [`RequestHandler`], and fires the configured
//! `onconnect`/`ondisconnect` notifications as channels come and go.

mod classify;
mod exporter;

pub use classify::{classify, is_client_side, CallKind};
pub use exporter::RpcService;

use crate::codec::RpcCodec;
use crate::connection::{ChannelInfo, RequestHandler};
use crate::invocation::{keys, Invocation, RpcResult, WireFault};
use crate::url::{service_key, ServiceUrl};
use async_trait::async_trait;
use exporter::ExportEntry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Errors raised while resolving an inbound invocation.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// No exported service matches the routing key.
    #[error(
        "service {key} not found on {local} (remote {remote}); exported services: [{exported}]"
    )]
    ServiceNotFound {
        /// The composite key that missed.
        key: String,
        /// Comma-joined keys currently exported.
        exported: String,
        /// Local channel address.
        local: String,
        /// Remote channel address.
        remote: String,
    },
}

/// Routes inbound invocations to exported services.
///
/// # Examples
///
/// ```rust
/// use ferrum_rpc::codec::RpcCodec;
/// use ferrum_rpc::router::{Router, RpcService};
/// use ferrum_rpc::{Invocation, RpcResult, ServiceUrl};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Echo;
///
/// #[async_trait]
/// impl RpcService for Echo {
///     async fn invoke(&self, invocation: &Invocation) -> RpcResult {
///         RpcResult::value(invocation.arguments()[0].clone())
///     }
/// }
///
/// let router = Router::new(RpcCodec::new());
/// let url = ServiceUrl::new("127.0.0.1", 20880, "demo.Service")
///     .with_param("version", "1.0.0");
/// let key = router.export(url, Arc::new(Echo));
/// assert_eq!(key, "demo.Service:1.0.0:20880");
/// ```
pub struct Router {
    codec: RpcCodec,
    exports: RwLock<HashMap<String, ExportEntry>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("exports", &self.exported_keys())
            .finish()
    }
}

impl Router {
    /// Creates an empty router sharing `codec`'s capability set.
    #[must_use]
    pub fn new(codec: RpcCodec) -> Self {
        Self {
            codec,
            exports: RwLock::new(HashMap::new()),
        }
    }

    /// Exports `service` under `url`'s composite key, returning the key.
    ///
    /// The URL's serialization format is advertised for the path, which is
    /// what the codec's inbound capability check validates against.
    pub fn export(&self, url: ServiceUrl, service: Arc<dyn RpcService>) -> String {
        let key = url.service_key();
        if let Some(serializer) = self.codec.registry().by_name(url.serialization()) {
            self.codec.permitted().advertise(url.path(), serializer.id());
        }
        let entry = ExportEntry::new(url, service);
        info!(%key, "service exported");
        self.exports.write().insert(key.clone(), entry);
        key
    }

    /// Removes an export; returns `false` when the key was not present.
    pub fn unexport(&self, key: &str) -> bool {
        let mut exports = self.exports.write();
        let Some(entry) = exports.remove(key) else {
            return false;
        };
        let path = entry.url.path().to_string();
        let path_still_used = exports.values().any(|e| e.url.path() == path);
        drop(exports);
        if !path_still_used {
            self.codec.permitted().revoke(&path);
        }
        info!(%key, "service unexported");
        true
    }

    /// Keys currently exported.
    #[must_use]
    pub fn exported_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.exports.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Resolves and runs one inbound invocation.
    ///
    /// `Ok(None)` means the call was deliberately refused (callback method
    /// outside the allowlist); no response should be sent.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::ServiceNotFound`] when no export matches the
    /// composite key.
    pub async fn route(
        &self,
        channel: &ChannelInfo,
        mut invocation: Invocation,
    ) -> Result<Option<RpcResult>, RoutingError> {
        let kind = classify(channel, &invocation);

        // Stub events were exported under the consumer's own port, which on
        // this side of the channel is the remote port.
        let port = match kind {
            CallKind::StubEvent => channel.remote.port,
            CallKind::Normal | CallKind::Callback => channel.local.port,
        };

        let mut path = invocation
            .attachment(keys::PATH)
            .unwrap_or_default()
            .to_string();
        if kind == CallKind::Callback {
            if let Some(suffix) = invocation.attachment(keys::CALLBACK_SERVICE) {
                path = format!("{path}.{suffix}");
            }
            invocation.set_attachment(keys::IS_CALLBACK_INVOKE, "true");
        }

        let key = service_key(
            port,
            &path,
            invocation.attachment(keys::VERSION).unwrap_or(""),
            invocation.attachment(keys::GROUP).unwrap_or(""),
        );

        let service = {
            let exports = self.exports.read();
            let Some(entry) = exports.get(&key) else {
                return Err(RoutingError::ServiceNotFound {
                    key,
                    exported: self_keys_joined(&exports),
                    local: channel.local.to_string(),
                    remote: channel.remote.to_string(),
                });
            };
            if kind != CallKind::Normal {
                if let Some(allowed) = &entry.allowed_methods {
                    if !allowed.contains(invocation.method()) {
                        warn!(
                            %key,
                            method = invocation.method(),
                            remote = %channel.remote,
                            "refusing callback method outside the allowlist"
                        );
                        return Ok(None);
                    }
                }
            }
            entry.service.clone()
        };

        Ok(Some(service.invoke(&invocation).await))
    }

    /// Fires the configured lifecycle notification on every export that
    /// declares one. Failures are logged, never propagated.
    async fn fire_lifecycle_event(
        &self,
        channel: &ChannelInfo,
        pick: fn(&ServiceUrl) -> Option<&str>,
    ) {
        let targets: Vec<(Arc<dyn RpcService>, String, String)> = {
            self.exports
                .read()
                .values()
                .filter_map(|entry| {
                    pick(&entry.url).map(|method| {
                        (
                            entry.service.clone(),
                            method.to_string(),
                            entry.url.path().to_string(),
                        )
                    })
                })
                .collect()
        };
        for (service, method, path) in targets {
            let invocation = Invocation::new(&method)
                .with_attachment(keys::PATH, &path)
                .with_attachment("channel.remote", channel.remote.to_string());
            let result = service.invoke(&invocation).await;
            if let Some(fault) = result.as_fault() {
                warn!(%path, method, %fault, "lifecycle notification failed");
            }
        }
    }
}

fn self_keys_joined(exports: &HashMap<String, ExportEntry>) -> String {
    let mut keys: Vec<&str> = exports.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys.join(", ")
}

#[async_trait]
impl RequestHandler for Router {
    async fn handle(&self, channel: &ChannelInfo, invocation: Invocation) -> Option<RpcResult> {
        match self.route(channel, invocation).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(%error, "routing failed");
                Some(RpcResult::fault(WireFault::new(error.to_string())))
            }
        }
    }

    async fn connected(&self, channel: &ChannelInfo) {
        self.fire_lifecycle_event(channel, ServiceUrl::on_connect_method)
            .await;
    }

    async fn disconnected(&self, channel: &ChannelInfo) {
        self.fire_lifecycle_event(channel, ServiceUrl::on_disconnect_method)
            .await;
    }
}
