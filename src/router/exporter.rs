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

//! Exported service entries.

use crate::invocation::{Invocation, RpcResult};
use crate::url::ServiceUrl;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// A service implementation reachable through the router.
#[async_trait]
pub trait RpcService: Send + Sync + 'static {
    /// Executes one invocation. Failures are expressed as
    /// [`RpcResult::Fault`], never as a panic.
    async fn invoke(&self, invocation: &Invocation) -> RpcResult;
}

/// One exported service: its URL, implementation, and optional method
/// allowlist for callback-style invocation.
pub(crate) struct ExportEntry {
    pub(crate) url: ServiceUrl,
    pub(crate) service: Arc<dyn RpcService>,
    pub(crate) allowed_methods: Option<HashSet<String>>,
}

impl ExportEntry {
    pub(crate) fn new(url: ServiceUrl, service: Arc<dyn RpcService>) -> Self {
        let allowed_methods = allowlist_from(&url);
        Self {
            url,
            service,
            allowed_methods,
        }
    }
}

/// Parses the callback allowlist from the export URL.
///
/// `stub.event=true` without `stub.event.methods` yields an empty allowlist:
/// every callback-style invocation will be refused until methods are named.
fn allowlist_from(url: &ServiceUrl) -> Option<HashSet<String>> {
    match url.stub_event_methods() {
        Some(methods) => Some(
            methods
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
        ),
        None if url.stub_event() => {
            warn!(
                service = %url.service_key(),
                "stub.event is set but stub.event.methods is empty; \
                 all callback invocations on this export will be refused"
            );
            Some(HashSet::new())
        }
        None => None,
    }
}
