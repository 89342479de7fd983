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

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # Ferrum RPC - Protocol Engine
//!
//! Ferrum RPC is the protocol engine of a point-to-point RPC framework:
//!
//! - **Wire codec**: requests and three-way discriminated responses (fault,
//!   value, null) over length-prefixed blocks
//! - **Connection lifecycle**: explicit state machine with background
//!   auto-reconnect and throttled failure logging
//! - **Connection sharing**: reference-counted multiplexing of one physical
//!   connection per remote address
//! - **Lazy connections**: defer the physical connect until first use
//! - **Dispatch**: sync, async, and oneway call modes per method
//! - **Routing**: composite-key service lookup with callback classification
//!   and method allowlists
//!
//! ## Architecture
//!
//! The engine is organized in layers, each with its own error type:
//!
//! - **[`codec`]**: frame body encoding/decoding and serialization formats
//! - **[`connection`]**: channels, clients, servers, sharing, laziness
//! - **[`dispatch`]**: running calls against referred services
//! - **[`router`]**: resolving inbound invocations to exported services
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrum_rpc::codec::RpcCodec;
//! use ferrum_rpc::connection::{Client, MemoryNetwork, NoopHandler, Server};
//! use ferrum_rpc::dispatch::Invoker;
//! use ferrum_rpc::router::{Router, RpcService};
//! use ferrum_rpc::{Invocation, RpcResult, ServiceUrl};
//! use async_trait::async_trait;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl RpcService for Echo {
//!     async fn invoke(&self, invocation: &Invocation) -> RpcResult {
//!         RpcResult::value(invocation.arguments()[0].clone())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = MemoryNetwork::new();
//! let codec = RpcCodec::new();
//! let url = ServiceUrl::new("127.0.0.1", 20880, "demo.Service");
//!
//! // Provider: export the service and serve its address.
//! let router = Arc::new(Router::new(codec.clone()));
//! router.export(url.clone(), Arc::new(Echo));
//! let _server = Server::bind(url.clone(), codec.clone(), router, network.clone())?;
//!
//! // Consumer: connect and invoke.
//! let client = Client::connect(url.clone(), codec, network, Arc::new(NoopHandler)).await?;
//! let invoker = Invoker::new(url, vec![Arc::new(client)]);
//! let result = invoker
//!     .invoke(Invocation::new("echo").with_argument("string", json!("hi")))
//!     .await?;
//! assert_eq!(result.as_value(), Some(&json!("hi")));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod invocation;
pub mod router;
pub mod url;

pub use connection::{ExchangeClient, RequestHandler};
pub use error::RpcError;
pub use invocation::{Invocation, RpcResult, WireFault};
pub use url::ServiceUrl;
