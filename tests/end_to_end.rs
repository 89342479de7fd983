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

//! End-to-end exercises of the full stack: router behind a server, clients
//! through the pool, invokers on top.

use async_trait::async_trait;
use ferrum_rpc::codec::RpcCodec;
use ferrum_rpc::connection::{
    Client, ClientPool, ExchangeClient, Frame, FrameKind, LazyClient, MemoryNetwork, NoopHandler,
    Server,
};
use ferrum_rpc::dispatch::Invoker;
use ferrum_rpc::invocation::keys;
use ferrum_rpc::router::{Router, RpcService};
use ferrum_rpc::{Invocation, RpcResult, ServiceUrl, WireFault};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Demo;

#[async_trait]
impl RpcService for Demo {
    async fn invoke(&self, invocation: &Invocation) -> RpcResult {
        match invocation.method() {
            "echo" => RpcResult::value(invocation.arguments()[0].clone()),
            "throw" => RpcResult::fault(WireFault::with_detail(
                "demo failure",
                "DemoException",
            )),
            _ => RpcResult::null(),
        }
    }
}

fn demo_url() -> ServiceUrl {
    ServiceUrl::new("127.0.0.1", 20880, "demo.Service").with_param("version", "1.0.0")
}

fn start_provider(network: &Arc<MemoryNetwork>, url: &ServiceUrl) -> (Server, RpcCodec) {
    let codec = RpcCodec::new();
    let router = Arc::new(Router::new(codec.clone()));
    router.export(url.clone(), Arc::new(Demo));
    let server = Server::bind(url.clone(), codec.clone(), router, network.clone()).unwrap();
    (server, codec)
}

#[tokio::test]
async fn test_echo_then_fault_roundtrip() {
    init_tracing();
    let network = MemoryNetwork::new();
    let url = demo_url();
    let (_server, codec) = start_provider(&network, &url);

    let client = Client::connect(url.clone(), codec, network, Arc::new(NoopHandler))
        .await
        .unwrap();
    let invoker = Invoker::new(url, vec![Arc::new(client)]);

    let result = invoker
        .invoke(Invocation::new("echo").with_argument("string", json!("hi")))
        .await
        .unwrap();
    assert_eq!(result.as_value(), Some(&json!("hi")));

    let result = invoker.invoke(Invocation::new("throw")).await.unwrap();
    let fault = result.as_fault().expect("fault case expected");
    assert_eq!(fault.message, "demo failure");
    assert_eq!(fault.detail.as_deref(), Some("DemoException"));

    invoker.destroy().await;
}

#[tokio::test]
async fn test_two_references_multiplex_one_connection() {
    init_tracing();
    let network = MemoryNetwork::new();
    let url = demo_url();
    let (server, codec) = start_provider(&network, &url);

    let pool = ClientPool::new(codec, network);
    let first = Arc::new(pool.share(&url).await.unwrap());
    let second = Arc::new(pool.share(&url).await.unwrap());

    // Both references ride the single physical channel.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.channel_count(), 1);
    assert_eq!(pool.reference_count(&url.address()).await, 2);

    let invoker_a = Invoker::new(url.clone(), vec![first.clone() as Arc<dyn ExchangeClient>]);
    let invoker_b = Invoker::new(url.clone(), vec![second.clone() as Arc<dyn ExchangeClient>]);
    let a = invoker_a
        .invoke(Invocation::new("echo").with_argument("string", json!("a")))
        .await
        .unwrap();
    let b = invoker_b
        .invoke(Invocation::new("echo").with_argument("string", json!("b")))
        .await
        .unwrap();
    assert_eq!(a.as_value(), Some(&json!("a")));
    assert_eq!(b.as_value(), Some(&json!("b")));

    // Closing one reference keeps the connection alive for the other.
    first.close().await;
    assert_eq!(pool.reference_count(&url.address()).await, 1);
    let still = invoker_b
        .invoke(Invocation::new("echo").with_argument("string", json!("still up")))
        .await
        .unwrap();
    assert_eq!(still.as_value(), Some(&json!("still up")));

    second.close().await;
    assert_eq!(pool.reference_count(&url.address()).await, 0);
}

#[tokio::test]
async fn test_lazy_reference_connects_on_first_call() {
    init_tracing();
    let network = MemoryNetwork::new();
    let url = demo_url().with_param("lazy", "true");
    let (server, codec) = start_provider(&network, &url);

    let lazy = LazyClient::new(url.clone(), codec, network, Arc::new(NoopHandler));
    let invoker = Invoker::new(url, vec![Arc::new(lazy)]);

    // The reference is usable before any physical connect happened.
    assert!(invoker.is_available());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.channel_count(), 0);

    let result = invoker
        .invoke(Invocation::new("echo").with_argument("string", json!("first")))
        .await
        .unwrap();
    assert_eq!(result.as_value(), Some(&json!("first")));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.channel_count(), 1);

    invoker.destroy().await;
}

#[tokio::test]
async fn test_callback_over_live_channel() {
    // The provider side drives a callback through the channel the consumer
    // opened; the consumer's router must classify it, apply the path
    // suffix, and enforce the allowlist.
    init_tracing();
    let network = MemoryNetwork::new();
    let codec = RpcCodec::new();
    let url = demo_url();

    let mut listener = network.bind(&url.address()).unwrap();
    let consumer_router = Arc::new(Router::new(codec.clone()));
    let _client = Client::connect(
        url.clone(),
        codec.clone(),
        network.clone(),
        consumer_router.clone(),
    )
    .await
    .unwrap();
    let provider_half = listener.recv().await.unwrap();

    // The consumer exports its callback service under its own port, which
    // the provider sees as the channel's remote port.
    let consumer_port = provider_half.remote_address().port;
    let callback_url = ServiceUrl::new("127.0.0.1", consumer_port, "demo.Service.cb42")
        .with_param("stub.event.methods", "onpush");
    consumer_router.export(callback_url, Arc::new(Demo));

    let callback = Invocation::new("onpush")
        .with_argument("string", json!("pushed"))
        .with_attachment(keys::PATH, "demo.Service")
        .with_attachment(keys::CALLBACK_SERVICE, "cb42");
    let (serialization, body) = codec.encode_request(&callback).unwrap();
    provider_half
        .send(Frame {
            id: 11,
            kind: FrameKind::Request,
            serialization,
            body,
        })
        .await
        .unwrap();

    let response = provider_half.recv().await.unwrap();
    assert_eq!(response.id, 11);
    let result = codec
        .decode_response(response.serialization, &callback, &response.body)
        .unwrap();
    // Demo's fallthrough answers null; what matters is that the callback
    // was routed at all.
    assert!(result.is_null());

    // A method outside the allowlist gets no response frame.
    let denied = Invocation::new("steal")
        .with_attachment(keys::PATH, "demo.Service")
        .with_attachment(keys::CALLBACK_SERVICE, "cb42");
    let (serialization, body) = codec.encode_request(&denied).unwrap();
    provider_half
        .send(Frame {
            id: 12,
            kind: FrameKind::Request,
            serialization,
            body,
        })
        .await
        .unwrap();
    let silence =
        tokio::time::timeout(Duration::from_millis(100), provider_half.recv()).await;
    assert!(silence.is_err(), "denied callback must stay unanswered");
}

#[tokio::test(start_paused = true)]
async fn test_client_survives_provider_restart() {
    init_tracing();
    let network = MemoryNetwork::new();
    let url = demo_url().with_param("reconnect", "50");
    let (server, codec) = start_provider(&network, &url);

    let client = Client::connect(
        url.clone(),
        codec.clone(),
        network.clone(),
        Arc::new(NoopHandler),
    )
    .await
    .unwrap();
    let invoker = Invoker::new(url.clone(), vec![Arc::new(client)]);

    let before = invoker
        .invoke(Invocation::new("echo").with_argument("string", json!("before")))
        .await
        .unwrap();
    assert_eq!(before.as_value(), Some(&json!("before")));

    // Take the provider down and bring it back; the reconnect loop should
    // quietly restore service.
    server.close(Duration::ZERO).await;
    let (_server, _codec) = start_provider(&network, &url);
    tokio::time::sleep(Duration::from_millis(500)).await;

    let after = invoker
        .invoke(Invocation::new("echo").with_argument("string", json!("after")))
        .await
        .unwrap();
    assert_eq!(after.as_value(), Some(&json!("after")));

    invoker.destroy().await;
}
