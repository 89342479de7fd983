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

//! Channel abstraction under the connection layer.
//!
//! A [`RawChannel`] moves whole [`Frame`]s between two peers; the connection
//! layer never sees partial reads. [`Connector`] is the seam a transport
//! plugs into, and [`MemoryNetwork`] provides the in-process transport used
//! by tests and examples.

use crate::connection::ConnectionError;
use crate::url::ServiceUrl;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// What one frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A two-way request; the peer owes a response with the same id.
    Request,
    /// A one-way request; no response follows.
    Oneway,
    /// A response correlated to an earlier request id.
    Response,
    /// Server-initiated marker: the peer is draining and should get no new
    /// work. Carries no body.
    Readonly,
}

/// One unit of exchange on a channel.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Correlation id; `0` for frames that correlate to nothing.
    pub id: u64,
    /// What the body contains.
    pub kind: FrameKind,
    /// Serialization id the body was encoded with.
    pub serialization: u8,
    /// Encoded body bytes.
    pub body: Vec<u8>,
}

/// One endpoint address of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAddress {
    /// Host name or address literal.
    pub host: String,
    /// Port number.
    pub port: u16,
}

impl ChannelAddress {
    /// Creates an address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// String attributes attached to a live channel.
///
/// Used for advisory flags the protocol smuggles alongside frames, like the
/// readonly marker or the idle timeout handed down from the URL.
#[derive(Debug, Default)]
pub struct AttributeMap {
    entries: RwLock<HashMap<String, String>>,
}

impl AttributeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up one attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Sets one attribute.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Removes one attribute.
    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// Static facts about a channel, handed to request handlers.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    /// The URL this endpoint was created from: the target URL on the client
    /// side, the bind URL on the server side.
    pub url: ServiceUrl,
    /// This endpoint's address.
    pub local: ChannelAddress,
    /// The peer's address.
    pub remote: ChannelAddress,
}

/// A transport channel moving whole frames.
#[async_trait]
pub trait RawChannel: Send + Sync + 'static {
    /// Sends one frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ChannelClosed`] when the channel or its
    /// peer is gone.
    async fn send(&self, frame: Frame) -> Result<(), ConnectionError>;

    /// Receives the next frame, or `None` once the channel is finished.
    async fn recv(&self) -> Option<Frame>;

    /// This endpoint's address.
    fn local_address(&self) -> ChannelAddress;

    /// The peer's address.
    fn remote_address(&self) -> ChannelAddress;

    /// `true` until [`close`](Self::close) or peer teardown.
    fn is_open(&self) -> bool;

    /// Closes the channel. Idempotent.
    async fn close(&self);

    /// Advisory attributes on this channel.
    fn attributes(&self) -> &AttributeMap;
}

/// Establishes outbound channels for clients.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a channel to the address in `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ConnectFailed`] when no channel could be
    /// established.
    async fn connect(&self, url: &ServiceUrl) -> Result<Arc<dyn RawChannel>, ConnectionError>;
}

/// In-process channel half backed by bounded queues.
#[derive(Debug)]
pub struct MemoryChannel {
    local: ChannelAddress,
    remote: ChannelAddress,
    tx: Mutex<Option<mpsc::Sender<Frame>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Frame>>,
    closed: watch::Sender<bool>,
    attributes: AttributeMap,
}

const CHANNEL_DEPTH: usize = 64;

impl MemoryChannel {
    /// Creates a connected pair of channel halves, `a` talking to `b`.
    #[must_use]
    pub fn pair(a: ChannelAddress, b: ChannelAddress) -> (Arc<Self>, Arc<Self>) {
        let (a_tx, b_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (b_tx, a_rx) = mpsc::channel(CHANNEL_DEPTH);
        let half_a = Arc::new(Self {
            local: a.clone(),
            remote: b.clone(),
            tx: Mutex::new(Some(a_tx)),
            rx: tokio::sync::Mutex::new(a_rx),
            closed: watch::channel(false).0,
            attributes: AttributeMap::new(),
        });
        let half_b = Arc::new(Self {
            local: b,
            remote: a,
            tx: Mutex::new(Some(b_tx)),
            rx: tokio::sync::Mutex::new(b_rx),
            closed: watch::channel(false).0,
            attributes: AttributeMap::new(),
        });
        (half_a, half_b)
    }

    fn sender(&self) -> Result<mpsc::Sender<Frame>, ConnectionError> {
        self.tx
            .lock()
            .clone()
            .ok_or_else(|| ConnectionError::ChannelClosed {
                address: self.remote.to_string(),
            })
    }
}

#[async_trait]
impl RawChannel for MemoryChannel {
    async fn send(&self, frame: Frame) -> Result<(), ConnectionError> {
        let sender = self.sender()?;
        sender
            .send(frame)
            .await
            .map_err(|_| ConnectionError::ChannelClosed {
                address: self.remote.to_string(),
            })
    }

    async fn recv(&self) -> Option<Frame> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return None;
        }
        let mut rx = self.rx.lock().await;
        tokio::select! {
            frame = rx.recv() => frame,
            _ = closed.changed() => None,
        }
    }

    fn local_address(&self) -> ChannelAddress {
        self.local.clone()
    }

    fn remote_address(&self) -> ChannelAddress {
        self.remote.clone()
    }

    fn is_open(&self) -> bool {
        !*self.closed.borrow() && self.tx.lock().is_some()
    }

    async fn close(&self) {
        // Dropping the sender ends the peer's recv loop. send_replace stores
        // the flag even while no receiver is subscribed.
        self.tx.lock().take();
        self.closed.send_replace(true);
    }

    fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

/// In-process network: named listeners plus a connector.
///
/// Servers bind an address and accept channel halves from it; clients
/// connect through the [`Connector`] impl. Ephemeral client ports are
/// allocated from the dynamic range so each channel pair has distinct
/// addresses.
///
/// # Examples
///
/// ```rust
/// use ferrum_rpc::connection::{Connector, MemoryNetwork};
/// use ferrum_rpc::ServiceUrl;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let network = MemoryNetwork::new();
/// let mut listener = network.bind("127.0.0.1:20880").unwrap();
///
/// let url = ServiceUrl::new("127.0.0.1", 20880, "demo.Service");
/// let client_half = network.connect(&url).await.unwrap();
/// let server_half = listener.recv().await.unwrap();
/// assert_eq!(client_half.remote_address(), server_half.local_address());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryNetwork {
    listeners: Mutex<HashMap<String, mpsc::Sender<Arc<dyn RawChannel>>>>,
    next_port: AtomicU16,
}

impl MemoryNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: Mutex::new(HashMap::new()),
            next_port: AtomicU16::new(49152),
        })
    }

    /// Binds `address` and returns the acceptor queue.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::AddressInUse`] when already bound.
    pub fn bind(
        &self,
        address: &str,
    ) -> Result<mpsc::Receiver<Arc<dyn RawChannel>>, ConnectionError> {
        let mut listeners = self.listeners.lock();
        if listeners.contains_key(address) {
            return Err(ConnectionError::AddressInUse {
                address: address.to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        listeners.insert(address.to_string(), tx);
        Ok(rx)
    }

    /// Releases a bound address.
    pub fn unbind(&self, address: &str) {
        self.listeners.lock().remove(address);
    }
}

#[async_trait]
impl Connector for MemoryNetwork {
    async fn connect(&self, url: &ServiceUrl) -> Result<Arc<dyn RawChannel>, ConnectionError> {
        let address = url.address();
        let acceptor = self
            .listeners
            .lock()
            .get(&address)
            .cloned()
            .ok_or_else(|| ConnectionError::ConnectFailed {
                address: address.clone(),
                reason: "no listener at address".to_string(),
            })?;

        let client_port = self.next_port.fetch_add(1, Ordering::SeqCst);
        let client_addr = ChannelAddress::new("127.0.0.1", client_port);
        let server_addr = ChannelAddress::new(url.host(), url.port());
        let (client_half, server_half) = MemoryChannel::pair(client_addr, server_addr);

        acceptor
            .send(server_half)
            .await
            .map_err(|_| ConnectionError::ConnectFailed {
                address,
                reason: "listener is gone".to_string(),
            })?;
        Ok(client_half)
    }
}
