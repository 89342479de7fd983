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

//! Wire codec: frame bodies for requests and responses.
//!
//! The codec layer turns [`Invocation`]s and [`RpcResult`]s into frame body
//! bytes and back. It is transport-agnostic; framing (frame ids, frame kinds)
//! lives in the connection layer, this module only deals in bodies plus the
//! serialization id each body was encoded with.
//!
//! # Examples
//!
//! ```rust
//! use ferrum_rpc::codec::RpcCodec;
//! use ferrum_rpc::{Invocation, RpcResult};
//! use serde_json::json;
//!
//! let codec = RpcCodec::new();
//! let invocation = Invocation::new("echo")
//!     .with_argument("string", json!("hi"))
//!     .with_attachment("path", "demo.Service");
//!
//! let (id, body) = codec.encode_request(&invocation).unwrap();
//! let decoded = codec.decode_request(id, &body).unwrap();
//! assert_eq!(decoded.method(), "echo");
//!
//! let reply = codec.encode_response(id, &RpcResult::value(json!("hi"))).unwrap();
//! let result = codec.decode_response(id, &invocation, &reply).unwrap();
//! assert_eq!(result.as_value(), Some(&json!("hi")));
//! ```

mod argument;
mod error;
mod request;
mod response;
mod serializer;
mod wire;

pub use argument::{ArgumentTransform, IdentityTransform};
pub use error::CodecError;
pub use request::{decode_request, encode_request, PROTOCOL_VERSION_KEY};
pub use response::{decode_response, encode_response, FLAG_FAULT, FLAG_NULL, FLAG_VALUE};
pub use serializer::{
    JsonSerializer, PermittedSerializations, Serializer, SerializerRegistry,
    JSON_SERIALIZATION_ID,
};
pub use wire::{put_block, put_str, WireReader, MAX_BLOCK_SIZE};

use crate::invocation::{keys, Invocation, RpcResult};
use std::sync::Arc;

/// Protocol version written into every request header.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Stateful codec facade: registry, capability set, and argument transform
/// bundled behind one pair of encode/decode entry points.
///
/// One `RpcCodec` is shared by every connection of an engine instance; it is
/// cheap to clone.
#[derive(Clone, Debug)]
pub struct RpcCodec {
    registry: Arc<SerializerRegistry>,
    permitted: Arc<PermittedSerializations>,
    default_serializer: Arc<dyn Serializer>,
    transform: Arc<dyn ArgumentTransform>,
}

impl std::fmt::Debug for dyn Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer").field("name", &self.name()).finish()
    }
}

impl std::fmt::Debug for dyn ArgumentTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ArgumentTransform")
    }
}

impl Default for RpcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcCodec {
    /// Creates a codec with the built-in formats, JSON as the default, and
    /// the identity argument transform.
    #[must_use]
    pub fn new() -> Self {
        let registry = Arc::new(SerializerRegistry::with_defaults());
        let default_serializer = registry
            .get(JSON_SERIALIZATION_ID)
            .unwrap_or_else(|_| Arc::new(JsonSerializer::new()));
        Self {
            registry,
            permitted: Arc::new(PermittedSerializations::new()),
            default_serializer,
            transform: Arc::new(IdentityTransform),
        }
    }

    /// Replaces the argument transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn ArgumentTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Registers an additional serialization format.
    #[must_use]
    pub fn with_serializer(self, serializer: Arc<dyn Serializer>) -> Self {
        self.registry.register(serializer);
        self
    }

    /// Selects the default outbound format by URL name.
    ///
    /// Unknown names leave the default unchanged.
    #[must_use]
    pub fn with_default_format(mut self, name: &str) -> Self {
        if let Some(serializer) = self.registry.by_name(name) {
            self.default_serializer = serializer;
        }
        self
    }

    /// The per-service capability set, for export-time advertisement.
    #[must_use]
    pub fn permitted(&self) -> &PermittedSerializations {
        &self.permitted
    }

    /// The serialization registry.
    #[must_use]
    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// Encodes an outbound request, returning the serialization id used and
    /// the body bytes.
    ///
    /// # Errors
    ///
    /// Propagates any [`CodecError`] from serialization.
    pub fn encode_request(&self, invocation: &Invocation) -> Result<(u8, Vec<u8>), CodecError> {
        let body = encode_request(
            self.default_serializer.as_ref(),
            self.transform.as_ref(),
            invocation,
        )?;
        Ok((self.default_serializer.id(), body))
    }

    /// Decodes an inbound request body encoded with serialization `id`.
    ///
    /// The capability check runs after the path is decoded, so a forbidden id
    /// is reported against the service that was actually targeted.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownSerialization`] for unregistered ids and
    /// [`CodecError::ForbiddenSerialization`] when the target service never
    /// advertised `id`, besides ordinary decode failures.
    pub fn decode_request(&self, id: u8, body: &[u8]) -> Result<Invocation, CodecError> {
        let serializer = self.registry.get(id)?;
        let invocation = decode_request(serializer.as_ref(), self.transform.as_ref(), body)?;
        if let Some(path) = invocation.attachment(keys::PATH) {
            self.permitted.check(path, id)?;
        }
        Ok(invocation)
    }

    /// Encodes an outbound response with serialization `id`, mirroring the
    /// format the request arrived in.
    ///
    /// # Errors
    ///
    /// Propagates any [`CodecError`] from serialization.
    pub fn encode_response(&self, id: u8, result: &RpcResult) -> Result<Vec<u8>, CodecError> {
        let serializer = self.registry.get(id)?;
        encode_response(serializer.as_ref(), result)
    }

    /// Decodes an inbound response body encoded with serialization `id`,
    /// narrowed against the invocation that produced it.
    ///
    /// # Errors
    ///
    /// Propagates any [`CodecError`] from deserialization or narrowing.
    pub fn decode_response(
        &self,
        id: u8,
        original: &Invocation,
        body: &[u8],
    ) -> Result<RpcResult, CodecError> {
        let serializer = self.registry.get(id)?;
        decode_response(serializer.as_ref(), original, body)
    }
}
