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

//! Pluggable payload serialization.
//!
//! Each serialization format carries a small numeric wire id; frames name
//! the id they were encoded with, the [`SerializerRegistry`] resolves it, and
//! [`PermittedSerializations`] rejects ids a service never advertised. The
//! latter is a compatibility and integrity guard, not an optimization.

use crate::codec::CodecError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Wire id of the built-in JSON format.
pub const JSON_SERIALIZATION_ID: u8 = 2;

/// A payload encoder/decoder.
///
/// Implementations must be thread-safe; the same serializer instance is
/// shared across every connection using its format.
pub trait Serializer: Send + Sync + 'static {
    /// Serializes one value to bytes.
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Deserializes one value from bytes.
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    /// Stable format name, used in service URLs.
    fn name(&self) -> &'static str;

    /// Numeric id written into each frame.
    fn id(&self) -> u8;
}

/// JSON serializer.
///
/// Human-readable and cross-language; the default format. Pretty printing is
/// available for debugging.
///
/// # Examples
///
/// ```rust
/// use ferrum_rpc::codec::{JsonSerializer, Serializer};
/// use serde_json::json;
///
/// let serializer = JsonSerializer::new();
/// let bytes = serializer.serialize(&json!({"id": 42})).unwrap();
/// let decoded = serializer.deserialize(&bytes).unwrap();
/// assert_eq!(decoded, json!({"id": 42}));
/// ```
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Creates a compact JSON serializer.
    #[must_use]
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Switches to pretty-printed output.
    #[must_use]
    pub fn with_pretty_print(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        if self.pretty {
            serde_json::to_vec_pretty(value).map_err(CodecError::serialize)
        } else {
            serde_json::to_vec(value).map_err(CodecError::serialize)
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::deserialize)
    }

    fn name(&self) -> &'static str {
        "json"
    }

    fn id(&self) -> u8 {
        JSON_SERIALIZATION_ID
    }
}

/// Maps serialization wire ids to serializer instances.
#[derive(Default)]
pub struct SerializerRegistry {
    by_id: RwLock<HashMap<u8, Arc<dyn Serializer>>>,
}

impl SerializerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in formats registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(JsonSerializer::new()));
        registry
    }

    /// Registers a serializer under its own id, replacing any previous one.
    pub fn register(&self, serializer: Arc<dyn Serializer>) {
        self.by_id.write().insert(serializer.id(), serializer);
    }

    /// Resolves a wire id.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownSerialization`] for unregistered ids.
    pub fn get(&self, id: u8) -> Result<Arc<dyn Serializer>, CodecError> {
        self.by_id
            .read()
            .get(&id)
            .cloned()
            .ok_or(CodecError::UnknownSerialization { id })
    }

    /// Resolves a format by its URL name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Serializer>> {
        self.by_id
            .read()
            .values()
            .find(|s| s.name() == name)
            .cloned()
    }
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<u8> = self.by_id.read().keys().copied().collect();
        f.debug_struct("SerializerRegistry").field("ids", &ids).finish()
    }
}

/// Per-service record of acceptable serialization ids.
///
/// Populated at export time from the service URL; checked against every
/// inbound request frame. A path with no record accepts any registered id,
/// since nothing was advertised to check against.
#[derive(Default)]
pub struct PermittedSerializations {
    by_path: RwLock<HashMap<String, HashSet<u8>>>,
}

impl PermittedSerializations {
    /// Creates an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `path` advertises support for `id`.
    pub fn advertise(&self, path: &str, id: u8) {
        self.by_path
            .write()
            .entry(path.to_string())
            .or_default()
            .insert(id);
    }

    /// Removes every advertisement for `path`.
    pub fn revoke(&self, path: &str) {
        self.by_path.write().remove(path);
    }

    /// Validates an inbound format id against what `path` advertised.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ForbiddenSerialization`] when `path` has a
    /// record that does not include `id`.
    pub fn check(&self, path: &str, id: u8) -> Result<(), CodecError> {
        match self.by_path.read().get(path) {
            Some(ids) if ids.contains(&id) => Ok(()),
            Some(_) => Err(CodecError::ForbiddenSerialization {
                path: path.to_string(),
                id,
            }),
            None => {
                debug!(path, id, "no serialization record for path, accepting");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for PermittedSerializations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths: Vec<String> = self.by_path.read().keys().cloned().collect();
        f.debug_struct("PermittedSerializations")
            .field("paths", &paths)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_roundtrip() {
        let serializer = JsonSerializer::new();
        let value = json!({"id": 42, "text": "hello", "values": [1, 2, 3]});
        let bytes = serializer.serialize(&value).unwrap();
        assert_eq!(serializer.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_json_invalid_data() {
        let serializer = JsonSerializer::new();
        assert!(matches!(
            serializer.deserialize(b"not valid json {"),
            Err(CodecError::Deserialize { .. })
        ));
    }

    #[test]
    fn test_json_pretty_print() {
        let serializer = JsonSerializer::new().with_pretty_print();
        let bytes = serializer.serialize(&json!({"a": 1, "b": 2})).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains('\n'));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SerializerRegistry::with_defaults();
        let serializer = registry.get(JSON_SERIALIZATION_ID).unwrap();
        assert_eq!(serializer.name(), "json");
        assert!(registry.by_name("json").is_some());
        assert!(registry.by_name("hessian").is_none());
    }

    #[test]
    fn test_registry_unknown_id() {
        let registry = SerializerRegistry::with_defaults();
        assert!(matches!(
            registry.get(99),
            Err(CodecError::UnknownSerialization { id: 99 })
        ));
    }

    #[test]
    fn test_permitted_check() {
        let permitted = PermittedSerializations::new();
        permitted.advertise("demo.Service", JSON_SERIALIZATION_ID);

        assert!(permitted.check("demo.Service", JSON_SERIALIZATION_ID).is_ok());
        assert!(matches!(
            permitted.check("demo.Service", 9),
            Err(CodecError::ForbiddenSerialization { .. })
        ));
        // No record means nothing was advertised to check against.
        assert!(permitted.check("other.Service", 9).is_ok());
    }

    #[test]
    fn test_permitted_revoke() {
        let permitted = PermittedSerializations::new();
        permitted.advertise("demo.Service", JSON_SERIALIZATION_ID);
        permitted.revoke("demo.Service");
        assert!(permitted.check("demo.Service", 9).is_ok());
    }
}
