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

//! Core data model: one logical remote call and its outcome.
//!
//! An [`Invocation`] carries the method name, ordered parameter-type
//! descriptors, ordered argument values, and a string attachment map used for
//! dispatch metadata (path, version, group, protocol version). A
//! [`RpcResult`] is exactly one of value, null, or fault, matching the three
//! response discriminators on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Well-known attachment keys carried alongside an invocation.
pub mod keys {
    /// Service path (interface name) the call targets.
    pub const PATH: &str = "path";
    /// Service version the call targets.
    pub const VERSION: &str = "version";
    /// Service group the call targets.
    pub const GROUP: &str = "group";
    /// Marks a client-stub event notification.
    pub const STUB_EVENT: &str = "stub.event";
    /// Suffix appended to the path when routing a callback invocation.
    pub const CALLBACK_SERVICE: &str = "callback.service";
    /// Internal marker set by the router once a call is classified as a
    /// callback invocation. Never sent by callers.
    pub const IS_CALLBACK_INVOKE: &str = "_is.callback.invoke";
}

/// One logical remote call.
///
/// Immutable once encoded; the dispatcher constructs a fresh `Invocation` per
/// call and stamps routing metadata into [`attachments`](Self::attachments)
/// before it hits the wire.
///
/// # Examples
///
/// ```rust
/// use ferrum_rpc::Invocation;
/// use serde_json::json;
///
/// let inv = Invocation::new("echo")
///     .with_argument("string", json!("hi"))
///     .with_attachment("path", "demo.Service");
/// assert_eq!(inv.method(), "echo");
/// assert_eq!(inv.arguments().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    method: String,
    parameter_types: Vec<String>,
    arguments: Vec<Value>,
    attachments: BTreeMap<String, String>,
    return_type: Option<String>,
}

impl Invocation {
    /// Creates an invocation of `method` with no arguments or attachments.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            parameter_types: Vec::new(),
            arguments: Vec::new(),
            attachments: BTreeMap::new(),
            return_type: None,
        }
    }

    /// Appends one argument with its type descriptor.
    ///
    /// Descriptors are free-form type names; the codec only requires that the
    /// descriptor list length matches the argument list length.
    #[must_use]
    pub fn with_argument(mut self, type_desc: impl Into<String>, value: Value) -> Self {
        self.parameter_types.push(type_desc.into());
        self.arguments.push(value);
        self
    }

    /// Sets one attachment entry.
    #[must_use]
    pub fn with_attachment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attachments.insert(key.into(), value.into());
        self
    }

    /// Declares the expected return value kind (`"string"`, `"number"`,
    /// `"bool"`, `"array"`, `"object"`).
    ///
    /// When set, response decoding verifies the payload against it instead of
    /// accepting any value shape.
    #[must_use]
    pub fn with_return_type(mut self, kind: impl Into<String>) -> Self {
        self.return_type = Some(kind.into());
        self
    }

    /// The invoked method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Ordered parameter-type descriptors, one per argument.
    #[must_use]
    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    /// Ordered argument values.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// The full attachment map.
    #[must_use]
    pub fn attachments(&self) -> &BTreeMap<String, String> {
        &self.attachments
    }

    /// Looks up one attachment value.
    #[must_use]
    pub fn attachment(&self, key: &str) -> Option<&str> {
        self.attachments.get(key).map(String::as_str)
    }

    /// Declared return kind, if any.
    #[must_use]
    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    /// Sets an attachment in place. Used by the dispatcher and router to
    /// stamp routing metadata.
    pub fn set_attachment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attachments.insert(key.into(), value.into());
    }

    /// Reassembles an invocation from decoded wire parts.
    pub(crate) fn rebuild(
        method: String,
        parameter_types: Vec<String>,
        arguments: Vec<Value>,
        attachments: BTreeMap<String, String>,
    ) -> Self {
        Self {
            method,
            parameter_types,
            arguments,
            attachments,
            return_type: None,
        }
    }
}

/// The error value a fault response carries on the wire.
///
/// This is the Throwable-like payload behind discriminator `0`: a decoded
/// fault position that does not deserialize to this shape is a protocol
/// violation, not a null result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFault {
    /// Human-readable failure description.
    pub message: String,
    /// Optional remote detail, e.g. an exception class name or stack digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl WireFault {
    /// Creates a fault with a message and no detail.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    /// Creates a fault carrying a remote detail string.
    #[must_use]
    pub fn with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for WireFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.message, detail),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for WireFault {}

/// Outcome of an [`Invocation`]: exactly one of fault, value, or null.
///
/// The three cases map one-to-one onto the wire discriminators (`0` fault,
/// `1` value, `2` null); the case is explicit, never inferred from a missing
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResult {
    /// The call returned a non-null value.
    Value(Value),
    /// The call completed and returned null.
    Null,
    /// The call raised an error on the remote side.
    Fault(WireFault),
}

impl RpcResult {
    /// Wraps a non-null return value.
    #[must_use]
    pub fn value(value: Value) -> Self {
        Self::Value(value)
    }

    /// A successful null return.
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Wraps a remote fault.
    #[must_use]
    pub fn fault(fault: WireFault) -> Self {
        Self::Fault(fault)
    }

    /// Returns the value if this is the value case.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the fault if this is the fault case.
    #[must_use]
    pub fn as_fault(&self) -> Option<&WireFault> {
        match self {
            Self::Fault(f) => Some(f),
            _ => None,
        }
    }

    /// `true` for the fault case.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// `true` for the null case.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("add")
            .with_argument("int", json!(1))
            .with_argument("int", json!(2))
            .with_attachment(keys::PATH, "math.Service");

        assert_eq!(inv.method(), "add");
        assert_eq!(inv.parameter_types(), &["int", "int"]);
        assert_eq!(inv.arguments(), &[json!(1), json!(2)]);
        assert_eq!(inv.attachment(keys::PATH), Some("math.Service"));
        assert_eq!(inv.attachment(keys::VERSION), None);
    }

    #[test]
    fn test_set_attachment_overwrites() {
        let mut inv = Invocation::new("m").with_attachment("k", "a");
        inv.set_attachment("k", "b");
        assert_eq!(inv.attachment("k"), Some("b"));
    }

    #[test]
    fn test_result_cases_are_distinct() {
        let value = RpcResult::value(json!("hi"));
        let null = RpcResult::null();
        let fault = RpcResult::fault(WireFault::new("boom"));

        assert!(value.as_value().is_some());
        assert!(!value.is_null());
        assert!(null.is_null());
        assert!(fault.is_fault());
        assert_eq!(fault.as_fault().unwrap().message, "boom");
    }

    #[test]
    fn test_fault_display() {
        let plain = WireFault::new("boom");
        assert_eq!(plain.to_string(), "boom");

        let detailed = WireFault::with_detail("boom", "IllegalState");
        assert_eq!(detailed.to_string(), "boom (IllegalState)");
    }

    #[test]
    fn test_fault_serde_roundtrip() {
        let fault = WireFault::with_detail("boom", "IllegalState");
        let bytes = serde_json::to_vec(&fault).unwrap();
        let decoded: WireFault = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(fault, decoded);
    }
}
