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

//! Per-argument value transformation hooks.
//!
//! The request codec passes every argument through an [`ArgumentTransform`]
//! on both sides of the wire. The default transform is the identity; a
//! deployment that needs callback-reference registration or argument
//! scrubbing injects its own implementation into the codec, the codec itself
//! stays oblivious to what the transform does.

use crate::codec::CodecError;
use crate::invocation::Invocation;
use serde_json::Value;

/// Rewrites individual argument values as they cross the codec boundary.
///
/// `encode` runs before serialization on the sending side, `decode` runs
/// after deserialization on the receiving side. Both receive the whole
/// invocation for context plus the argument's position.
pub trait ArgumentTransform: Send + Sync + 'static {
    /// Transforms an outbound argument before it is serialized.
    fn encode(
        &self,
        invocation: &Invocation,
        index: usize,
        value: &Value,
    ) -> Result<Value, CodecError>;

    /// Transforms an inbound argument after it was deserialized.
    fn decode(
        &self,
        invocation: &Invocation,
        index: usize,
        value: &Value,
    ) -> Result<Value, CodecError>;
}

/// Passes every argument through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTransform;

impl ArgumentTransform for IdentityTransform {
    fn encode(
        &self,
        _invocation: &Invocation,
        _index: usize,
        value: &Value,
    ) -> Result<Value, CodecError> {
        Ok(value.clone())
    }

    fn decode(
        &self,
        _invocation: &Invocation,
        _index: usize,
        value: &Value,
    ) -> Result<Value, CodecError> {
        Ok(value.clone())
    }
}
