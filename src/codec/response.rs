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

//! Response body encoding and decoding.
//!
//! A response body starts with one discriminator byte: `0` for a remote
//! fault, `1` for a non-null value, `2` for a null return. Flags `0` and `1`
//! are followed by exactly one payload block; flag `2` carries nothing. Any
//! other byte is a protocol violation, never treated as a null result.

use crate::codec::serializer::Serializer;
use crate::codec::wire::{put_block, WireReader};
use crate::codec::CodecError;
use crate::invocation::{Invocation, RpcResult, WireFault};
use serde_json::Value;

/// Discriminator for a remote fault.
pub const FLAG_FAULT: u8 = 0;
/// Discriminator for a non-null return value.
pub const FLAG_VALUE: u8 = 1;
/// Discriminator for a null return.
pub const FLAG_NULL: u8 = 2;

/// Encodes one result into a response body.
///
/// # Errors
///
/// Returns a [`CodecError`] when the payload fails to serialize.
pub fn encode_response(
    serializer: &dyn Serializer,
    result: &RpcResult,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    match result {
        RpcResult::Fault(fault) => {
            buf.push(FLAG_FAULT);
            let value = serde_json::to_value(fault).map_err(CodecError::serialize)?;
            put_block(&mut buf, &serializer.serialize(&value)?)?;
        }
        RpcResult::Value(value) => {
            buf.push(FLAG_VALUE);
            put_block(&mut buf, &serializer.serialize(value)?)?;
        }
        RpcResult::Null => {
            buf.push(FLAG_NULL);
        }
    }
    Ok(buf)
}

/// Decodes a response body, narrowed against the originating invocation.
///
/// When `original` declared a return kind, a value response must match it.
///
/// # Errors
///
/// Returns [`CodecError::UnknownResponseFlag`] for a discriminator outside
/// `{0, 1, 2}`, [`CodecError::FaultNotDecodable`] when a fault payload does
/// not deserialize to an error value, and
/// [`CodecError::ReturnTypeMismatch`] when a value fails the declared-kind
/// check.
pub fn decode_response(
    serializer: &dyn Serializer,
    original: &Invocation,
    body: &[u8],
) -> Result<RpcResult, CodecError> {
    let mut reader = WireReader::new(body);
    match reader.get_u8()? {
        FLAG_FAULT => {
            let value = serializer.deserialize(reader.get_block()?)?;
            let fault: WireFault =
                serde_json::from_value(value).map_err(|e| CodecError::FaultNotDecodable {
                    reason: e.to_string(),
                })?;
            Ok(RpcResult::Fault(fault))
        }
        FLAG_VALUE => {
            let value = serializer.deserialize(reader.get_block()?)?;
            if let Some(expected) = original.return_type() {
                let actual = value_kind(&value);
                if expected != actual {
                    return Err(CodecError::ReturnTypeMismatch {
                        expected: expected.to_string(),
                        actual,
                    });
                }
            }
            Ok(RpcResult::Value(value))
        }
        FLAG_NULL => Ok(RpcResult::Null),
        flag => Err(CodecError::UnknownResponseFlag { flag }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::serializer::JsonSerializer;
    use serde_json::json;

    fn roundtrip(result: &RpcResult, original: &Invocation) -> Result<RpcResult, CodecError> {
        let serializer = JsonSerializer::new();
        let body = encode_response(&serializer, result).unwrap();
        decode_response(&serializer, original, &body)
    }

    #[test]
    fn test_value_response() {
        let original = Invocation::new("echo");
        let result = RpcResult::value(json!("hi"));
        assert_eq!(roundtrip(&result, &original).unwrap(), result);
    }

    #[test]
    fn test_null_response() {
        let original = Invocation::new("fire");
        assert_eq!(roundtrip(&RpcResult::null(), &original).unwrap(), RpcResult::Null);
    }

    #[test]
    fn test_fault_response() {
        let original = Invocation::new("boom");
        let result = RpcResult::fault(WireFault::with_detail("it broke", "IllegalState"));
        let decoded = roundtrip(&result, &original).unwrap();
        assert_eq!(decoded.as_fault().unwrap().message, "it broke");
    }

    #[test]
    fn test_unknown_flag_is_an_error() {
        let serializer = JsonSerializer::new();
        let original = Invocation::new("echo");
        for flag in [3u8, 7, 255] {
            let result = decode_response(&serializer, &original, &[flag]);
            assert!(
                matches!(result, Err(CodecError::UnknownResponseFlag { flag: f }) if f == flag)
            );
        }
    }

    #[test]
    fn test_fault_payload_must_be_an_error_value() {
        // Flag 0 followed by something that is not a fault shape.
        let serializer = JsonSerializer::new();
        let mut body = vec![FLAG_FAULT];
        put_block(&mut body, &serializer.serialize(&json!(42)).unwrap()).unwrap();

        let result = decode_response(&serializer, &Invocation::new("boom"), &body);
        assert!(matches!(result, Err(CodecError::FaultNotDecodable { .. })));
    }

    #[test]
    fn test_return_kind_narrowing() {
        let original = Invocation::new("count").with_return_type("number");
        assert!(roundtrip(&RpcResult::value(json!(3)), &original).is_ok());

        let result = roundtrip(&RpcResult::value(json!("three")), &original);
        assert!(matches!(
            result,
            Err(CodecError::ReturnTypeMismatch { expected, actual })
                if expected == "number" && actual == "string"
        ));
    }

    #[test]
    fn test_empty_body_is_truncated() {
        let serializer = JsonSerializer::new();
        let result = decode_response(&serializer, &Invocation::new("echo"), &[]);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }
}
