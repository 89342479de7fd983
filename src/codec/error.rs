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

//! Codec layer error types.
//!
//! Every decode error is terminal for the frame that produced it: the frame
//! is dropped and logged, but the channel stays up unless the transport layer
//! decides the stream itself is corrupt.

use thiserror::Error;

/// Errors raised while encoding or decoding frame bodies.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A value could not be serialized into the wire format.
    #[error("serialize failed: {source}")]
    Serialize {
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload block could not be deserialized.
    #[error("deserialize failed: {source}")]
    Deserialize {
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// A block declared a length beyond the configured maximum.
    #[error("block of {size} bytes exceeds maximum {max}")]
    BlockTooLarge {
        /// Declared block size.
        size: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// The buffer ended before a declared block did.
    #[error("truncated frame: needed {needed} more bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the current read still required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A string block was not valid UTF-8.
    #[error("string block is not valid UTF-8")]
    InvalidUtf8,

    /// A response carried a discriminator byte outside `{0, 1, 2}`.
    #[error("unknown response flag {flag}")]
    UnknownResponseFlag {
        /// The offending byte.
        flag: u8,
    },

    /// The attachment block did not decode to a string-to-string map.
    #[error("malformed attachment map: {reason}")]
    MalformedAttachments {
        /// Why the block was rejected.
        reason: String,
    },

    /// The payload at the exception position did not decode to a fault value.
    #[error("fault payload is not an error value: {reason}")]
    FaultNotDecodable {
        /// Why the payload was rejected.
        reason: String,
    },

    /// A decoded value did not match the declared return kind.
    #[error("return value kind mismatch: declared '{expected}', decoded '{actual}'")]
    ReturnTypeMismatch {
        /// Kind the invocation declared.
        expected: String,
        /// Kind actually decoded.
        actual: &'static str,
    },

    /// The frame named a serialization id nothing is registered under.
    #[error("unknown serialization id {id}")]
    UnknownSerialization {
        /// The unregistered id.
        id: u8,
    },

    /// The frame used a serialization id the target service never advertised.
    #[error("serialization id {id} is not permitted for service '{path}'")]
    ForbiddenSerialization {
        /// Target service path.
        path: String,
        /// The rejected id.
        id: u8,
    },
}

impl CodecError {
    pub(crate) fn serialize(source: serde_json::Error) -> Self {
        Self::Serialize { source }
    }

    pub(crate) fn deserialize(source: serde_json::Error) -> Self {
        Self::Deserialize { source }
    }
}
