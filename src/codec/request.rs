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

//! Request body encoding and decoding.
//!
//! A request body is a fixed sequence of blocks: protocol version, service
//! path, service version, method name, the comma-joined parameter descriptor,
//! one block per argument, and finally the attachment map. An empty
//! descriptor means zero arguments, so no argument blocks follow it. The
//! header path and version always win over same-named entries in the
//! attachment map.

use crate::codec::argument::ArgumentTransform;
use crate::codec::serializer::Serializer;
use crate::codec::wire::{put_str, WireReader};
use crate::codec::{CodecError, PROTOCOL_VERSION};
use crate::invocation::{keys, Invocation};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attachment key the decoder stamps the sender's protocol version under.
pub const PROTOCOL_VERSION_KEY: &str = "protocol.version";

/// Encodes one invocation into a request body.
///
/// Arguments pass through `transform` before serialization, in order.
///
/// # Errors
///
/// Returns a [`CodecError`] when an argument or the attachment map fails to
/// serialize, or a block exceeds the size limit.
pub fn encode_request(
    serializer: &dyn Serializer,
    transform: &dyn ArgumentTransform,
    invocation: &Invocation,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();

    put_str(&mut buf, PROTOCOL_VERSION)?;
    put_str(&mut buf, invocation.attachment(keys::PATH).unwrap_or(""))?;
    put_str(&mut buf, invocation.attachment(keys::VERSION).unwrap_or(""))?;
    put_str(&mut buf, invocation.method())?;
    put_str(&mut buf, &invocation.parameter_types().join(","))?;

    for (index, value) in invocation.arguments().iter().enumerate() {
        let transformed = transform.encode(invocation, index, value)?;
        let bytes = serializer.serialize(&transformed)?;
        crate::codec::wire::put_block(&mut buf, &bytes)?;
    }

    let attachments = serde_json::to_value(invocation.attachments())
        .map_err(CodecError::serialize)?;
    let bytes = serializer.serialize(&attachments)?;
    crate::codec::wire::put_block(&mut buf, &bytes)?;

    Ok(buf)
}

/// Decodes a request body back into an invocation.
///
/// Arguments pass through `transform` after deserialization. The sender's
/// protocol version lands in the attachments under
/// [`PROTOCOL_VERSION_KEY`].
///
/// # Errors
///
/// Returns a [`CodecError`] on truncation, malformed payload blocks, or an
/// attachment map that is not a string-to-string object.
pub fn decode_request(
    serializer: &dyn Serializer,
    transform: &dyn ArgumentTransform,
    body: &[u8],
) -> Result<Invocation, CodecError> {
    let mut reader = WireReader::new(body);

    let protocol_version = reader.get_str()?;
    let path = reader.get_str()?;
    let version = reader.get_str()?;
    let method = reader.get_str()?;
    let descriptor = reader.get_str()?;

    let parameter_types: Vec<String> = if descriptor.is_empty() {
        Vec::new()
    } else {
        descriptor.split(',').map(str::to_string).collect()
    };

    let mut raw_arguments = Vec::with_capacity(parameter_types.len());
    for _ in 0..parameter_types.len() {
        let block = reader.get_block()?;
        raw_arguments.push(serializer.deserialize(block)?);
    }

    let attachment_value = serializer.deserialize(reader.get_block()?)?;
    let mut attachments = decode_attachments(attachment_value)?;

    // Header fields are authoritative over the attachment map.
    attachments.insert(keys::PATH.to_string(), path);
    attachments.insert(keys::VERSION.to_string(), version);
    attachments.insert(PROTOCOL_VERSION_KEY.to_string(), protocol_version);

    let provisional = Invocation::rebuild(
        method.clone(),
        parameter_types.clone(),
        raw_arguments.clone(),
        attachments.clone(),
    );
    let mut arguments = Vec::with_capacity(raw_arguments.len());
    for (index, value) in raw_arguments.iter().enumerate() {
        arguments.push(transform.decode(&provisional, index, value)?);
    }

    Ok(Invocation::rebuild(method, parameter_types, arguments, attachments))
}

fn decode_attachments(value: Value) -> Result<BTreeMap<String, String>, CodecError> {
    let Value::Object(map) = value else {
        return Err(CodecError::MalformedAttachments {
            reason: "attachment block is not an object".to_string(),
        });
    };
    let mut attachments = BTreeMap::new();
    for (key, value) in map {
        let Value::String(value) = value else {
            return Err(CodecError::MalformedAttachments {
                reason: format!("attachment '{key}' is not a string"),
            });
        };
        attachments.insert(key, value);
    }
    Ok(attachments)
}
