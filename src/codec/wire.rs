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

//! Length-prefixed block primitives for frame bodies.
//!
//! Every field in a request or response body is one block: a `u32`
//! big-endian length followed by that many payload bytes. Strings are blocks
//! of UTF-8. The maximum block size guards against a corrupt or hostile
//! length prefix committing the reader to an absurd allocation.

use crate::codec::CodecError;

/// Maximum size of a single block (16 MB).
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Appends one length-prefixed block.
pub fn put_block(buf: &mut Vec<u8>, payload: &[u8]) -> Result<(), CodecError> {
    if payload.len() > MAX_BLOCK_SIZE {
        return Err(CodecError::BlockTooLarge {
            size: payload.len(),
            max: MAX_BLOCK_SIZE,
        });
    }
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(())
}

/// Appends one UTF-8 string block.
pub fn put_str(buf: &mut Vec<u8>, value: &str) -> Result<(), CodecError> {
    put_block(buf, value.as_bytes())
}

/// Cursor over a frame body, reading blocks in order.
#[derive(Debug)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a reader over `data` positioned at the start.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads one raw byte.
    pub fn get_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Reads one length-prefixed block.
    pub fn get_block(&mut self) -> Result<&'a [u8], CodecError> {
        let len_bytes = self.take(4)?;
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
            as usize;
        if len > MAX_BLOCK_SIZE {
            return Err(CodecError::BlockTooLarge {
                size: len,
                max: MAX_BLOCK_SIZE,
            });
        }
        self.take(len)
    }

    /// Reads one UTF-8 string block.
    pub fn get_str(&mut self) -> Result<String, CodecError> {
        let block = self.get_block()?;
        String::from_utf8(block.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_roundtrip() {
        let mut buf = Vec::new();
        put_block(&mut buf, b"hello").unwrap();
        put_str(&mut buf, "world").unwrap();

        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.get_block().unwrap(), b"hello");
        assert_eq!(reader.get_str().unwrap(), "world");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_empty_block() {
        let mut buf = Vec::new();
        put_str(&mut buf, "").unwrap();

        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.get_str().unwrap(), "");
    }

    #[test]
    fn test_truncated_length_prefix() {
        let mut reader = WireReader::new(&[0, 0]);
        assert!(matches!(
            reader.get_block(),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        // Prefix declares 10 bytes, only 3 follow.
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"abc");

        let mut reader = WireReader::new(&buf);
        assert!(matches!(
            reader.get_block(),
            Err(CodecError::Truncated { needed: 10, remaining: 3 })
        ));
    }

    #[test]
    fn test_oversized_declared_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(u32::MAX).to_be_bytes());

        let mut reader = WireReader::new(&buf);
        assert!(matches!(
            reader.get_block(),
            Err(CodecError::BlockTooLarge { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = Vec::new();
        put_block(&mut buf, &[0xFF, 0xFE]).unwrap();

        let mut reader = WireReader::new(&buf);
        assert!(matches!(reader.get_str(), Err(CodecError::InvalidUtf8)));
    }
}
