//! Binary decoder for document values.

use crate::encoder::{
    unzigzag, ARG_IMMEDIATE_MAX, ARG_U16, ARG_U32, ARG_U64, ARG_U8, TAG_ARRAY, TAG_BYTES,
    TAG_FALSE, TAG_FLOAT, TAG_INT, TAG_MAP, TAG_NULL, TAG_TEXT, TAG_TIMESTAMP, TAG_TRUE, TAG_UINT,
};
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;

/// Decode a value from its binary form.
///
/// # Errors
///
/// Returns an error if the bytes are truncated, carry an unknown tag,
/// violate a canonical-form rule, or leave trailing input behind the
/// top-level value.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(value)
}

/// Maximum allowed element count for arrays and maps, against
/// allocation attacks from untrusted input.
const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Maximum allowed byte/text length.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// Maximum nesting depth.
const MAX_DEPTH: usize = 128;

/// A binary value decoder.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        self.decode_at(0)
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn decode_at(&mut self, depth: usize) -> CodecResult<Value> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthLimitExceeded);
        }
        let tag = self.read_byte()?;
        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_FALSE => Ok(Value::Bool(false)),
            TAG_TRUE => Ok(Value::Bool(true)),
            TAG_INT => self.read_unsigned().map(|n| Value::Int(unzigzag(n))),
            TAG_UINT => self.read_unsigned().map(Value::UInt),
            TAG_FLOAT => {
                let bytes = self.read_bytes(8)?;
                let mut bits = [0u8; 8];
                bits.copy_from_slice(bytes);
                Ok(Value::Float(f64::from_bits(u64::from_be_bytes(bits))))
            }
            TAG_TEXT => self.read_text().map(Value::Text),
            TAG_BYTES => {
                let len = self.read_length(MAX_BYTES_LENGTH)?;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
            TAG_TIMESTAMP => self.decode_timestamp(),
            TAG_ARRAY => self.decode_array(depth),
            TAG_MAP => self.decode_map(depth),
            tag => Err(CodecError::InvalidTag { tag }),
        }
    }

    fn decode_timestamp(&mut self) -> CodecResult<Value> {
        let secs = unzigzag(self.read_unsigned()?);
        let nanos = u32::try_from(self.read_unsigned()?)
            .map_err(|_| CodecError::invalid_timestamp("nanoseconds out of range"))?;
        // chrono represents leap seconds as nanos in [1e9, 2e9)
        if nanos >= 2_000_000_000 {
            return Err(CodecError::invalid_timestamp("nanoseconds out of range"));
        }
        match Utc.timestamp_opt(secs, nanos) {
            chrono::LocalResult::Single(when) => Ok(Value::Timestamp(when)),
            _ => Err(CodecError::invalid_timestamp(format!(
                "seconds {secs} out of range"
            ))),
        }
    }

    fn decode_array(&mut self, depth: usize) -> CodecResult<Value> {
        let count = self.read_length(MAX_CONTAINER_ELEMENTS)?;
        let mut items = Vec::with_capacity(count.min(self.remaining().len()));
        for _ in 0..count {
            items.push(self.decode_at(depth + 1)?);
        }
        Ok(Value::Array(items))
    }

    fn decode_map(&mut self, depth: usize) -> CodecResult<Value> {
        let count = self.read_length(MAX_CONTAINER_ELEMENTS)?;
        let mut entries = BTreeMap::new();
        let mut prev_key: Option<String> = None;

        for _ in 0..count {
            let key = self.read_text()?;
            if let Some(ref prev) = prev_key {
                if *prev >= key {
                    return Err(CodecError::non_canonical("map keys not strictly increasing"));
                }
            }
            let value = self.decode_at(depth + 1)?;
            prev_key = Some(key.clone());
            entries.insert(key, value);
        }

        Ok(Value::Map(entries))
    }

    fn read_text(&mut self) -> CodecResult<String> {
        let len = self.read_length(MAX_BYTES_LENGTH)?;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_length(&mut self, max_allowed: u64) -> CodecResult<usize> {
        let claimed = self.read_unsigned()?;
        if claimed > max_allowed {
            return Err(CodecError::SizeLimitExceeded {
                claimed,
                max_allowed,
            });
        }
        usize::try_from(claimed).map_err(|_| CodecError::SizeLimitExceeded {
            claimed,
            max_allowed,
        })
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        if self.pos >= self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_unsigned(&mut self) -> CodecResult<u64> {
        let marker = self.read_byte()?;
        match marker {
            0..=ARG_IMMEDIATE_MAX => Ok(u64::from(marker)),
            ARG_U8 => {
                let byte = self.read_byte()?;
                if byte <= ARG_IMMEDIATE_MAX {
                    return Err(CodecError::non_canonical(
                        "argument could be encoded in fewer bytes",
                    ));
                }
                Ok(u64::from(byte))
            }
            ARG_U16 => {
                let bytes = self.read_bytes(2)?;
                let value = u16::from_be_bytes([bytes[0], bytes[1]]);
                if u8::try_from(value).is_ok() {
                    return Err(CodecError::non_canonical(
                        "argument could be encoded in fewer bytes",
                    ));
                }
                Ok(u64::from(value))
            }
            ARG_U32 => {
                let bytes = self.read_bytes(4)?;
                let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                if u16::try_from(value).is_ok() {
                    return Err(CodecError::non_canonical(
                        "argument could be encoded in fewer bytes",
                    ));
                }
                Ok(u64::from(value))
            }
            ARG_U64 => {
                let bytes = self.read_bytes(8)?;
                let value = u64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]);
                if u32::try_from(value).is_ok() {
                    return Err(CodecError::non_canonical(
                        "argument could be encoded in fewer bytes",
                    ));
                }
                Ok(value)
            }
            _ => Err(CodecError::non_canonical("reserved argument marker")),
        }
    }
}
