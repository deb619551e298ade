//! Canonical CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Encode a value to canonical CBOR bytes.
///
/// Output follows RFC 8949 Section 4.2.1: shortest heads, definite lengths,
/// map keys sorted by their encoded form (length-first, then bytewise).
///
/// # Errors
///
/// Returns an error if a map contains two keys with the same encoding.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// A canonical CBOR encoder.
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.buffer.push(0xf6),
            Value::Bool(b) => self.buffer.push(if *b { 0xf5 } else { 0xf4 }),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Bytes(b) => {
                self.encode_head(2, b.len() as u64);
                self.buffer.extend_from_slice(b);
            }
            Value::Text(s) => {
                self.encode_head(3, s.len() as u64);
                self.buffer.extend_from_slice(s.as_bytes());
            }
            Value::Array(items) => {
                self.encode_head(4, items.len() as u64);
                for item in items {
                    self.encode(item)?;
                }
            }
            Value::Map(pairs) => self.encode_map(pairs)?,
            Value::Tag(tag, inner) => {
                self.encode_head(6, *tag);
                self.encode(inner)?;
            }
        }
        Ok(())
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_head(0, n as u64);
        } else {
            // -1 - n is in [0, 2^63 - 1] for every negative i64
            self.encode_head(1, (-1 - n) as u64);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_head(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;
        if value < 24 {
            self.buffer.push(mt | value as u8);
        } else if value <= u64::from(u8::MAX) {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value <= u64::from(u32::MAX) {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn encode_map(&mut self, pairs: &[(Value, Value)]) -> CodecResult<()> {
        let mut encoded: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            encoded.push((to_canonical_cbor(key)?, value));
        }
        encoded.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));

        if encoded.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(CodecError::DuplicateMapKey);
        }

        self.encode_head(5, encoded.len() as u64);
        for (key, value) in encoded {
            self.buffer.extend_from_slice(&key);
            self.encode(value)?;
        }
        Ok(())
    }
}
