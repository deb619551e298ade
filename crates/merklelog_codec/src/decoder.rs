//! CBOR decoder with strict (canonical) and lenient modes.

use crate::encoder::to_canonical_cbor;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Maximum element count for arrays and maps.
const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Maximum byte/text string length.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// Maximum nesting depth.
const MAX_DEPTH: usize = 128;

/// How strictly the decoder enforces canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Reject non-shortest heads and unsorted or duplicate map keys.
    Strict,
    /// Accept any definite-length encoding; used to re-canonicalize payloads.
    Lenient,
}

/// Decode a value from canonical CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid canonical CBOR, contain
/// forbidden constructs (floats, indefinite lengths) or have trailing bytes.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    decode_complete(bytes, DecodeMode::Strict)
}

/// Decode a value from any definite-length CBOR encoding.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR, contain floats or
/// indefinite-length items, or have trailing bytes.
pub fn from_cbor_lenient(bytes: &[u8]) -> CodecResult<Value> {
    decode_complete(bytes, DecodeMode::Lenient)
}

/// Re-serialize arbitrary CBOR bytes into canonical form.
///
/// Two encodings of the same logical value canonicalize to identical bytes.
///
/// # Errors
///
/// Returns an error if the input cannot be decoded leniently.
pub fn canonicalize(bytes: &[u8]) -> CodecResult<Vec<u8>> {
    to_canonical_cbor(&from_cbor_lenient(bytes)?)
}

fn decode_complete(bytes: &[u8], mode: DecodeMode) -> CodecResult<Value> {
    let mut decoder = CborDecoder::new(bytes, mode);
    let value = decoder.decode()?;
    let count = decoder.remaining().len();
    if count != 0 {
        return Err(CodecError::TrailingBytes { count });
    }
    Ok(value)
}

/// A CBOR decoder over a byte slice.
pub struct CborDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    mode: DecodeMode,
    depth: usize,
}

impl<'a> CborDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8], mode: DecodeMode) -> Self {
        Self {
            data,
            pos: 0,
            mode,
            depth: 0,
        }
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Decode the next value.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(&mut self) -> CodecResult<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::malformed("nesting too deep"));
        }
        let initial = self.read_byte()?;
        let major_type = initial >> 5;
        let info = initial & 0x1f;

        if info == 31 && major_type != 7 {
            return Err(CodecError::IndefiniteLength);
        }

        match major_type {
            0 => {
                let n = self.decode_argument(info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::IntegerOutOfRange)
            }
            1 => {
                let n = self.decode_argument(info)?;
                i64::try_from(n)
                    .map(|n| Value::Integer(-1 - n))
                    .map_err(|_| CodecError::IntegerOutOfRange)
            }
            2 => {
                let len = self.decode_length(info, MAX_BYTES_LENGTH)?;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
            3 => {
                let len = self.decode_length(info, MAX_BYTES_LENGTH)?;
                let bytes = self.read_bytes(len)?;
                let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_string()))
            }
            4 => {
                let len = self.decode_length(info, MAX_CONTAINER_ELEMENTS)?;
                self.depth += 1;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.decode()?);
                }
                self.depth -= 1;
                Ok(Value::Array(items))
            }
            5 => self.decode_map(info),
            6 => {
                let tag = self.decode_argument(info)?;
                self.depth += 1;
                let inner = self.decode()?;
                self.depth -= 1;
                Ok(Value::tagged(tag, inner))
            }
            _ => self.decode_simple(info),
        }
    }

    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::Truncated)?;
        let bytes = self.data.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn decode_argument(&mut self, info: u8) -> CodecResult<u64> {
        let (value, minimum) = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => (u64::from(self.read_byte()?), 24),
            25 => {
                let b = self.read_bytes(2)?;
                (u64::from(u16::from_be_bytes([b[0], b[1]])), 0x100)
            }
            26 => {
                let b = self.read_bytes(4)?;
                (u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])), 0x1_0000)
            }
            27 => {
                let b = self.read_bytes(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(b);
                (u64::from_be_bytes(buf), 0x1_0000_0000)
            }
            _ => return Err(CodecError::malformed(format!("reserved additional info {info}"))),
        };
        if self.mode == DecodeMode::Strict && value < minimum {
            return Err(CodecError::NotCanonical {
                reason: "head longer than necessary",
            });
        }
        Ok(value)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode_length(&mut self, info: u8, max: u64) -> CodecResult<usize> {
        let claimed = self.decode_argument(info)?;
        if claimed > max {
            return Err(CodecError::LengthTooLarge {
                claimed,
                limit: max,
            });
        }
        Ok(claimed as usize)
    }

    fn decode_map(&mut self, info: u8) -> CodecResult<Value> {
        let len = self.decode_length(info, MAX_CONTAINER_ELEMENTS)?;
        let mut pairs = Vec::with_capacity(len.min(1024));
        let mut prev_key: Option<&'a [u8]> = None;

        self.depth += 1;
        for _ in 0..len {
            let key_start = self.pos;
            let key = self.decode()?;
            let data = self.data;
            let key_bytes = &data[key_start..self.pos];

            if self.mode == DecodeMode::Strict {
                if let Some(prev) = prev_key {
                    let ordered = prev.len() < key_bytes.len()
                        || (prev.len() == key_bytes.len() && prev < key_bytes);
                    if !ordered {
                        return Err(CodecError::NotCanonical {
                            reason: "map keys out of order",
                        });
                    }
                }
                prev_key = Some(key_bytes);
            }

            let value = self.decode()?;
            pairs.push((key, value));
        }
        self.depth -= 1;

        Ok(Value::Map(pairs))
    }

    fn decode_simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 | 23 => Ok(Value::Null),
            25..=27 => Err(CodecError::FloatNotAllowed),
            31 => Err(CodecError::malformed("break outside indefinite-length item")),
            _ => Err(CodecError::UnsupportedSimple(info)),
        }
    }
}
