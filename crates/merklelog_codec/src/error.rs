//! Codec errors.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Reasons CBOR bytes are rejected or a value cannot be encoded.
///
/// Canonical-form violations are kept apart from malformed input so callers
/// can tell a loosely encoded payload from garbage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ends in the middle of an item.
    #[error("input ends mid-item")]
    Truncated,

    /// Bytes follow a complete top-level item.
    #[error("{count} trailing bytes after value")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// Floating-point values have no place in seals or hashed entries.
    #[error("floating-point values are not accepted")]
    FloatNotAllowed,

    /// Indefinite-length strings, arrays and maps.
    #[error("indefinite-length item")]
    IndefiniteLength,

    /// Text string is not UTF-8.
    #[error("text string is not valid UTF-8")]
    InvalidUtf8,

    /// A major type 0/1 argument outside the i64 range.
    #[error("integer does not fit in 64 signed bits")]
    IntegerOutOfRange,

    /// A simple value other than false, true, null or undefined.
    #[error("unsupported simple value {0}")]
    UnsupportedSimple(u8),

    /// A length head larger than the decoder accepts.
    #[error("declared length {claimed} exceeds limit {limit}")]
    LengthTooLarge {
        /// Length in the head.
        claimed: u64,
        /// Largest accepted length.
        limit: u64,
    },

    /// Two map keys encode identically.
    #[error("duplicate map key")]
    DuplicateMapKey,

    /// Valid CBOR that breaks the canonical encoding rules.
    #[error("non-canonical encoding: {reason}")]
    NotCanonical {
        /// Which rule was broken.
        reason: &'static str,
    },

    /// Bytes that are not CBOR at all.
    #[error("malformed CBOR: {reason}")]
    Malformed {
        /// What was wrong.
        reason: String,
    },
}

impl CodecError {
    /// Malformed-input error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Returns true if the input is valid CBOR that is merely not canonical.
    pub fn is_non_canonical(&self) -> bool {
        matches!(self, Self::NotCanonical { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            CodecError::TrailingBytes { count: 2 }.to_string(),
            "2 trailing bytes after value"
        );
        assert!(CodecError::malformed("bad").to_string().contains("bad"));
        assert!(CodecError::NotCanonical { reason: "x" }.is_non_canonical());
        assert!(!CodecError::Truncated.is_non_canonical());
    }
}
