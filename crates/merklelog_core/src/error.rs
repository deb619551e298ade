//! Error types for merklelog core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Blob store error.
    #[error("storage error: {0}")]
    Storage(#[from] merklelog_storage::StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] merklelog_codec::CodecError),

    /// A massif or seal blob is malformed.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A storage path does not follow the log layout.
    #[error("malformed path {path}: {reason}")]
    MalformedPath {
        /// The offending path.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Extra bytes exceed the fixed 24-byte field.
    #[error("extra bytes too long: {len} > 24")]
    ExtraBytesTooLong {
        /// Length supplied.
        len: usize,
    },

    /// A hex argument could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Unknown domain byte.
    #[error("unknown domain {0}")]
    UnknownDomain(u8),

    /// Massif height outside `1..=32`.
    #[error("invalid massif height {0}")]
    InvalidHeight(u8),

    /// A size that no MMR can have.
    #[error("invalid MMR size {size}")]
    InvalidMmrSize {
        /// The size.
        size: u64,
    },

    /// An index beyond the MMR or massif it was asked of.
    #[error("index {index} out of range for size {size}")]
    IndexOutOfRange {
        /// Requested index.
        index: u64,
        /// Size it was checked against.
        size: u64,
    },

    /// The node is neither in the massif log data nor in its peak stack.
    #[error("node {index} not available in this massif")]
    NodeUnavailable {
        /// Requested index.
        index: u64,
    },

    /// Seal signature did not verify.
    #[error("seal signature invalid for massif {massif_index}")]
    SealSignature {
        /// Massif the seal belongs to.
        massif_index: u32,
    },

    /// Peaks computed from massif data differ from the sealed peaks.
    #[error("sealed peaks do not match massif {massif_index} at size {mmr_size}")]
    SealRootMismatch {
        /// Massif checked.
        massif_index: u32,
        /// Sealed MMR size.
        mmr_size: u64,
    },

    /// The sealed size does not fall within the massif.
    #[error("seal size {mmr_size} outside massif {massif_index} range ({first_index}, {massif_size}]")]
    SealOutOfRange {
        /// Massif checked.
        massif_index: u32,
        /// Sealed MMR size.
        mmr_size: u64,
        /// First MMR index of the massif.
        first_index: u64,
        /// MMR size covered by the massif data.
        massif_size: u64,
    },

    /// The massif does not extend the trusted state.
    #[error("massif {massif_index} inconsistent with trusted size {from_size} (checked at {to_size})")]
    ConsistencyFailed {
        /// Massif checked.
        massif_index: u32,
        /// Size of the trusted state.
        from_size: u64,
        /// Size it was checked against.
        to_size: u64,
    },

    /// A tenant or log id could not be interpreted.
    #[error("invalid log id: {0}")]
    InvalidLogId(String),

    /// A public or private key is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a malformed path error.
    pub fn malformed_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error means a blob does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_not_found())
    }

    /// Returns true for failures of signature, seal or consistency checks.
    #[must_use]
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::SealSignature { .. }
                | Self::SealRootMismatch { .. }
                | Self::SealOutOfRange { .. }
                | Self::ConsistencyFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merklelog_storage::StorageError;

    #[test]
    fn not_found_is_structural() {
        let err: CoreError = StorageError::not_found("x").into();
        assert!(err.is_not_found());
        let err: CoreError = StorageError::Unsupported("blob not found".into()).into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn verification_failures() {
        assert!(CoreError::SealSignature { massif_index: 1 }.is_verification_failure());
        assert!(!CoreError::InvalidHeight(0).is_verification_failure());
    }
}
