//! Error types for replication.

use merklelog_core::CoreError;
use merklelog_storage::StorageError;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicateResult<T> = Result<T, ReplicateError>;

/// Errors that can occur while collating tails or replicating massifs.
#[derive(Error, Debug)]
pub enum ReplicateError {
    /// Error from the log format or reader layer.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Error from a blob store.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The remote massif is shorter than the verified local copy.
    #[error(
        "{tenant}: remote massif {massif_index} truncated (local size {local_size}, remote size {remote_size})"
    )]
    Truncated {
        /// Tenant identity.
        tenant: String,
        /// Massif index.
        massif_index: u32,
        /// MMR size of the local copy.
        local_size: u64,
        /// MMR size of the remote copy.
        remote_size: u64,
    },

    /// Local and remote massifs have the same size but different roots.
    #[error("{tenant}: massif {massif_index} root differs from local replica at size {mmr_size}")]
    RootMismatch {
        /// Tenant identity.
        tenant: String,
        /// Massif index.
        massif_index: u32,
        /// Shared MMR size.
        mmr_size: u64,
    },

    /// The remote massif failed seal or consistency verification.
    #[error("{tenant}: massif {massif_index} failed verification: {source}")]
    Verification {
        /// Tenant identity.
        tenant: String,
        /// Massif index.
        massif_index: u32,
        /// The failed check.
        source: CoreError,
    },

    /// Replication was cancelled.
    #[error("replication cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A tenant worker panicked.
    #[error("{tenant}: replication worker panicked")]
    WorkerPanicked {
        /// Tenant identity.
        tenant: String,
    },
}

impl ReplicateError {
    /// Wraps a core error for `tenant` and `massif_index`, keeping
    /// verification failures distinct from I/O and format errors.
    pub(crate) fn from_verify(tenant: &str, massif_index: u32, source: CoreError) -> Self {
        if source.is_verification_failure() {
            Self::Verification {
                tenant: tenant.to_string(),
                massif_index,
                source,
            }
        } else {
            Self::Core(source)
        }
    }

    /// Returns true for truncation, fork and verification failures.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. } | Self::RootMismatch { .. } | Self::Verification { .. }
        )
    }

    /// Returns true if a missing blob caused this error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Core(e) => e.is_not_found(),
            Self::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }
}
