//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob does not exist.
    #[error("blob not found: {path}")]
    NotFound {
        /// Relative path of the missing blob.
        path: String,
    },

    /// The store does not accept writes.
    #[error("store is read-only, cannot write {path}")]
    ReadOnly {
        /// Path the caller attempted to write.
        path: String,
    },

    /// The path is not a valid relative blob path.
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    /// The location string does not name a usable backend.
    #[error("unsupported location: {0}")]
    Unsupported(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A remote store answered with an unexpected status.
    #[error("HTTP {status} for {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The HTTP transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// A listing response could not be understood.
    #[error("malformed listing: {0}")]
    MalformedListing(String),
}

impl StorageError {
    /// Create a not-found error for a path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Returns true if this error means the blob does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
