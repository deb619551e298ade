//! Backend selection from a location string.

use crate::error::{StorageError, StorageResult};
use crate::file::FileStore;
use crate::http::{HttpClient, HttpStore};
use crate::memory::InMemoryStore;
use crate::store::{BlobStore, ListPage};
use std::sync::Arc;

/// Location prefix selecting an in-memory store.
pub const MEMORY_LOCATION: &str = "memory:";

/// The closed set of blob store backends.
///
/// Chosen once at startup from a location string; everything downstream
/// works against [`BlobStore`].
#[derive(Debug)]
pub enum StoreBackend {
    /// Ephemeral in-memory store.
    Memory(InMemoryStore),
    /// Directory on the local filesystem.
    File(FileStore),
    /// Read-only remote store.
    Http(HttpStore),
}

impl StoreBackend {
    /// Opens the backend named by `location`.
    ///
    /// `http://` and `https://` URLs select [`HttpStore`] and require a
    /// client, `memory:` selects [`InMemoryStore`], anything else is a
    /// directory path for [`FileStore`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unsupported`] for URLs without a client, or
    /// the error from opening the directory.
    pub fn open(location: &str, client: Option<Arc<dyn HttpClient>>) -> StorageResult<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let client = client.ok_or_else(|| {
                StorageError::Unsupported(format!("{location}: no HTTP client configured"))
            })?;
            return Ok(Self::Http(HttpStore::new(location, client)));
        }
        if location == MEMORY_LOCATION {
            return Ok(Self::Memory(InMemoryStore::new()));
        }
        if location.is_empty() {
            return Err(StorageError::Unsupported("empty location".to_string()));
        }
        Ok(Self::File(FileStore::open(location)?))
    }

    fn inner(&self) -> &dyn BlobStore {
        match self {
            Self::Memory(s) => s,
            Self::File(s) => s,
            Self::Http(s) => s,
        }
    }
}

impl BlobStore for StoreBackend {
    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.inner().get(path)
    }

    fn put(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        self.inner().put(path, data)
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        self.inner().exists(path)
    }

    fn list(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage> {
        self.inner().list(prefix, marker, limit)
    }

    fn ensure_prefix(&self, prefix: &str) -> StorageResult<()> {
        self.inner().ensure_prefix(prefix)
    }
}
