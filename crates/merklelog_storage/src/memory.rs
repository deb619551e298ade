//! In-memory blob store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{paginate, validate_path, BlobStore, ListEntry, ListPage};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
struct Blob {
    data: Vec<u8>,
    last_modified: u64,
}

/// An in-memory blob store.
///
/// Suitable for unit tests and for standing in as a "remote" log in
/// integration tests. Clones share nothing; wrap in an `Arc` to share.
///
/// # Example
///
/// ```rust
/// use merklelog_storage::{BlobStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.put("a/b.log", b"hello").unwrap();
/// assert_eq!(store.get("a/b.log").unwrap(), b"hello");
/// assert!(store.get("a/c.log").unwrap_err().is_not_found());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    blobs: RwLock<BTreeMap<String, Blob>>,
    read_only: bool,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a store that rejects writes, pre-populated from `self`.
    #[must_use]
    pub fn into_read_only(self) -> Self {
        Self {
            blobs: self.blobs,
            read_only: true,
        }
    }

    /// Sets the modification time recorded for an existing blob.
    ///
    /// Returns false if the blob does not exist.
    pub fn set_last_modified(&self, path: &str, millis: u64) -> bool {
        match self.blobs.write().get_mut(path) {
            Some(blob) => {
                blob.last_modified = millis;
                true
            }
            None => false,
        }
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

impl BlobStore for InMemoryStore {
    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.blobs
            .read()
            .get(path)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn put(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        validate_path(path)?;
        if self.read_only {
            return Err(StorageError::ReadOnly {
                path: path.to_string(),
            });
        }
        self.blobs.write().insert(
            path.to_string(),
            Blob {
                data: data.to_vec(),
                last_modified: now_millis(),
            },
        );
        Ok(())
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.blobs.read().contains_key(path))
    }

    fn list(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage> {
        let blobs = self.blobs.read();
        let sorted = blobs
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, blob)| ListEntry {
                path: path.clone(),
                last_modified: blob.last_modified,
            });
        Ok(paginate(sorted, marker, limit))
    }

    fn ensure_prefix(&self, _prefix: &str) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(!store.exists("a").unwrap());
    }

    #[test]
    fn memory_put_replaces() {
        let store = InMemoryStore::new();
        store.put("x/y", b"one").unwrap();
        store.put("x/y", b"two").unwrap();
        assert_eq!(store.get("x/y").unwrap(), b"two");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_get_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get("nope").unwrap_err();
        assert!(matches!(err, StorageError::NotFound { ref path } if path == "nope"));
    }

    #[test]
    fn memory_rejects_bad_paths() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.put("../escape", b""),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn memory_read_only() {
        let store = InMemoryStore::new();
        store.put("a", b"1").unwrap();
        let store = store.into_read_only();
        assert_eq!(store.get("a").unwrap(), b"1");
        assert!(matches!(store.put("a", b"2"), Err(StorageError::ReadOnly { .. })));
    }

    #[test]
    fn memory_list_by_prefix_paginates() {
        let store = InMemoryStore::new();
        for p in ["p/1", "p/2", "p/3", "q/1"] {
            store.put(p, b"").unwrap();
        }

        let first = store.list("p/", None, 2).unwrap();
        assert_eq!(first.entries.len(), 2);
        let marker = first.next_marker.unwrap();
        let second = store.list("p/", Some(&marker), 2).unwrap();
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].path, "p/3");
        assert!(second.next_marker.is_none());
    }

    #[test]
    fn memory_last_modified_override() {
        let store = InMemoryStore::new();
        store.put("a", b"").unwrap();
        assert!(store.set_last_modified("a", 42));
        assert!(!store.set_last_modified("b", 42));
        assert_eq!(store.list("", None, 10).unwrap().entries[0].last_modified, 42);
    }
}
