//! Blob store trait definition.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One blob in a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Relative path of the blob.
    pub path: String,
    /// Last modification time in milliseconds since the Unix epoch.
    pub last_modified: u64,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    /// Entries in this page, ordered by path.
    pub entries: Vec<ListEntry>,
    /// Continuation marker; `None` when the listing is exhausted.
    pub next_marker: Option<String>,
}

/// A store of immutable-looking blobs addressed by relative paths.
///
/// Paths use `/` separators and never start with `/` or contain `..`.
/// Stores are opaque: they know nothing about massifs or seals.
///
/// # Invariants
///
/// - `get` of a missing path fails with [`StorageError::NotFound`]
/// - `put` replaces the whole blob atomically; readers see the old bytes or
///   the new bytes, never a mix
/// - `list` returns paths in ascending order, strictly after `marker`
pub trait BlobStore: Send + Sync {
    /// Reads a whole blob.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the blob does not exist.
    fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Atomically creates or replaces a blob.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] for stores that cannot be written.
    fn put(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Returns true if the blob exists.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Lists blobs whose path starts with `prefix`.
    ///
    /// At most `limit` entries are returned; `next_marker` is set when more
    /// remain.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be produced.
    fn list(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage>;

    /// Makes sure blobs can later be written under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix cannot be prepared.
    fn ensure_prefix(&self, prefix: &str) -> StorageResult<()>;
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        (**self).get(path)
    }

    fn put(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        (**self).put(path, data)
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        (**self).exists(path)
    }

    fn list(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage> {
        (**self).list(prefix, marker, limit)
    }

    fn ensure_prefix(&self, prefix: &str) -> StorageResult<()> {
        (**self).ensure_prefix(prefix)
    }
}

/// Rejects absolute paths, empty segments and `..` components.
pub(crate) fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Applies marker and limit to a sorted sequence of entries.
pub(crate) fn paginate(
    sorted: impl Iterator<Item = ListEntry>,
    marker: Option<&str>,
    limit: usize,
) -> ListPage {
    let limit = limit.max(1);
    let mut entries = Vec::new();
    let mut more = false;
    for entry in sorted.filter(|e| marker.map_or(true, |m| e.path.as_str() > m)) {
        if entries.len() == limit {
            more = true;
            break;
        }
        entries.push(entry);
    }
    let next_marker = if more {
        entries.last().map(|e| e.path.clone())
    } else {
        None
    };
    ListPage {
        entries,
        next_marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_validation() {
        assert!(validate_path("v1/mmrs/tenant/x/0/massifs/0.log").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/abs").is_err());
        assert!(validate_path("a/../b").is_err());
        assert!(validate_path("a//b").is_err());
        assert!(validate_path("a/./b").is_err());
    }

    #[test]
    fn paginate_respects_marker_and_limit() {
        let entries = ["a", "b", "c", "d"].iter().map(|p| ListEntry {
            path: (*p).to_string(),
            last_modified: 0,
        });
        let page = paginate(entries.clone(), None, 2);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.next_marker.as_deref(), Some("b"));

        let page = paginate(entries.clone(), Some("b"), 2);
        let paths: Vec<_> = page.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["c", "d"]);
        assert!(page.next_marker.is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn following_markers_visits_every_entry_once(
                paths in prop::collection::btree_set("[a-d]{1,4}", 0..30),
                limit in 1usize..7,
            ) {
                let entries: Vec<ListEntry> = paths
                    .iter()
                    .map(|p| ListEntry { path: p.clone(), last_modified: 0 })
                    .collect();
                let mut seen = Vec::new();
                let mut marker: Option<String> = None;
                loop {
                    let page = paginate(entries.clone().into_iter(), marker.as_deref(), limit);
                    prop_assert!(page.entries.len() <= limit);
                    seen.extend(page.entries.into_iter().map(|e| e.path));
                    match page.next_marker {
                        Some(next) => marker = Some(next),
                        None => break,
                    }
                }
                let expected: Vec<String> = paths.into_iter().collect();
                prop_assert_eq!(&seen, &expected);
                prop_assert_eq!(seen.iter().collect::<BTreeSet<_>>().len(), seen.len());
            }
        }
    }
}
