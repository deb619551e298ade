//! Filesystem blob store.

use crate::error::{StorageError, StorageResult};
use crate::memory::now_millis;
use crate::store::{paginate, validate_path, BlobStore, ListEntry, ListPage};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const TEMP_SUFFIX: &str = ".tmp";

/// A blob store rooted at a directory.
///
/// Blob paths map to files below the root. Writes go to a temporary sibling
/// which is synced and renamed over the target, so a crash leaves either the
/// old or the new file in place.
///
/// # Example
///
/// ```no_run
/// use merklelog_storage::{BlobStore, FileStore};
///
/// let store = FileStore::open("replica").unwrap();
/// store.put("v1/mmrs/tenant/x/0/massifs/0000000000000000.log", b"...").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a blob path to a filesystem path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for paths escaping the root.
    pub fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        validate_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg)))
    }

    fn collect(&self, dir: &Path, rel: &str, prefix: &str, out: &mut Vec<ListEntry>) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = if rel.is_empty() {
                name.clone()
            } else {
                format!("{rel}/{name}")
            };
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                let dir_prefix = format!("{child}/");
                // Only descend where the prefix can still match.
                if dir_prefix.starts_with(prefix) || prefix.starts_with(&dir_prefix) {
                    self.collect(&entry.path(), &child, prefix, out)?;
                }
            } else if file_type.is_file() && !name.ends_with(TEMP_SUFFIX) && child.starts_with(prefix) {
                let last_modified = entry
                    .metadata()?
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
                out.push(ListEntry {
                    path: child,
                    last_modified,
                });
            }
        }
        Ok(())
    }
}

fn not_found_or(err: io::Error, path: &str) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::not_found(path)
    } else {
        StorageError::Io(err)
    }
}

impl BlobStore for FileStore {
    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(path)?;
        fs::read(&target).map_err(|e| not_found_or(e, path))
    }

    fn put(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let target = self.resolve(path)?;
        let parent = target
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        fs::create_dir_all(parent)?;

        let mut temp_name = target.as_os_str().to_owned();
        temp_name.push(format!(".{}{TEMP_SUFFIX}", now_millis()));
        let temp = PathBuf::from(temp_name);
        {
            let mut file = File::create(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.resolve(path)?.is_file())
    }

    fn list(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage> {
        let mut found = Vec::new();
        self.collect(&self.root, "", prefix, &mut found)?;
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(paginate(found.into_iter(), marker, limit))
    }

    fn ensure_prefix(&self, prefix: &str) -> StorageResult<()> {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.resolve(trimmed)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_put_and_get() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.put("a/b/c.log", b"hello").unwrap();
        assert_eq!(store.get("a/b/c.log").unwrap(), b"hello");
        assert!(dir.path().join("a").join("b").join("c.log").is_file());
    }

    #[test]
    fn file_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.get("missing.log").unwrap_err().is_not_found());
        assert!(!store.exists("missing.log").unwrap());
    }

    #[test]
    fn file_put_replaces_without_leftovers() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.put("x.log", b"first").unwrap();
        store.put("x.log", b"second, longer").unwrap();
        assert_eq!(store.get("x.log").unwrap(), b"second, longer");

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.put("p/q", b"persistent").unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("p/q").unwrap(), b"persistent");
    }

    #[test]
    fn file_list_recurses_and_filters() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        for p in ["v1/a/1.log", "v1/a/2.log", "v1/b/1.log", "other/1.log"] {
            store.put(p, b"").unwrap();
        }

        let page = store.list("v1/a/", None, 10).unwrap();
        let paths: Vec<_> = page.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["v1/a/1.log", "v1/a/2.log"]);
        assert!(page.entries.iter().all(|e| e.last_modified > 0));

        let all = store.list("v1/", None, 2).unwrap();
        assert_eq!(all.entries.len(), 2);
        assert_eq!(all.next_marker.as_deref(), Some("v1/a/2.log"));
    }

    #[test]
    fn file_list_partial_segment_prefix() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put("tenant/abc/x", b"").unwrap();
        store.put("tenant/abd/x", b"").unwrap();

        let page = store.list("tenant/ab", None, 10).unwrap();
        assert_eq!(page.entries.len(), 2);
    }

    #[test]
    fn file_ensure_prefix_creates_dirs() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.ensure_prefix("v1/mmrs/tenant/x/0/massifs/").unwrap();
        assert!(dir.path().join("v1/mmrs/tenant/x/0/massifs").is_dir());
    }

    #[test]
    fn file_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(store.get("../x"), Err(StorageError::InvalidPath(_))));
    }
}
