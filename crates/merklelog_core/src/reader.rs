//! Reading massifs and seals from a blob store.

use crate::error::{CoreError, CoreResult};
use crate::massif::{validate_height, Massif};
use crate::paths::{kind_prefix, massif_path, parse_path, seal_path, LogKind};
use crate::seal::Seal;
use merklelog_storage::{BlobStore, StorageError};
use tracing::{debug, warn};

/// Entries requested per listing page.
pub const LIST_PAGE_SIZE: usize = 1000;

/// Source of massifs and seals for a tenant.
pub trait MassifReader: Send + Sync {
    /// Massif height this reader validates against.
    fn massif_height(&self) -> u8;

    /// Fetches and validates massif `massif_index`.
    ///
    /// # Errors
    ///
    /// A missing massif is reported so that [`CoreError::is_not_found`]
    /// holds; malformed blobs as [`CoreError::InvalidFormat`].
    fn get_massif(&self, tenant: &str, massif_index: u32) -> CoreResult<Massif>;

    /// Fetches the seal of massif `massif_index`.
    ///
    /// # Errors
    ///
    /// As for [`MassifReader::get_massif`].
    fn get_checkpoint(&self, tenant: &str, massif_index: u32) -> CoreResult<Seal>;

    /// Highest index present for `kind`.
    ///
    /// # Errors
    ///
    /// Not-found when the tenant has no blobs of that kind.
    fn head_index(&self, tenant: &str, kind: LogKind) -> CoreResult<u32>;
}

/// [`MassifReader`] over any [`BlobStore`].
#[derive(Debug, Clone)]
pub struct BlobMassifReader<S> {
    store: S,
    height: u8,
}

impl<S: BlobStore> BlobMassifReader<S> {
    /// Creates a reader for massifs of `height`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHeight`] for heights outside `1..=32`.
    pub fn new(store: S, height: u8) -> CoreResult<Self> {
        validate_height(height)?;
        Ok(Self { store, height })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: BlobStore> MassifReader for BlobMassifReader<S> {
    fn massif_height(&self) -> u8 {
        self.height
    }

    fn get_massif(&self, tenant: &str, massif_index: u32) -> CoreResult<Massif> {
        let path = massif_path(tenant, massif_index);
        let massif = Massif::from_bytes(self.store.get(&path)?)?;
        massif.expect(self.height, massif_index)?;
        debug!(tenant, massif_index, mmr_size = massif.mmr_size(), "read massif");
        Ok(massif)
    }

    fn get_checkpoint(&self, tenant: &str, massif_index: u32) -> CoreResult<Seal> {
        Seal::decode(&self.store.get(&seal_path(tenant, massif_index))?)
    }

    fn head_index(&self, tenant: &str, kind: LogKind) -> CoreResult<u32> {
        let prefix = kind_prefix(tenant, kind);
        let mut head = None;
        let mut marker: Option<String> = None;
        loop {
            let page = self
                .store
                .list(&prefix, marker.as_deref(), LIST_PAGE_SIZE)?;
            for entry in &page.entries {
                match parse_path(&entry.path) {
                    Ok(parsed) if parsed.kind == kind && parsed.tenant == tenant => {
                        head = head.max(Some(parsed.number));
                    }
                    Ok(_) => {}
                    Err(e) => warn!(path = %entry.path, error = %e, "ignoring unexpected blob"),
                }
            }
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        head.ok_or_else(|| CoreError::Storage(StorageError::not_found(prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmr::add_hashed_leaf;
    use merklelog_storage::InMemoryStore;

    const TENANT: &str = "tenant/6ea5cd00-c711-3649-6914-7b125928bbb4";

    #[test]
    fn reads_what_was_stored() {
        let store = InMemoryStore::new();
        let mut massif = Massif::new(2, 0, 0).unwrap();
        add_hashed_leaf(&mut massif, [1u8; 32]).unwrap();
        store.put(&massif_path(TENANT, 0), massif.as_bytes()).unwrap();

        let reader = BlobMassifReader::new(store, 2).unwrap();
        assert_eq!(reader.get_massif(TENANT, 0).unwrap(), massif);
        assert!(reader.get_massif(TENANT, 1).unwrap_err().is_not_found());
        assert!(reader.get_checkpoint(TENANT, 0).unwrap_err().is_not_found());
    }

    #[test]
    fn height_mismatch_is_format_error() {
        let store = InMemoryStore::new();
        let massif = Massif::new(3, 0, 0).unwrap();
        store.put(&massif_path(TENANT, 0), massif.as_bytes()).unwrap();
        let reader = BlobMassifReader::new(store, 2).unwrap();
        assert!(matches!(
            reader.get_massif(TENANT, 0),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn head_index_across_pages() {
        let store = InMemoryStore::new();
        for i in 0..(LIST_PAGE_SIZE as u32 + 5) {
            store.put(&massif_path(TENANT, i), b"").unwrap();
        }
        store.put(&seal_path(TENANT, 3), b"").unwrap();
        let reader = BlobMassifReader::new(store, 2).unwrap();
        assert_eq!(
            reader.head_index(TENANT, LogKind::Massif).unwrap(),
            LIST_PAGE_SIZE as u32 + 4
        );
        assert_eq!(reader.head_index(TENANT, LogKind::Seal).unwrap(), 3);
        assert!(reader
            .head_index("tenant/other", LogKind::Massif)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn invalid_height_rejected() {
        assert!(BlobMassifReader::new(InMemoryStore::new(), 0).is_err());
    }
}
