//! Local replica storage.

use crate::error::{ReplicateError, ReplicateResult};
use merklelog_core::paths::{kind_prefix, massif_path, seal_path};
use merklelog_core::verify::MmrState;
use merklelog_core::{BlobMassifReader, CoreResult, LogKind, Massif, MassifReader, Seal};
use merklelog_storage::BlobStore;
use tracing::debug;

/// A local massif with the seal it was accepted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedReplica {
    /// Tenant identity.
    pub tenant: String,
    /// Massif index.
    pub massif_index: u32,
    /// Massif contents.
    pub massif: Massif,
    /// Accepted seal.
    pub seal: Seal,
}

impl VerifiedReplica {
    /// The sealed state of this replica.
    pub fn state(&self) -> MmrState {
        self.seal.state()
    }
}

/// Persistent store of verified massifs.
pub trait ReplicaStore: Send + Sync {
    /// Prepares storage for `tenant`.
    ///
    /// # Errors
    ///
    /// Returns the storage error.
    fn ensure_dirs(&self, tenant: &str) -> ReplicateResult<()>;

    /// Highest massif index with a stored seal, if any.
    ///
    /// # Errors
    ///
    /// Returns errors other than not-found.
    fn last_verified(&self, tenant: &str) -> ReplicateResult<Option<u32>>;

    /// The stored massif and seal for `massif_index`, if both exist.
    ///
    /// # Errors
    ///
    /// Returns errors other than not-found, including malformed local blobs.
    fn get_verified(&self, tenant: &str, massif_index: u32)
        -> ReplicateResult<Option<VerifiedReplica>>;

    /// Atomically replaces the massif and then its seal.
    ///
    /// # Errors
    ///
    /// Returns the storage error, or a configuration error if `massif` is
    /// not massif `massif_index`.
    fn replace_verified(
        &self,
        tenant: &str,
        massif_index: u32,
        massif: &Massif,
        seal: &Seal,
    ) -> ReplicateResult<()>;
}

/// [`ReplicaStore`] over any blob store, using the remote path layout.
#[derive(Debug, Clone)]
pub struct LocalReplicaStore<S> {
    reader: BlobMassifReader<S>,
}

impl<S: BlobStore> LocalReplicaStore<S> {
    /// Creates a replica store for massifs of `height`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid height.
    pub fn new(store: S, height: u8) -> CoreResult<Self> {
        Ok(Self {
            reader: BlobMassifReader::new(store, height)?,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        self.reader.store()
    }
}

fn found<T>(result: CoreResult<T>) -> ReplicateResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl<S: BlobStore> ReplicaStore for LocalReplicaStore<S> {
    fn ensure_dirs(&self, tenant: &str) -> ReplicateResult<()> {
        for kind in [LogKind::Massif, LogKind::Seal] {
            self.store().ensure_prefix(&kind_prefix(tenant, kind))?;
        }
        Ok(())
    }

    fn last_verified(&self, tenant: &str) -> ReplicateResult<Option<u32>> {
        found(self.reader.head_index(tenant, LogKind::Seal))
    }

    fn get_verified(
        &self,
        tenant: &str,
        massif_index: u32,
    ) -> ReplicateResult<Option<VerifiedReplica>> {
        let Some(seal) = found(self.reader.get_checkpoint(tenant, massif_index))? else {
            return Ok(None);
        };
        let Some(massif) = found(self.reader.get_massif(tenant, massif_index))? else {
            return Ok(None);
        };
        Ok(Some(VerifiedReplica {
            tenant: tenant.to_string(),
            massif_index,
            massif,
            seal,
        }))
    }

    fn replace_verified(
        &self,
        tenant: &str,
        massif_index: u32,
        massif: &Massif,
        seal: &Seal,
    ) -> ReplicateResult<()> {
        if massif.massif_index() != massif_index {
            return Err(ReplicateError::Config(format!(
                "refusing to store massif {} as massif {massif_index}",
                massif.massif_index()
            )));
        }
        let seal_bytes = seal.encode()?;
        self.store()
            .put(&massif_path(tenant, massif_index), massif.as_bytes())?;
        self.store().put(&seal_path(tenant, massif_index), &seal_bytes)?;
        debug!(tenant, massif_index, mmr_size = massif.mmr_size(), "replica replaced");
        Ok(())
    }
}
