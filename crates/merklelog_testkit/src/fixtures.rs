//! Log builders and storage fixtures.

use merklelog_core::keys::{pad_extra_bytes, trie_key};
use merklelog_core::mmr::{add_hashed_leaf, mmr_index, NodeSource};
use merklelog_core::paths::{massif_path, seal_path};
use merklelog_core::{
    leaf_hash_v1, Checkpoint, CoreResult, Domain, Hash, IdGenerator, LogId, Massif, Seal,
    SealSigner, TrieEntry,
};
use merklelog_storage::{BlobStore, FileStore};
use tempfile::TempDir;

/// Domain byte used for trie keys written by [`TestLog`].
pub const TEST_TRIE_DOMAIN: u8 = 0;

/// Seed of the default test signer.
pub const TEST_SIGNER_SEED: [u8; 32] = [42u8; 32];

/// Unix milliseconds the deterministic test clock starts at.
const CLOCK_START_MS: u64 = 1_700_000_000_000;

/// Everything recorded about one appended entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEntry {
    /// Leaf ordinal.
    pub leaf_index: u64,
    /// MMR index of the leaf.
    pub mmr_index: u64,
    /// Application id the trie key was derived from.
    pub app_id: Vec<u8>,
    /// Trie key stored in the massif.
    pub trie_key: Hash,
    /// Payload that was hashed.
    pub payload: Vec<u8>,
    /// Hashing domain.
    pub domain: Domain,
    /// Extra bytes, zero padded.
    pub extra_bytes: [u8; 24],
    /// Assigned idtimestamp.
    pub idtimestamp: u64,
    /// Leaf value.
    pub leaf_hash: Hash,
}

/// A deterministic, in-memory log writer for tests.
///
/// Two logs built with the same tenant, height and appends produce
/// byte-identical massifs and seals.
pub struct TestLog {
    tenant: String,
    log_id: LogId,
    height: u8,
    signer: SealSigner,
    ids: IdGenerator,
    clock_ms: u64,
    massifs: Vec<Massif>,
    entries: Vec<LoggedEntry>,
}

impl TestLog {
    /// Creates an empty log signed with the default test key.
    ///
    /// # Panics
    ///
    /// Panics if `height` is not a valid massif height.
    pub fn new(tenant: &str, height: u8) -> Self {
        Self::with_signer(tenant, height, SealSigner::from_seed(TEST_SIGNER_SEED))
    }

    /// Creates an empty log signed by `signer`.
    ///
    /// # Panics
    ///
    /// Panics if `height` is not a valid massif height.
    pub fn with_signer(tenant: &str, height: u8, signer: SealSigner) -> Self {
        merklelog_core::massif::validate_height(height).expect("valid massif height");
        let log_id = LogId::candidates(tenant)
            .into_iter()
            .next()
            .expect("candidates always include the raw tenant");
        Self {
            tenant: tenant.to_string(),
            log_id,
            height,
            signer,
            ids: IdGenerator::new(1),
            clock_ms: CLOCK_START_MS,
            massifs: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Tenant identity.
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Massif height.
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Public key the seals verify against.
    pub fn public_key(&self) -> [u8; 32] {
        self.signer.public_key()
    }

    /// Trie key this log writes for `app_id`.
    pub fn trie_key_for(&self, app_id: &[u8]) -> Hash {
        trie_key(TEST_TRIE_DOMAIN, self.log_id.as_bytes(), app_id)
    }

    /// Appends an entry in the serialized domain with no extra bytes.
    pub fn append(&mut self, app_id: &[u8], payload: &[u8]) -> &LoggedEntry {
        self.append_entry(Domain::Serialized, app_id, &[], payload)
            .expect("serialized entries always hash")
    }

    /// Appends `count` entries with generated app ids and payloads.
    pub fn append_many(&mut self, count: u64) {
        for _ in 0..count {
            let n = self.entries.len();
            self.append(format!("app-{n}").as_bytes(), format!("payload-{n}").as_bytes());
        }
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns the leaf hash derivation error for oversized extra bytes or
    /// undecodable canonical-CBOR payloads.
    pub fn append_entry(
        &mut self,
        domain: Domain,
        app_id: &[u8],
        extra_bytes: &[u8],
        payload: &[u8],
    ) -> CoreResult<&LoggedEntry> {
        let extra = pad_extra_bytes(extra_bytes)?;
        self.clock_ms += 1;
        let (epoch, idtimestamp) = self.ids.next_id_at(self.clock_ms);
        let leaf_hash = leaf_hash_v1(domain, &extra, idtimestamp, payload)?;
        let trie_key = self.trie_key_for(app_id);

        self.open_massif(epoch)?;
        let leaf_index = self.entries.len() as u64;
        let massif = self
            .massifs
            .last_mut()
            .expect("open_massif leaves a writable massif");
        massif.set_trie_entry(
            leaf_index - massif.first_leaf(),
            &TrieEntry {
                trie_key,
                extra_bytes: extra,
                idtimestamp,
                domain: domain.as_byte(),
            },
        )?;
        add_hashed_leaf(massif, leaf_hash)?;
        massif.set_last_idtimestamp(idtimestamp);

        self.entries.push(LoggedEntry {
            leaf_index,
            mmr_index: mmr_index(leaf_index),
            app_id: app_id.to_vec(),
            trie_key,
            payload: payload.to_vec(),
            domain,
            extra_bytes: extra,
            idtimestamp,
            leaf_hash,
        });
        Ok(self.entries.last().expect("just pushed"))
    }

    /// Starts a new massif when there is none or the last one is full.
    fn open_massif(&mut self, epoch: u32) -> CoreResult<()> {
        let next_index = match self.massifs.last() {
            None => 0,
            Some(last) if last.is_complete() => last.massif_index() + 1,
            Some(_) => return Ok(()),
        };
        let mut massif = Massif::new(self.height, next_index, epoch)?;
        if let Some(previous) = self.massifs.last() {
            let stack = massif
                .peak_stack_indices()
                .iter()
                .map(|&i| previous.node(i))
                .collect::<CoreResult<Vec<Hash>>>()?;
            massif.set_peak_stack(&stack)?;
        }
        self.massifs.push(massif);
        Ok(())
    }

    /// Entries appended so far.
    pub fn entries(&self) -> &[LoggedEntry] {
        &self.entries
    }

    /// Number of massifs started.
    pub fn massif_count(&self) -> u32 {
        self.massifs.len() as u32
    }

    /// Massif `index`.
    ///
    /// # Panics
    ///
    /// Panics if the massif has not been started.
    pub fn massif(&self, index: u32) -> &Massif {
        &self.massifs[index as usize]
    }

    /// Current MMR size.
    pub fn mmr_size(&self) -> u64 {
        self.massifs.last().map_or(0, Massif::mmr_size)
    }

    /// Seal of massif `index` at its current size.
    ///
    /// # Panics
    ///
    /// Panics if the massif has not been started or is empty.
    pub fn seal(&self, index: u32) -> Seal {
        let size = self.massif(index).mmr_size();
        self.seal_at(index, size)
    }

    /// Seal of massif `index` attesting `mmr_size`.
    ///
    /// # Panics
    ///
    /// Panics if the size is not reachable from that massif.
    pub fn seal_at(&self, index: u32, mmr_size: u64) -> Seal {
        let massif = self.massif(index);
        let checkpoint = Checkpoint {
            mmr_size,
            peaks: massif.peaks_at(mmr_size).expect("peaks available in massif"),
            commitment_epoch: massif.header().commitment_epoch,
            timestamp_ms: self.clock_ms,
            last_idtimestamp: massif.header().last_idtimestamp,
        };
        self.signer.sign(&checkpoint).expect("checkpoint encodes")
    }

    /// Writes massif `index` and its seal into `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn publish_massif<S: BlobStore + ?Sized>(&self, store: &S, index: u32) -> CoreResult<()> {
        store.put(&massif_path(&self.tenant, index), self.massif(index).as_bytes())?;
        store.put(&seal_path(&self.tenant, index), &self.seal(index).encode()?)?;
        Ok(())
    }

    /// Writes every massif and seal into `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn publish<S: BlobStore + ?Sized>(&self, store: &S) -> CoreResult<()> {
        for index in 0..self.massif_count() {
            self.publish_massif(store, index)?;
        }
        Ok(())
    }
}

/// A file store in a temporary directory, removed on drop.
pub struct TempReplica {
    /// The store.
    pub store: FileStore,
    dir: TempDir,
}

impl TempReplica {
    /// Creates an empty replica directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(dir.path()).expect("Failed to open file store");
        Self { store, dir }
    }

    /// Root directory of the replica.
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl Default for TempReplica {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merklelog_core::verify::{verify_massif, TrustedSealer};
    use merklelog_core::{BlobMassifReader, Ed25519SealVerifier, MassifReader};
    use merklelog_storage::InMemoryStore;

    const TENANT: &str = "tenant/6ea5cd00-c711-3649-6914-7b125928bbb4";

    #[test]
    fn builds_massifs_that_verify() {
        let mut log = TestLog::new(TENANT, 3);
        log.append_many(10);
        assert_eq!(log.massif_count(), 3);
        assert!(log.massif(0).is_complete());
        assert!(log.massif(1).is_complete());
        assert!(!log.massif(2).is_complete());
        assert_eq!(log.mmr_size(), mmr_index(10));

        let key = log.public_key();
        let sealer = TrustedSealer {
            verifier: &Ed25519SealVerifier,
            key: &key,
        };
        let mut base = None;
        for k in 0..log.massif_count() {
            let state = verify_massif(log.massif(k), &log.seal(k), base.as_ref(), Some(sealer)).unwrap();
            base = Some(state);
        }
    }

    #[test]
    fn identical_appends_give_identical_bytes() {
        let mut a = TestLog::new(TENANT, 2);
        let mut b = TestLog::new(TENANT, 2);
        a.append_many(5);
        b.append_many(5);
        for k in 0..a.massif_count() {
            assert_eq!(a.massif(k).as_bytes(), b.massif(k).as_bytes());
            assert_eq!(a.seal(k).encode().unwrap(), b.seal(k).encode().unwrap());
        }
    }

    #[test]
    fn publishes_into_store() {
        let mut log = TestLog::new(TENANT, 2);
        log.append_many(3);
        let store = InMemoryStore::new();
        log.publish(&store).unwrap();
        assert_eq!(store.len(), 4);

        let reader = BlobMassifReader::new(store, 2).unwrap();
        assert_eq!(reader.get_massif(TENANT, 1).unwrap().leaf_count(), 1);
        assert_eq!(reader.get_checkpoint(TENANT, 1).unwrap().checkpoint().mmr_size, 4);
    }

    #[test]
    fn entries_record_keys() {
        let mut log = TestLog::new(TENANT, 2);
        let entry = log.append(b"app", b"data").clone();
        assert_eq!(entry.trie_key, log.trie_key_for(b"app"));
        assert_eq!(log.massif(0).trie_entry(0).unwrap().trie_key, entry.trie_key);
        assert_eq!(log.massif(0).node(0).unwrap(), entry.leaf_hash);
    }

    #[test]
    fn temp_replica_is_usable() {
        let replica = TempReplica::new();
        replica.store.put("a/b", b"x").unwrap();
        assert!(replica.path().join("a").join("b").is_file());
    }
}
