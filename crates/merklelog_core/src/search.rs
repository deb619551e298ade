//! Linear scans over a range of massifs.

use crate::error::CoreResult;
use crate::keys::{leaf_hash_v1, Domain};
use crate::massif::{validate_height, Massif, TrieEntry};
use crate::mmr::{mmr_index, Hash, NodeSource};
use crate::reader::MassifReader;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Default massif height used by the public logs.
pub const DEFAULT_MASSIF_HEIGHT: u8 = 14;

/// How matched positions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Leaf ordinal.
    #[default]
    Leaf,
    /// MMR node index of the leaf.
    Mmr,
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leaf" => Ok(Self::Leaf),
            "mmr" => Ok(Self::Mmr),
            other => Err(format!("unknown index kind '{other}', expected leaf or mmr")),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Mmr => write!(f, "mmr"),
        }
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Matching leaf indices, ascending.
    pub matches: Vec<u64>,
    /// Number of leaf slots examined.
    pub entries_considered: u64,
}

impl SearchResult {
    /// Matches expressed as `kind`.
    #[must_use]
    pub fn indices(&self, kind: IndexKind) -> Vec<u64> {
        match kind {
            IndexKind::Leaf => self.matches.clone(),
            IndexKind::Mmr => self.matches.iter().map(|&leaf| mmr_index(leaf)).collect(),
        }
    }
}

/// Massif range and height for a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Massif height.
    pub massif_height: u8,
    /// First massif scanned.
    pub massif_start: u32,
    /// Last massif scanned; `None` scans until the log ends.
    pub massif_end: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            massif_height: DEFAULT_MASSIF_HEIGHT,
            massif_start: 0,
            massif_end: None,
        }
    }
}

impl SearchConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the massif height.
    #[must_use]
    pub fn massif_height(mut self, height: u8) -> Self {
        self.massif_height = height;
        self
    }

    /// Sets the first massif.
    #[must_use]
    pub fn massif_start(mut self, start: u32) -> Self {
        self.massif_start = start;
        self
    }

    /// Sets the last massif.
    #[must_use]
    pub fn massif_end(mut self, end: Option<u32>) -> Self {
        self.massif_end = end;
        self
    }

    /// [`find_trie_keys`] over this range.
    ///
    /// # Errors
    ///
    /// As for [`find_trie_keys`].
    pub fn find_trie_keys<R: MassifReader + ?Sized>(
        &self,
        reader: &R,
        tenant: &str,
        candidates: &[Hash],
    ) -> CoreResult<SearchResult> {
        find_trie_keys(
            reader,
            tenant,
            self.massif_start,
            self.massif_end,
            self.massif_height,
            candidates,
        )
    }

    /// [`find_mmr_entries`] over this range.
    ///
    /// # Errors
    ///
    /// As for [`find_trie_keys`].
    pub fn find_mmr_entries<R: MassifReader + ?Sized>(
        &self,
        reader: &R,
        tenant: &str,
        payloads: &[Vec<u8>],
    ) -> CoreResult<SearchResult> {
        find_mmr_entries(
            reader,
            tenant,
            self.massif_start,
            self.massif_end,
            self.massif_height,
            payloads,
        )
    }
}

/// Visits every populated leaf slot in massifs `start..=end`.
///
/// Stops cleanly at the first missing massif. Returns the number of slots
/// visited.
fn scan<R, F>(
    reader: &R,
    tenant: &str,
    start: u32,
    end: Option<u32>,
    height: u8,
    mut visit: F,
) -> CoreResult<u64>
where
    R: MassifReader + ?Sized,
    F: FnMut(&Massif, u64, &TrieEntry) -> CoreResult<()>,
{
    validate_height(height)?;
    let mut considered = 0u64;
    let mut index = start;
    loop {
        if end.is_some_and(|e| index > e) {
            break;
        }
        let massif = match reader.get_massif(tenant, index) {
            Ok(m) => m,
            Err(e) if e.is_not_found() => {
                debug!(tenant, massif_index = index, "end of log");
                break;
            }
            Err(e) => return Err(e),
        };
        massif.expect(height, index)?;
        let first_leaf = massif.first_leaf();
        let leaves = massif.leaf_count();
        for slot in 0..leaves {
            visit(&massif, first_leaf + slot, &massif.trie_entry(slot)?)?;
        }
        considered += leaves;
        match index.checked_add(1) {
            Some(next) => index = next,
            None => break,
        }
    }
    Ok(considered)
}

/// Finds leaves whose trie key is one of `candidates`.
///
/// # Errors
///
/// Returns any fetch error other than not-found, or a format error for a
/// massif that does not match `height`.
pub fn find_trie_keys<R: MassifReader + ?Sized>(
    reader: &R,
    tenant: &str,
    start: u32,
    end: Option<u32>,
    height: u8,
    candidates: &[Hash],
) -> CoreResult<SearchResult> {
    let mut matches = Vec::new();
    let entries_considered = scan(reader, tenant, start, end, height, |_, leaf, entry| {
        if candidates.contains(&entry.trie_key) {
            matches.push(leaf);
        }
        Ok(())
    })?;
    Ok(SearchResult {
        matches,
        entries_considered,
    })
}

/// Finds leaves whose value is the v1 leaf hash of one of `payloads`.
///
/// Each slot's own domain, extra bytes and idtimestamp are combined with
/// each payload. Payloads that cannot be hashed for a slot are skipped for
/// that slot.
///
/// # Errors
///
/// As for [`find_trie_keys`].
pub fn find_mmr_entries<R: MassifReader + ?Sized>(
    reader: &R,
    tenant: &str,
    start: u32,
    end: Option<u32>,
    height: u8,
    payloads: &[Vec<u8>],
) -> CoreResult<SearchResult> {
    let mut matches = Vec::new();
    let entries_considered = scan(reader, tenant, start, end, height, |massif, leaf, entry| {
        let stored = massif.node(mmr_index(leaf))?;
        let Ok(domain) = Domain::from_byte(entry.domain) else {
            trace!(leaf, domain = entry.domain, "unknown domain");
            return Ok(());
        };
        let found = payloads.iter().any(|payload| {
            match leaf_hash_v1(domain, &entry.extra_bytes, entry.idtimestamp, payload) {
                Ok(hash) => hash == stored,
                Err(e) => {
                    trace!(leaf, error = %e, "skipping payload");
                    false
                }
            }
        });
        if found {
            matches.push(leaf);
        }
        Ok(())
    })?;
    Ok(SearchResult {
        matches,
        entries_considered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::trie_key;
    use crate::mmr::{add_hashed_leaf, NodeSource};
    use crate::paths::massif_path;
    use crate::reader::BlobMassifReader;
    use merklelog_storage::{BlobStore, InMemoryStore};

    const TENANT: &str = "tenant/1d4ef7b6-6f5c-4b2c-8f6e-52f3f1c3a0aa";
    const HEIGHT: u8 = 2;

    fn app_key(n: u64) -> Hash {
        trie_key(0, TENANT.as_bytes(), format!("entry-{n}").as_bytes())
    }

    fn payload(n: u64) -> Vec<u8> {
        format!("payload-{n}").into_bytes()
    }

    /// Writes `leaves` entries as height-2 massifs; entry n has key
    /// `app_key(n)` and leaf hash of `payload(n)`.
    fn store_with(leaves: u64) -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut current = Massif::new(HEIGHT, 0, 0).unwrap();
        for n in 0..leaves {
            if current.is_complete() {
                let next_index = current.massif_index() + 1;
                let mut next = Massif::new(HEIGHT, next_index, 0).unwrap();
                let stack: Vec<Hash> = next
                    .peak_stack_indices()
                    .iter()
                    .map(|&i| current.node(i).unwrap())
                    .collect();
                next.set_peak_stack(&stack).unwrap();
                store
                    .put(&massif_path(TENANT, current.massif_index()), current.as_bytes())
                    .unwrap();
                current = next;
            }
            let slot = n - current.first_leaf();
            let entry = TrieEntry {
                trie_key: app_key(n),
                extra_bytes: [n as u8; 24],
                idtimestamp: 1000 + n,
                domain: 0,
            };
            current.set_trie_entry(slot, &entry).unwrap();
            let leaf = leaf_hash_v1(Domain::Serialized, &entry.extra_bytes, entry.idtimestamp, &payload(n))
                .unwrap();
            add_hashed_leaf(&mut current, leaf).unwrap();
        }
        store
            .put(&massif_path(TENANT, current.massif_index()), current.as_bytes())
            .unwrap();
        store
    }

    #[test]
    fn full_range_considers_every_leaf() {
        let reader = BlobMassifReader::new(store_with(7), HEIGHT).unwrap();
        let result = find_trie_keys(&reader, TENANT, 0, None, HEIGHT, &[app_key(5)]).unwrap();
        assert_eq!(result.matches, vec![5]);
        assert_eq!(result.entries_considered, 7);
        assert_eq!(result.indices(IndexKind::Mmr), vec![mmr_index(5)]);
    }

    #[test]
    fn range_limits_scan() {
        let reader = BlobMassifReader::new(store_with(8), HEIGHT).unwrap();
        let keys = [app_key(1), app_key(4)];
        let result = find_trie_keys(&reader, TENANT, 2, Some(2), HEIGHT, &keys).unwrap();
        assert_eq!(result.matches, vec![4]);
        assert_eq!(result.entries_considered, 2);

        let result = find_trie_keys(&reader, TENANT, 1, Some(1), HEIGHT, &keys).unwrap();
        assert!(result.matches.is_empty());
    }

    #[test]
    fn duplicate_candidates_match_once() {
        let reader = BlobMassifReader::new(store_with(3), HEIGHT).unwrap();
        let keys = [app_key(2), app_key(2)];
        let result = find_trie_keys(&reader, TENANT, 0, None, HEIGHT, &keys).unwrap();
        assert_eq!(result.matches, vec![2]);
    }

    #[test]
    fn start_beyond_log_is_empty() {
        let reader = BlobMassifReader::new(store_with(3), HEIGHT).unwrap();
        let result = find_trie_keys(&reader, TENANT, 9, None, HEIGHT, &[app_key(0)]).unwrap();
        assert_eq!(result, SearchResult::default());
    }

    #[test]
    fn finds_entries_by_payload() {
        let reader = BlobMassifReader::new(store_with(6), HEIGHT).unwrap();
        let payloads = vec![payload(3), payload(0), b"not logged".to_vec()];
        let result = find_mmr_entries(&reader, TENANT, 0, None, HEIGHT, &payloads).unwrap();
        assert_eq!(result.matches, vec![0, 3]);
        assert_eq!(result.entries_considered, 6);
    }

    #[test]
    fn corrupt_massif_aborts_scan() {
        let store = store_with(3);
        store.put(&massif_path(TENANT, 1), b"junk").unwrap();
        let reader = BlobMassifReader::new(store, HEIGHT).unwrap();
        assert!(find_trie_keys(&reader, TENANT, 0, None, HEIGHT, &[]).is_err());
    }

    #[test]
    fn index_kind_parsing() {
        assert_eq!("mmr".parse::<IndexKind>().unwrap(), IndexKind::Mmr);
        assert_eq!("leaf".parse::<IndexKind>().unwrap(), IndexKind::Leaf);
        assert!("node".parse::<IndexKind>().is_err());
    }

    #[test]
    fn config_builder() {
        let config = SearchConfig::new().massif_height(9).massif_start(1).massif_end(Some(3));
        assert_eq!(config.massif_height, 9);
        assert_eq!(config.massif_start, 1);
        assert_eq!(config.massif_end, Some(3));
        assert_eq!(SearchConfig::default().massif_height, DEFAULT_MASSIF_HEIGHT);
    }

    #[test]
    fn config_scans_its_range() {
        let reader = BlobMassifReader::new(store_with(8), HEIGHT).unwrap();
        let config = SearchConfig::new()
            .massif_height(HEIGHT)
            .massif_start(1)
            .massif_end(Some(2));
        let result = config
            .find_trie_keys(&reader, TENANT, &[app_key(0), app_key(3), app_key(5)])
            .unwrap();
        assert_eq!(result.matches, vec![3, 5]);
        assert_eq!(result.entries_considered, 4);

        let result = config.find_mmr_entries(&reader, TENANT, &[payload(2)]).unwrap();
        assert_eq!(result.matches, vec![2]);
    }
}
