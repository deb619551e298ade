//! Collation of storage listings into per-tenant log tails.
//!
//! Listings arrive paginated and in no guaranteed order. Each observed path
//! is reduced into the highest massif and seal number seen per tenant, so
//! the outcome does not depend on order or repetition.

use crate::error::ReplicateResult;
use merklelog_core::paths::{parse_path, tenant_prefix, LogKind, MMRS_PREFIX};
use merklelog_core::LIST_PAGE_SIZE;
use merklelog_storage::{BlobStore, ListPage, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The most recent blob of one kind seen for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogTail {
    /// Tenant identity.
    pub tenant: String,
    /// Path the number was read from.
    pub path: String,
    /// Massif index.
    pub number: u32,
    /// Blob series.
    pub kind: LogKind,
}

/// A listing item that is not a massif or seal path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedPath {
    /// The path as listed.
    pub path: String,
    /// Why it did not parse.
    pub reason: String,
}

/// Head massif and seal for one tenant; the replicator's unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantChange {
    /// Tenant identity.
    pub tenant: String,
    /// Highest massif index seen.
    pub massif_index: u32,
    /// Highest seal index seen.
    pub seal_index: Option<u32>,
}

/// Max-reduction of observed paths per (tenant, kind).
#[derive(Debug, Clone, Default)]
pub struct TailCollator {
    tails: BTreeMap<(String, LogKind), LogTail>,
    rejected: Vec<RejectedPath>,
}

impl TailCollator {
    /// Creates an empty collator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes one path.
    ///
    /// Returns true if the path advanced a tail. Malformed paths are
    /// recorded in [`TailCollator::rejected`] and otherwise ignored.
    pub fn observe(&mut self, path: &str) -> bool {
        let parsed = match parse_path(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path, error = %e, "rejected listing item");
                self.rejected.push(RejectedPath {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
                return false;
            }
        };
        let key = (parsed.tenant, parsed.kind);
        match self.tails.get_mut(&key) {
            Some(tail) if parsed.number <= tail.number => false,
            Some(tail) => {
                tail.number = parsed.number;
                tail.path = path.to_string();
                true
            }
            None => {
                let tail = LogTail {
                    tenant: key.0.clone(),
                    path: path.to_string(),
                    number: parsed.number,
                    kind: key.1,
                };
                self.tails.insert(key, tail);
                true
            }
        }
    }

    /// Observes every entry of a listing page.
    pub fn observe_page(&mut self, page: &ListPage) {
        for entry in &page.entries {
            self.observe(&entry.path);
        }
    }

    /// Tail of `kind` for `tenant`.
    pub fn tail(&self, tenant: &str, kind: LogKind) -> Option<&LogTail> {
        self.tails.get(&(tenant.to_string(), kind))
    }

    /// Every tail, ordered by tenant then kind.
    pub fn tails(&self) -> impl Iterator<Item = &LogTail> {
        self.tails.values()
    }

    /// Paths that failed to parse, in observation order.
    pub fn rejected(&self) -> &[RejectedPath] {
        &self.rejected
    }

    /// Per-tenant heads, sorted by tenant.
    ///
    /// Tenants with seals but no massifs are left out.
    pub fn changes(&self) -> Vec<TenantChange> {
        let mut changes = Vec::new();
        for ((tenant, kind), tail) in &self.tails {
            if *kind != LogKind::Massif {
                continue;
            }
            changes.push(TenantChange {
                tenant: tenant.clone(),
                massif_index: tail.number,
                seal_index: self.tail(tenant, LogKind::Seal).map(|t| t.number),
            });
        }
        for tail in self.tails.values() {
            if tail.kind == LogKind::Seal && self.tail(&tail.tenant, LogKind::Massif).is_none() {
                debug!(tenant = %tail.tenant, "seal without massif");
            }
        }
        changes
    }
}

/// Paginated listing input.
pub trait ListingSource {
    /// Reads one page of paths under `prefix`, strictly after `marker`.
    ///
    /// # Errors
    ///
    /// Returns the underlying storage error.
    fn list_page(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage>;
}

impl<S: BlobStore + ?Sized> ListingSource for S {
    fn list_page(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage> {
        self.list(prefix, marker, limit)
    }
}

/// Which listing items to collate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    /// Restrict to one tenant.
    pub tenant: Option<String>,
    /// Skip blobs last modified before this time (Unix milliseconds).
    pub modified_since: Option<u64>,
    /// Entries requested per page.
    pub page_size: usize,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            tenant: None,
            modified_since: None,
            page_size: LIST_PAGE_SIZE,
        }
    }
}

impl ListingFilter {
    /// Creates a filter accepting everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to `tenant`.
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Skips blobs modified before `millis`.
    pub fn with_modified_since(mut self, millis: u64) -> Self {
        self.modified_since = Some(millis);
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn prefix(&self) -> String {
        self.tenant
            .as_deref()
            .map_or_else(|| MMRS_PREFIX.to_string(), tenant_prefix)
    }
}

/// Result of [`collect_listing`].
#[derive(Debug, Clone, Default)]
pub struct CollectedTails {
    /// Collated tails.
    pub collator: TailCollator,
    /// Pages read.
    pub pages_read: usize,
    /// Continuation marker of the first unread page, if the page limit
    /// stopped the listing early.
    pub more_results: Option<String>,
}

/// Reads up to `max_pages` listing pages and collates them.
///
/// # Errors
///
/// Returns the first listing error; pages already read are discarded.
pub fn collect_listing<L: ListingSource + ?Sized>(
    source: &L,
    filter: &ListingFilter,
    max_pages: usize,
) -> ReplicateResult<CollectedTails> {
    let prefix = filter.prefix();
    let mut collected = CollectedTails::default();
    let mut marker: Option<String> = None;

    while collected.pages_read < max_pages {
        let page = source.list_page(&prefix, marker.as_deref(), filter.page_size)?;
        collected.pages_read += 1;
        for entry in &page.entries {
            if filter.modified_since.is_some_and(|since| entry.last_modified < since) {
                continue;
            }
            collected.collator.observe(&entry.path);
        }
        match page.next_marker {
            Some(next) => marker = Some(next),
            None => return Ok(collected),
        }
    }

    if let Some(next) = marker {
        warn!(
            pages = collected.pages_read,
            marker = %next,
            "more results not shown"
        );
        collected.more_results = Some(next);
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use merklelog_core::paths::{massif_path, seal_path};
    use merklelog_storage::InMemoryStore;

    const A: &str = "tenant/aaaaaaaa-0000-0000-0000-000000000000";
    const B: &str = "tenant/bbbbbbbb-0000-0000-0000-000000000000";

    #[test]
    fn keeps_highest_number_per_kind() {
        let mut collator = TailCollator::new();
        assert!(collator.observe(&massif_path(A, 2)));
        assert!(!collator.observe(&massif_path(A, 1)));
        assert!(!collator.observe(&massif_path(A, 2)));
        assert!(collator.observe(&massif_path(A, 5)));
        assert!(collator.observe(&seal_path(A, 4)));

        let tail = collator.tail(A, LogKind::Massif).unwrap();
        assert_eq!(tail.number, 5);
        assert_eq!(tail.path, massif_path(A, 5));
        assert_eq!(collator.tail(A, LogKind::Seal).unwrap().number, 4);
    }

    #[test]
    fn malformed_paths_are_rejected_not_fatal() {
        let mut collator = TailCollator::new();
        collator.observe("v1/mmrs/tenant/x/0/massifs/abc.log");
        collator.observe(&massif_path(A, 0));
        collator.observe("elsewhere/file.txt");

        assert_eq!(collator.rejected().len(), 2);
        assert_eq!(collator.rejected()[1].path, "elsewhere/file.txt");
        assert_eq!(collator.changes().len(), 1);
    }

    #[test]
    fn changes_sorted_by_tenant() {
        let mut collator = TailCollator::new();
        collator.observe(&massif_path(B, 1));
        collator.observe(&massif_path(A, 3));
        collator.observe(&seal_path(A, 2));
        collator.observe(&seal_path("tenant/only-seals", 0));

        assert_eq!(
            collator.changes(),
            vec![
                TenantChange {
                    tenant: A.to_string(),
                    massif_index: 3,
                    seal_index: Some(2),
                },
                TenantChange {
                    tenant: B.to_string(),
                    massif_index: 1,
                    seal_index: None,
                },
            ]
        );
    }

    fn listing_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store.put(&massif_path(A, i), b"").unwrap();
            store.put(&seal_path(A, i), b"").unwrap();
        }
        store.put(&massif_path(B, 0), b"").unwrap();
        store.put("v1/mmrs/stray", b"").unwrap();
        store
    }

    #[test]
    fn collects_all_pages() {
        let store = listing_store();
        let filter = ListingFilter::new().with_page_size(3);
        let collected = collect_listing(&store, &filter, usize::MAX).unwrap();

        assert!(collected.more_results.is_none());
        assert_eq!(collected.pages_read, 4);
        assert_eq!(collected.collator.tail(A, LogKind::Massif).unwrap().number, 4);
        assert_eq!(collected.collator.tail(B, LogKind::Massif).unwrap().number, 0);
        assert_eq!(collected.collator.rejected().len(), 1);
    }

    #[test]
    fn page_limit_reports_more_results() {
        let store = listing_store();
        let filter = ListingFilter::new().with_page_size(2);
        let collected = collect_listing(&store, &filter, 1).unwrap();

        assert_eq!(collected.pages_read, 1);
        assert!(collected.more_results.is_some());
    }

    #[test]
    fn tenant_filter_limits_prefix() {
        let store = listing_store();
        let filter = ListingFilter::new().with_tenant(B);
        let collected = collect_listing(&store, &filter, usize::MAX).unwrap();

        let changes = collected.collator.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].tenant, B);
    }

    #[test]
    fn modified_since_skips_old_blobs() {
        let store = listing_store();
        for i in 0..5 {
            store.set_last_modified(&massif_path(A, i), 1_000);
        }
        let filter = ListingFilter::new().with_modified_since(2_000);
        let collected = collect_listing(&store, &filter, usize::MAX).unwrap();

        assert!(collected.collator.tail(A, LogKind::Massif).is_none());
        assert_eq!(collected.collator.tail(A, LogKind::Seal).unwrap().number, 4);
    }
}
