//! Watch command implementation.

use super::{print_json, CliResult, RemoteArgs};
use merklelog_replicate::{collect_listing, ListingFilter, TenantChange};
use serde::Serialize;

/// Collated tails.
#[derive(Debug, Serialize)]
pub struct WatchOutput {
    /// Per-tenant heads.
    pub changes: Vec<TenantChange>,
    /// Listing items that were not log blobs.
    pub rejected: usize,
    /// Continuation marker when the page limit was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_results: Option<String>,
}

/// Runs `watch`.
///
/// With `--format json` only the change list is printed, so the output can
/// be passed to `replicate-logs --changes`.
pub fn run(
    remote: &RemoteArgs,
    tenant: Option<String>,
    modified_since: Option<u64>,
    max_pages: usize,
    format: &str,
) -> CliResult<()> {
    let store = remote.open_store()?;
    let mut filter = ListingFilter::new();
    if let Some(tenant) = tenant {
        filter = filter.with_tenant(tenant);
    }
    if let Some(since) = modified_since {
        filter = filter.with_modified_since(since);
    }

    let collected = collect_listing(store.as_ref(), &filter, max_pages)?;
    let output = WatchOutput {
        changes: collected.collator.changes(),
        rejected: collected.collator.rejected().len(),
        more_results: collected.more_results,
    };

    match format {
        "json" => print_json(&output.changes)?,
        _ => {
            for change in &output.changes {
                let seal = change
                    .seal_index
                    .map_or_else(|| "-".to_string(), |i| i.to_string());
                println!("{} massif {} seal {}", change.tenant, change.massif_index, seal);
            }
            if output.rejected > 0 {
                println!("{} unrecognised blobs skipped", output.rejected);
            }
            if let Some(marker) = &output.more_results {
                println!("More results not shown (continue after {marker})");
            }
        }
    }
    Ok(())
}
