//! Replicate command implementation.

use super::{print_json, CliResult, RemoteArgs};
use merklelog_core::seal::parse_public_key;
use merklelog_core::{BlobMassifReader, LogKind, MassifReader};
use merklelog_replicate::{
    collect_listing, replicate_tenants, CancelToken, ListingFilter, LocalReplicaStore,
    ReplicateResult, ReplicationReport, ReplicationRequest, ReplicatorConfig, TenantChange,
};
use merklelog_storage::FileStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Which tenants to replicate.
pub enum Selection {
    /// Named tenants.
    Tenants(Vec<String>),
    /// Every tenant in the remote listing.
    All,
    /// Tenants from a JSON change file.
    ChangesFile(PathBuf),
}

/// Replication options.
pub struct Options {
    /// Last massif to replicate; each tenant's head when absent.
    pub massif: Option<u32>,
    /// Ancestor retention.
    pub ancestors: Option<u32>,
    /// Replica root.
    pub replicadir: PathBuf,
    /// Hex sealer key.
    pub sealer_key: Option<String>,
    /// Tenants at once.
    pub concurrency: usize,
}

/// Resolves the change list for a selection.
fn changes_for<R: MassifReader>(
    selection: Selection,
    remote: &RemoteArgs,
    reader: &R,
) -> CliResult<Vec<TenantChange>> {
    match selection {
        Selection::ChangesFile(path) => {
            let text = fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            Ok(serde_json::from_str(&text)?)
        }
        Selection::All => {
            let store = remote.open_store()?;
            let collected = collect_listing(store.as_ref(), &ListingFilter::new(), usize::MAX)?;
            for rejected in collected.collator.rejected() {
                warn!(path = %rejected.path, "skipping unrecognised blob");
            }
            Ok(collected.collator.changes())
        }
        Selection::Tenants(tenants) => tenants
            .into_iter()
            .map(|tenant| -> CliResult<TenantChange> {
                let massif_index = reader.head_index(&tenant, LogKind::Massif)?;
                let seal_index = reader.head_index(&tenant, LogKind::Seal).ok();
                Ok(TenantChange {
                    tenant,
                    massif_index,
                    seal_index,
                })
            })
            .collect(),
    }
}

/// Runs `replicate-logs`.
pub fn run(
    remote: &RemoteArgs,
    selection: Selection,
    options: &Options,
    format: &str,
) -> CliResult<()> {
    let mut config = ReplicatorConfig::new(remote.height).with_concurrency(options.concurrency);
    if let Some(ancestors) = options.ancestors {
        config = config.with_ancestors(ancestors);
    }
    if let Some(key) = &options.sealer_key {
        config = config.with_sealer_key(parse_public_key(key)?);
    }

    let store = remote.open_store()?;
    let reader = BlobMassifReader::new(Arc::clone(&store), remote.height)?;
    let requests: Vec<ReplicationRequest> = changes_for(selection, remote, &reader)?
        .iter()
        .map(|change| {
            let mut request = ReplicationRequest::from(change);
            if let Some(end) = options.massif {
                request.end = end;
            }
            request
        })
        .collect();
    if requests.is_empty() {
        info!("nothing to replicate");
        return Ok(());
    }

    let replica = FileStore::open(&options.replicadir)?;
    let factory = |_: &str| -> ReplicateResult<_> {
        Ok((
            BlobMassifReader::new(Arc::clone(&store), remote.height)?,
            LocalReplicaStore::new(replica.clone(), remote.height)?,
        ))
    };
    let report = replicate_tenants(&requests, &config, &CancelToken::new(), factory);

    let reports: Vec<&ReplicationReport> = report.reports();
    match format {
        "json" => print_json(&reports)?,
        _ => {
            for r in &reports {
                println!(
                    "{}: written {:?}, unchanged {:?}, last verified {}",
                    r.tenant,
                    r.written,
                    r.unchanged,
                    r.last_verified
                        .map_or_else(|| "none".to_string(), |i| i.to_string())
                );
            }
        }
    }
    for outcome in &report.outcomes {
        if let Err(e) = &outcome.result {
            eprintln!("{}: {e}", outcome.tenant);
        }
    }

    match report.into_result() {
        Ok(_) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_file_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.json");
        let changes = vec![TenantChange {
            tenant: "tenant/a".to_string(),
            massif_index: 4,
            seal_index: Some(3),
        }];
        fs::write(&path, serde_json::to_string(&changes).unwrap()).unwrap();

        let remote = RemoteArgs {
            data_url: None,
            data_local: Some(dir.path().to_path_buf()),
            height: 3,
        };
        let reader = remote.open_reader().unwrap();
        let loaded = changes_for(Selection::ChangesFile(path), &remote, &reader).unwrap();
        assert_eq!(loaded, changes);
    }

    #[test]
    fn unknown_tenant_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteArgs {
            data_url: None,
            data_local: Some(dir.path().to_path_buf()),
            height: 3,
        };
        let reader = remote.open_reader().unwrap();
        let selection = Selection::Tenants(vec!["tenant/missing".to_string()]);
        assert!(changes_for(selection, &remote, &reader).is_err());
    }
}
