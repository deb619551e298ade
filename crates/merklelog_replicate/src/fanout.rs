//! Replication across many tenants.
//!
//! A fixed pool of scoped worker threads drains the request list. Each tenant
//! gets reader and replica handles made by a caller-supplied factory, so
//! workers share no mutable state. Results come back over a bounded channel. Every tenant is attempted; a
//! failure for one tenant never stops another.

use crate::cancel::CancelToken;
use crate::config::ReplicatorConfig;
use crate::error::{ReplicateError, ReplicateResult};
use crate::replica::ReplicaStore;
use crate::replicator::{ReplicationReport, Replicator};
use crate::tail::TenantChange;
use merklelog_core::MassifReader;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error};

/// One tenant to bring up to massif `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRequest {
    /// Tenant identity.
    pub tenant: String,
    /// Last massif index to replicate.
    pub end: u32,
}

impl ReplicationRequest {
    /// Creates a request.
    pub fn new(tenant: impl Into<String>, end: u32) -> Self {
        Self {
            tenant: tenant.into(),
            end,
        }
    }
}

impl From<&TenantChange> for ReplicationRequest {
    fn from(change: &TenantChange) -> Self {
        Self::new(change.tenant.clone(), change.massif_index)
    }
}

/// Result for one tenant.
#[derive(Debug)]
pub struct TenantOutcome {
    /// Tenant identity.
    pub tenant: String,
    /// Report or the error that stopped the tenant.
    pub result: ReplicateResult<ReplicationReport>,
}

/// Results of a fan-out, in completion order.
#[derive(Debug, Default)]
pub struct FanoutReport {
    /// Per-tenant outcomes.
    pub outcomes: Vec<TenantOutcome>,
}

impl FanoutReport {
    /// The first error received, if any.
    pub fn first_error(&self) -> Option<&ReplicateError> {
        self.outcomes.iter().find_map(|o| o.result.as_ref().err())
    }

    /// Successful reports, sorted by tenant.
    pub fn reports(&self) -> Vec<&ReplicationReport> {
        let mut reports: Vec<_> = self
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect();
        reports.sort_by(|a, b| a.tenant.cmp(&b.tenant));
        reports
    }

    /// Converts into the sorted reports, or the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error received.
    pub fn into_result(self) -> ReplicateResult<Vec<ReplicationReport>> {
        let mut reports = Vec::with_capacity(self.outcomes.len());
        for outcome in self.outcomes {
            reports.push(outcome.result?);
        }
        reports.sort_by(|a, b| a.tenant.cmp(&b.tenant));
        Ok(reports)
    }
}

fn replicate_one<F, R, L>(
    request: &ReplicationRequest,
    config: &ReplicatorConfig,
    cancel: &CancelToken,
    factory: &F,
) -> ReplicateResult<ReplicationReport>
where
    F: Fn(&str) -> ReplicateResult<(R, L)>,
    R: MassifReader,
    L: ReplicaStore,
{
    let (remote, local) = factory(&request.tenant)?;
    Replicator::new(&remote, &local, config)
        .with_cancel(cancel.clone())
        .replicate(&request.tenant, request.end)
}

/// Replicates every request on up to `config.concurrency` worker threads
/// and waits for all of them.
///
/// Workers take the next unclaimed request as soon as they finish one.
/// `factory` is called once per tenant, on the worker thread handling it.
pub fn replicate_tenants<F, R, L>(
    requests: &[ReplicationRequest],
    config: &ReplicatorConfig,
    cancel: &CancelToken,
    factory: F,
) -> FanoutReport
where
    F: Fn(&str) -> ReplicateResult<(R, L)> + Sync,
    R: MassifReader,
    L: ReplicaStore,
{
    let workers = config.concurrency.max(1).min(requests.len());
    debug!(tenants = requests.len(), workers, "starting replication");
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::sync_channel::<(usize, TenantOutcome)>(config.channel_capacity.max(1));
    let mut answered = vec![false; requests.len()];
    let mut report = FanoutReport::default();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let tx = tx.clone();
                let (next, factory) = (&next, &factory);
                scope.spawn(move || loop {
                    let slot = next.fetch_add(1, Ordering::Relaxed);
                    let Some(request) = requests.get(slot) else {
                        break;
                    };
                    let result = replicate_one(request, config, cancel, factory);
                    if let Err(e) = &result {
                        error!(tenant = %request.tenant, error = %e, "tenant replication failed");
                    }
                    let outcome = TenantOutcome {
                        tenant: request.tenant.clone(),
                        result,
                    };
                    if tx.send((slot, outcome)).is_err() {
                        break;
                    }
                })
            })
            .collect();
        drop(tx);

        for (slot, outcome) in rx.iter() {
            answered[slot] = true;
            report.outcomes.push(outcome);
        }
        for handle in handles {
            if handle.join().is_err() {
                error!("replication worker panicked");
            }
        }
    });

    // Requests held by a panicked worker, or left over once every worker
    // panicked, never report back.
    for (request, _) in requests.iter().zip(&answered).filter(|(_, done)| !**done) {
        report.outcomes.push(TenantOutcome {
            tenant: request.tenant.clone(),
            result: Err(ReplicateError::WorkerPanicked {
                tenant: request.tenant.clone(),
            }),
        });
    }

    report
}
