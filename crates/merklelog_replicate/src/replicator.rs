//! Per-tenant verified replication.

use crate::cancel::CancelToken;
use crate::config::ReplicatorConfig;
use crate::error::{ReplicateError, ReplicateResult};
use crate::replica::{ReplicaStore, VerifiedReplica};
use merklelog_core::massif::massif_first_index;
use merklelog_core::verify::{verify_massif, MmrState};
use merklelog_core::{Ed25519SealVerifier, MassifReader, SealVerifier, TrustedSealer};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Outcome of replicating one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationReport {
    /// Tenant identity.
    pub tenant: String,
    /// Massif indices written (new or extended).
    pub written: Vec<u32>,
    /// Massif indices already identical locally.
    pub unchanged: Vec<u32>,
    /// Highest massif index verified in this run.
    pub last_verified: Option<u32>,
}

/// What a massif is verified against.
enum Base {
    /// Consistency from this state is required.
    Trusted(MmrState),
    /// Nothing local precedes the massif.
    Bootstrap,
    /// A local predecessor exists but no verified boundary state reaches it.
    Unlinked,
}

/// Replicates massifs from a remote reader into a local replica store.
///
/// Tenants are independent; one replicator may serve many tenants, one at a
/// time.
pub struct Replicator<'a, R: ?Sized, L: ?Sized> {
    remote: &'a R,
    local: &'a L,
    config: &'a ReplicatorConfig,
    verifier: &'a dyn SealVerifier,
    cancel: CancelToken,
}

impl<'a, R, L> Replicator<'a, R, L>
where
    R: MassifReader + ?Sized,
    L: ReplicaStore + ?Sized,
{
    /// Creates a replicator verifying seals with Ed25519.
    pub fn new(remote: &'a R, local: &'a L, config: &'a ReplicatorConfig) -> Self {
        Self {
            remote,
            local,
            config,
            verifier: &Ed25519SealVerifier,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `verifier` for seal signatures.
    pub fn with_verifier(mut self, verifier: &'a dyn SealVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Observes `cancel` before every fetch and write.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn sealer(&self) -> Option<TrustedSealer<'_>> {
        self.config.sealer_key.as_ref().map(|key| TrustedSealer {
            verifier: self.verifier,
            key: key.as_slice(),
        })
    }

    /// First massif to examine for a run ending at `end`.
    fn start_index(&self, tenant: &str, end: u32) -> ReplicateResult<u32> {
        let requested = self.config.requested_start(end);
        let start = match self.local.last_verified(tenant)? {
            None => {
                debug!(tenant, start = requested, "bootstrapping replica");
                requested
            }
            Some(last) if last.saturating_add(1) < requested => {
                debug!(tenant, last, start = requested, "local replica behind retention, restarting");
                requested
            }
            Some(last) => requested.max(last),
        };
        Ok(start)
    }

    /// State that massif `massif_index` must be consistent with.
    ///
    /// The local seal of the same index when present. Otherwise the peaks at
    /// the massif boundary, taken from the local copy of the previous massif
    /// when it is complete, or from the remote previous massif once that is
    /// verified against the local seal.
    fn trusted_base(
        &self,
        local_copy: Option<&VerifiedReplica>,
        tenant: &str,
        massif_index: u32,
        sealer: Option<TrustedSealer<'_>>,
    ) -> ReplicateResult<Base> {
        if let Some(local) = local_copy {
            return Ok(Base::Trusted(local.state()));
        }
        let Some(previous_index) = massif_index.checked_sub(1) else {
            return Ok(Base::Bootstrap);
        };
        let Some(previous) = self.local.get_verified(tenant, previous_index)? else {
            return Ok(Base::Bootstrap);
        };
        let boundary = massif_first_index(self.config.massif_height, massif_index);
        if previous.massif.is_complete() {
            return Ok(Base::Trusted(MmrState {
                mmr_size: boundary,
                peaks: previous.massif.peaks_at(boundary)?,
            }));
        }

        debug!(
            tenant,
            massif_index = previous_index,
            local_size = previous.massif.mmr_size(),
            boundary,
            "local massif incomplete, linking through remote copy"
        );
        self.cancel.check()?;
        let remote_previous = match self.remote.get_massif(tenant, previous_index) {
            Ok(massif) => massif,
            Err(e) if e.is_not_found() => return Ok(Base::Unlinked),
            Err(e) => return Err(e.into()),
        };
        if !remote_previous.is_complete() {
            return Ok(Base::Unlinked);
        }
        self.cancel.check()?;
        let remote_seal = match self.remote.get_checkpoint(tenant, previous_index) {
            Ok(seal) => seal,
            Err(e) if e.is_not_found() => return Ok(Base::Unlinked),
            Err(e) => return Err(e.into()),
        };
        verify_massif(&remote_previous, &remote_seal, Some(&previous.state()), sealer)
            .map_err(|e| ReplicateError::from_verify(tenant, previous_index, e))?;
        Ok(Base::Trusted(MmrState {
            mmr_size: boundary,
            peaks: remote_previous.peaks_at(boundary)?,
        }))
    }

    /// Replicates `tenant` up to and including massif `end`.
    ///
    /// # Errors
    ///
    /// Stops at the first failure: [`ReplicateError::Truncated`],
    /// [`ReplicateError::RootMismatch`], [`ReplicateError::Verification`],
    /// [`ReplicateError::Cancelled`] or an I/O error. Massifs written before
    /// the failure are kept.
    pub fn replicate(&self, tenant: &str, end: u32) -> ReplicateResult<ReplicationReport> {
        if self.remote.massif_height() != self.config.massif_height {
            return Err(ReplicateError::Config(format!(
                "remote reader height {} differs from configured height {}",
                self.remote.massif_height(),
                self.config.massif_height
            )));
        }
        let sealer = self.sealer();
        let mut report = ReplicationReport {
            tenant: tenant.to_string(),
            ..ReplicationReport::default()
        };

        self.local.ensure_dirs(tenant)?;
        let start = self.start_index(tenant, end)?;

        for massif_index in start..=end {
            self.cancel.check()?;
            let remote_massif = match self.remote.get_massif(tenant, massif_index) {
                Ok(massif) => massif,
                Err(e) if e.is_not_found() => {
                    debug!(tenant, massif_index, "remote log ends");
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            self.cancel.check()?;
            let remote_seal = match self.remote.get_checkpoint(tenant, massif_index) {
                Ok(seal) => seal,
                Err(e) if e.is_not_found() => {
                    debug!(tenant, massif_index, "remote massif not sealed yet");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let local_copy = self.local.get_verified(tenant, massif_index)?;
            let remote_size = remote_massif.mmr_size();
            if let Some(local) = &local_copy {
                let local_size = local.massif.mmr_size();
                if remote_size < local_size {
                    return Err(ReplicateError::Truncated {
                        tenant: tenant.to_string(),
                        massif_index,
                        local_size,
                        remote_size,
                    });
                }
            }

            let base = match self.trusted_base(local_copy.as_ref(), tenant, massif_index, sealer)? {
                Base::Trusted(state) => Some(state),
                Base::Bootstrap => None,
                Base::Unlinked => {
                    warn!(
                        tenant,
                        massif_index, "previous massif cannot be linked to the replica, stopping"
                    );
                    break;
                }
            };
            verify_massif(&remote_massif, &remote_seal, base.as_ref(), sealer)
                .map_err(|e| ReplicateError::from_verify(tenant, massif_index, e))?;

            let ordering = local_copy
                .as_ref()
                .map_or(Ordering::Greater, |local| remote_size.cmp(&local.massif.mmr_size()));
            match (ordering, &local_copy) {
                (Ordering::Equal, Some(local)) => {
                    if local.massif.peaks_at(remote_size)? != remote_massif.peaks_at(remote_size)? {
                        return Err(ReplicateError::RootMismatch {
                            tenant: tenant.to_string(),
                            massif_index,
                            mmr_size: remote_size,
                        });
                    }
                    debug!(tenant, massif_index, mmr_size = remote_size, "replica up to date");
                    report.unchanged.push(massif_index);
                }
                _ => {
                    self.cancel.check()?;
                    self.local
                        .replace_verified(tenant, massif_index, &remote_massif, &remote_seal)?;
                    info!(
                        tenant,
                        massif_index,
                        mmr_size = remote_size,
                        sealed_size = remote_seal.checkpoint().mmr_size,
                        "massif replicated"
                    );
                    report.written.push(massif_index);
                }
            }
            report.last_verified = Some(massif_index);
        }

        Ok(report)
    }
}
