//! # merklelog replication
//!
//! Keeps a local replica of remote massif logs, extending it only with
//! massifs that verify against what was already accepted.
//!
//! This crate provides:
//! - Tail collation of paginated storage listings into per-tenant heads
//! - A replica store over any blob store
//! - The per-tenant replicator (bootstrap, extend, truncation and fork
//!   detection)
//! - Fan-out of replication across tenants
//!
//! ## Replication rules
//!
//! For each massif index in the requested range, the remote massif and seal
//! are fetched and verified. Compared with the local copy of that index:
//!
//! - shorter remote: [`ReplicateError::Truncated`], nothing written
//! - equal length: roots must match, else [`ReplicateError::RootMismatch`]
//! - longer remote, or no local copy: massif and seal replaced atomically
//!
//! A remote massif that does not exist yet ends the sequence successfully.
//! Files are never deleted.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod config;
mod error;
pub mod fanout;
pub mod replica;
pub mod replicator;
pub mod tail;

pub use cancel::CancelToken;
pub use config::ReplicatorConfig;
pub use error::{ReplicateError, ReplicateResult};
pub use fanout::{replicate_tenants, FanoutReport, ReplicationRequest, TenantOutcome};
pub use replica::{LocalReplicaStore, ReplicaStore, VerifiedReplica};
pub use replicator::{ReplicationReport, Replicator};
pub use tail::{
    collect_listing, CollectedTails, ListingFilter, ListingSource, LogTail, RejectedPath,
    TailCollator, TenantChange,
};
