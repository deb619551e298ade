//! # merklelog core
//!
//! Read-side core of a tenant-partitioned, append-only log built on a Merkle
//! Mountain Range.
//!
//! This crate provides:
//! - MMR index arithmetic, hashing and proofs ([`mmr`])
//! - The massif segment format and addressing ([`massif`])
//! - Trie key and leaf hash derivation ([`keys`])
//! - Log ids, idtimestamps and storage paths
//! - COSE_Sign1 seals with Ed25519 ([`seal`])
//! - A [`MassifReader`] over any blob store
//! - Content-addressed search ([`search`]) and verification ([`verify`])

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod idtimestamp;
pub mod keys;
pub mod logid;
pub mod massif;
pub mod mmr;
pub mod paths;
mod reader;
pub mod seal;
pub mod search;
pub mod verify;

pub use error::{CoreError, CoreResult};
pub use idtimestamp::IdGenerator;
pub use keys::{leaf_hash_v1, trie_key, Domain};
pub use logid::LogId;
pub use massif::{Massif, TrieEntry};
pub use mmr::Hash;
pub use paths::{LogKind, ParsedPath};
pub use reader::{BlobMassifReader, MassifReader, LIST_PAGE_SIZE};
pub use seal::{Checkpoint, Ed25519SealVerifier, Seal, SealSigner, SealVerifier};
pub use search::{find_mmr_entries, find_trie_keys, IndexKind, SearchConfig, SearchResult};
pub use verify::{
    prove_inclusion, verify_consistency, verify_inclusion, verify_massif, MmrState, TrustedSealer,
};
