//! Merkle Mountain Range primitives.
//!
//! The MMR is a sequence of perfect binary trees stored in post-order in a
//! single append-only array. Node values are SHA-256; interior nodes commit
//! to their position (see [`hash_pospair`]).
//!
//! Everything here is a pure function of its inputs plus a [`NodeSource`]
//! for reading node values.

mod hash;
mod index;
mod proof;
mod store;

pub use hash::{bag_peaks, hash_pospair, Hash};
pub use index::{index_height, is_valid_size, leaf_count, mmr_index, peak_position, peaks};
pub use proof::{
    consistency_proof, included_root, inclusion_proof, peak_hashes, verify_consistency_proof,
    verify_inclusion,
};
pub use store::{add_hashed_leaf, NodeAppender, NodeSource, VecMmr};
