//! Index arithmetic for an MMR laid out in post-order.
//!
//! Indices are zero based. Node `i` has 1-based position `i + 1`; a position
//! that is all ones in binary is the top of a perfect tree, which is what
//! makes heights computable by bit manipulation alone.

/// Number of significant bits in `x`.
fn bit_length(x: u64) -> u32 {
    u64::BITS - x.leading_zeros()
}

fn all_ones(x: u64) -> bool {
    x != 0 && x.count_zeros() == x.leading_zeros()
}

/// Moves a 1-based position to the same height in the leftmost perfect tree.
fn jump_left(pos: u64) -> u64 {
    let most_significant = 1u64 << (bit_length(pos) - 1);
    pos - (most_significant - 1)
}

/// Height of the node at `index`; leaves are height 0.
#[must_use]
pub fn index_height(index: u64) -> u32 {
    let mut pos = index + 1;
    while !all_ones(pos) {
        pos = jump_left(pos);
    }
    bit_length(pos) - 1
}

/// MMR index of leaf number `leaf_index`.
///
/// Also the MMR size after `leaf_index` leaves have been added.
#[must_use]
pub fn mmr_index(leaf_index: u64) -> u64 {
    2 * leaf_index - u64::from(leaf_index.count_ones())
}

/// Splits `size` into perfect trees, left to right, as `(peak_index, height)`.
///
/// Returns `None` when `size` is not a size any MMR passes through.
fn decompose(size: u64) -> Option<Vec<(u64, u32)>> {
    let mut out = Vec::new();
    let mut remaining = size;
    let mut offset = 0u64;
    let mut last_bits = u32::MAX;
    while remaining > 0 {
        // Largest 2^k - 1 that fits.
        let k = bit_length(remaining.saturating_add(1)) - 1;
        if k >= last_bits {
            return None;
        }
        let tree = (1u64 << k) - 1;
        out.push((offset + tree - 1, k - 1));
        offset += tree;
        remaining -= tree;
        last_bits = k;
    }
    Some(out)
}

/// Returns true if an MMR can have exactly `size` nodes.
#[must_use]
pub fn is_valid_size(size: u64) -> bool {
    decompose(size).is_some()
}

/// Indices of the peaks of an MMR with `size` nodes, left to right.
///
/// Returns `None` for invalid sizes.
#[must_use]
pub fn peaks(size: u64) -> Option<Vec<u64>> {
    decompose(size).map(|trees| trees.into_iter().map(|(index, _)| index).collect())
}

/// Number of leaves in an MMR of `size` nodes.
///
/// For sizes that are not valid, counts the leaves of the complete trees
/// that fit.
#[must_use]
pub fn leaf_count(size: u64) -> u64 {
    let mut remaining = size;
    let mut leaves = 0u64;
    while remaining > 0 {
        let k = bit_length(remaining.saturating_add(1)) - 1;
        let tree = (1u64 << k) - 1;
        leaves += 1u64 << (k - 1);
        remaining -= tree;
    }
    leaves
}

/// Position in `peak_indices` of the peak whose tree contains `index`.
#[must_use]
pub fn peak_position(peak_indices: &[u64], index: u64) -> Option<usize> {
    peak_indices.iter().position(|&p| p >= index)
}
