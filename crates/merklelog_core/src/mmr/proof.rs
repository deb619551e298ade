//! Inclusion and consistency proofs.

use super::hash::{hash_pospair, Hash};
use super::index::{index_height, peak_position, peaks};
use super::store::NodeSource;
use crate::error::{CoreError, CoreResult};

/// Collects the sibling path from `index` up to its peak in an MMR of
/// `mmr_size` nodes.
///
/// # Errors
///
/// Returns [`CoreError::IndexOutOfRange`] if `index >= mmr_size`, or the
/// source's error when a sibling is unavailable.
pub fn inclusion_proof<S: NodeSource + ?Sized>(
    store: &S,
    mmr_size: u64,
    index: u64,
) -> CoreResult<Vec<Hash>> {
    if index >= mmr_size {
        return Err(CoreError::IndexOutOfRange {
            index,
            size: mmr_size,
        });
    }
    let mut proof = Vec::new();
    let mut i = index;
    let mut height = index_height(i);
    loop {
        let offset = 2u64 << height;
        let (sibling, parent) = if index_height(i + 1) > height {
            // i is a right child
            (i + 1 - offset, i + 1)
        } else {
            (i + offset - 1, i + offset)
        };
        if parent >= mmr_size {
            return Ok(proof);
        }
        proof.push(store.node(sibling)?);
        i = parent;
        height += 1;
    }
}

/// Recomputes the peak reached from `leaf` at `index` along `proof`.
#[must_use]
pub fn included_root(index: u64, node: &Hash, proof: &[Hash]) -> Hash {
    let mut root = *node;
    let mut i = index;
    let mut height = index_height(i);
    for sibling in proof {
        if index_height(i + 1) > height {
            i += 1;
            root = hash_pospair(i + 1, sibling, &root);
        } else {
            i += 2u64 << height;
            root = hash_pospair(i + 1, &root, sibling);
        }
        height += 1;
    }
    root
}

/// Verifies that `node` is at `index` in the MMR whose peaks at `mmr_size`
/// are `accumulator`.
#[must_use]
pub fn verify_inclusion(
    mmr_size: u64,
    node: &Hash,
    index: u64,
    proof: &[Hash],
    accumulator: &[Hash],
) -> bool {
    let Some(peak_indices) = peaks(mmr_size) else {
        return false;
    };
    if peak_indices.len() != accumulator.len() {
        return false;
    }
    let Some(pos) = peak_position(&peak_indices, index) else {
        return false;
    };
    let expected_len = index_height(peak_indices[pos]) - index_height(index);
    if proof.len() != expected_len as usize {
        return false;
    }
    included_root(index, node, proof) == accumulator[pos]
}

/// Peak values of an MMR of `mmr_size` nodes, left to right.
///
/// # Errors
///
/// Returns [`CoreError::InvalidMmrSize`] for invalid sizes, or the source's
/// error when a peak is unavailable.
pub fn peak_hashes<S: NodeSource + ?Sized>(store: &S, mmr_size: u64) -> CoreResult<Vec<Hash>> {
    peaks(mmr_size)
        .ok_or(CoreError::InvalidMmrSize { size: mmr_size })?
        .into_iter()
        .map(|i| store.node(i))
        .collect()
}

/// Paths proving each peak of `size_a` is included in the MMR at `size_b`.
///
/// # Errors
///
/// Returns an error if either size is invalid, `size_a > size_b`, or a node
/// is unavailable.
pub fn consistency_proof<S: NodeSource + ?Sized>(
    store: &S,
    size_a: u64,
    size_b: u64,
) -> CoreResult<Vec<Vec<Hash>>> {
    if size_a > size_b {
        return Err(CoreError::IndexOutOfRange {
            index: size_a,
            size: size_b,
        });
    }
    if peaks(size_b).is_none() {
        return Err(CoreError::InvalidMmrSize { size: size_b });
    }
    peaks(size_a)
        .ok_or(CoreError::InvalidMmrSize { size: size_a })?
        .into_iter()
        .map(|peak| inclusion_proof(store, size_b, peak))
        .collect()
}

/// Checks a consistency proof between two accumulators.
#[must_use]
pub fn verify_consistency_proof(
    size_a: u64,
    size_b: u64,
    peaks_a: &[Hash],
    peaks_b: &[Hash],
    proof: &[Vec<Hash>],
) -> bool {
    if size_a > size_b {
        return false;
    }
    let Some(indices_a) = peaks(size_a) else {
        return false;
    };
    if indices_a.len() != peaks_a.len() || proof.len() != peaks_a.len() {
        return false;
    }
    indices_a
        .iter()
        .zip(peaks_a)
        .zip(proof)
        .all(|((&index, peak), path)| verify_inclusion(size_b, peak, index, path, peaks_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmr::store::{add_hashed_leaf, VecMmr};
    use crate::mmr::index::mmr_index;

    fn build(leaves: u64) -> VecMmr {
        let mut mmr = VecMmr::new();
        for n in 0..leaves {
            let mut leaf = [0u8; 32];
            leaf[..8].copy_from_slice(&n.to_be_bytes());
            add_hashed_leaf(&mut mmr, leaf).unwrap();
        }
        mmr
    }

    #[test]
    fn every_node_proves_in_every_later_size() {
        let mmr = build(21);
        let full = mmr.size();
        let mut size = 1;
        while size <= full {
            let acc = peak_hashes(&mmr, size).unwrap();
            for index in 0..size {
                let proof = inclusion_proof(&mmr, size, index).unwrap();
                let node = mmr.node(index).unwrap();
                assert!(
                    verify_inclusion(size, &node, index, &proof, &acc),
                    "index {index} size {size}"
                );
            }
            size = mmr_index(crate::mmr::index::leaf_count(size) + 1);
        }
    }

    #[test]
    fn tampered_proof_fails() {
        let mmr = build(11);
        let size = mmr.size();
        let acc = peak_hashes(&mmr, size).unwrap();
        let mut proof = inclusion_proof(&mmr, size, 3).unwrap();
        assert!(!proof.is_empty());
        proof[0][0] ^= 1;
        let node = mmr.node(3).unwrap();
        assert!(!verify_inclusion(size, &node, 3, &proof, &acc));
        assert!(!verify_inclusion(size, &[9u8; 32], 3, &inclusion_proof(&mmr, size, 3).unwrap(), &acc));
    }

    #[test]
    fn proof_index_out_of_range() {
        let mmr = build(3);
        assert!(matches!(
            inclusion_proof(&mmr, mmr.size(), mmr.size()),
            Err(CoreError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn peak_has_empty_proof() {
        let mmr = build(4);
        assert_eq!(inclusion_proof(&mmr, 7, 6).unwrap(), Vec::<Hash>::new());
    }

    #[test]
    fn consistency_between_sizes() {
        let mmr = build(30);
        let size_b = mmr.size();
        let peaks_b = peak_hashes(&mmr, size_b).unwrap();
        for leaves_a in 1..30 {
            let size_a = mmr_index(leaves_a);
            let peaks_a = peak_hashes(&mmr, size_a).unwrap();
            let proof = consistency_proof(&mmr, size_a, size_b).unwrap();
            assert!(verify_consistency_proof(size_a, size_b, &peaks_a, &peaks_b, &proof));
        }
    }

    #[test]
    fn forked_history_is_inconsistent() {
        let honest = build(10);
        let mut forked = build(6);
        add_hashed_leaf(&mut forked, [0xee; 32]).unwrap();
        let size_a = forked.size();
        let peaks_a = peak_hashes(&forked, size_a).unwrap();

        let size_b = honest.size();
        let peaks_b = peak_hashes(&honest, size_b).unwrap();
        let proof = consistency_proof(&honest, size_a, size_b).unwrap();
        assert!(!verify_consistency_proof(size_a, size_b, &peaks_a, &peaks_b, &proof));
    }
}
