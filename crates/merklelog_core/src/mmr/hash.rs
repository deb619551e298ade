//! Node hashing.

use sha2::{Digest, Sha256};

/// A 32-byte node value.
pub type Hash = [u8; 32];

/// Hash of an interior node.
///
/// Commits to the node's 1-based position so identical subtrees at different
/// places hash differently: `SHA256(pos_be8 || left || right)`.
#[must_use]
pub fn hash_pospair(pos: u64, left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(pos.to_be_bytes());
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Bags a peak list into a single root, right to left.
///
/// Returns `None` for an empty list.
#[must_use]
pub fn bag_peaks(peaks: &[Hash]) -> Option<Hash> {
    let (last, rest) = peaks.split_last()?;
    Some(rest.iter().rev().fold(*last, |acc, peak| {
        let mut hasher = Sha256::new();
        hasher.update(peak);
        hasher.update(acc);
        hasher.finalize().into()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_changes_hash() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(hash_pospair(3, &a, &b), hash_pospair(6, &a, &b));
        assert_ne!(hash_pospair(3, &a, &b), hash_pospair(3, &b, &a));
    }

    #[test]
    fn bagging() {
        assert_eq!(bag_peaks(&[]), None);
        assert_eq!(bag_peaks(&[[7u8; 32]]), Some([7u8; 32]));
        let two = bag_peaks(&[[1u8; 32], [2u8; 32]]).unwrap();
        let three = bag_peaks(&[[0u8; 32], [1u8; 32], [2u8; 32]]).unwrap();
        assert_ne!(two, three);
    }
}
