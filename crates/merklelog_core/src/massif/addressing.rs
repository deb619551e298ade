//! Mapping between leaf, MMR and massif indices.
//!
//! A massif of height `h` holds `2^(h-1)` leaves: a perfect subtree of `h`
//! levels plus the spur nodes that merge it with earlier massifs. All
//! functions here take a height already checked by [`validate_height`].

use crate::error::{CoreError, CoreResult};
use crate::mmr::{leaf_count, mmr_index, peaks};

/// Largest supported massif height.
pub const MAX_MASSIF_HEIGHT: u8 = 32;

/// Checks that `height` is within `1..=32`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidHeight`] otherwise.
pub fn validate_height(height: u8) -> CoreResult<()> {
    if (1..=MAX_MASSIF_HEIGHT).contains(&height) {
        Ok(())
    } else {
        Err(CoreError::InvalidHeight(height))
    }
}

/// Leaves per massif.
#[must_use]
pub fn leaves_per_massif(height: u8) -> u64 {
    1u64 << (u32::from(height.max(1)) - 1)
}

/// First leaf index of a massif.
#[must_use]
pub fn massif_first_leaf(height: u8, massif_index: u32) -> u64 {
    u64::from(massif_index) * leaves_per_massif(height)
}

/// First MMR index of a massif.
#[must_use]
pub fn massif_first_index(height: u8, massif_index: u32) -> u64 {
    mmr_index(massif_first_leaf(height, massif_index))
}

/// Last MMR index of a complete massif, spur nodes included.
#[must_use]
pub fn massif_last_index(height: u8, massif_index: u32) -> u64 {
    mmr_index(massif_first_leaf(height, massif_index) + leaves_per_massif(height)) - 1
}

/// Massif holding `mmr_index`.
///
/// Interior nodes that merge a massif with its predecessors belong to the
/// massif whose leaves precede them.
#[must_use]
pub fn massif_index_of(height: u8, mmr_index: u64) -> u32 {
    let (mut lo, mut hi) = (0u32, u32::MAX);
    while lo < hi {
        let mid = lo + (hi - lo) / 2 + 1;
        if massif_first_index(height, mid) <= mmr_index {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// Real MMR indices of the peaks of a coarse MMR in which every complete
/// massif is a single leaf.
///
/// `coarse_mmr_size` is a size in that coarse MMR. Returns an empty list for
/// sizes no MMR can have.
#[must_use]
pub fn peak_stack_indices(height: u8, coarse_mmr_size: u64) -> Vec<u64> {
    let per_massif = leaves_per_massif(height);
    peaks(coarse_mmr_size)
        .unwrap_or_default()
        .into_iter()
        .map(|coarse_peak| mmr_index(leaf_count(coarse_peak + 1) * per_massif) - 1)
        .collect()
}

/// Peak stack indices carried by massif `massif_index`.
///
/// These are the peaks of the MMR as it stood when the massif began.
#[must_use]
pub fn massif_peak_stack_indices(height: u8, massif_index: u32) -> Vec<u64> {
    peak_stack_indices(height, mmr_index(u64::from(massif_index)))
}
