//! Inclusion and consistency verification against massif proof material.
//!
//! Every function here is stateless: the result depends only on the massif,
//! seal and trusted state passed in.

use crate::error::{CoreError, CoreResult};
use crate::massif::Massif;
use crate::mmr::{self, Hash};
use crate::seal::{Seal, SealVerifier};
use tracing::debug;

/// An MMR size with its peak list (the accumulator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmrState {
    /// MMR size.
    pub mmr_size: u64,
    /// Peaks at `mmr_size`, left to right.
    pub peaks: Vec<Hash>,
}

/// A trusted key paired with the verifier that checks it.
#[derive(Clone, Copy)]
pub struct TrustedSealer<'a> {
    /// Signature verifier.
    pub verifier: &'a dyn SealVerifier,
    /// Public key seals must verify against.
    pub key: &'a [u8],
}

/// Inclusion proof for `mmr_index` in the MMR at `mmr_size`, read from
/// `massif`.
///
/// # Errors
///
/// Returns [`CoreError::IndexOutOfRange`] unless
/// `mmr_index < mmr_size <= massif.mmr_size()`, or
/// [`CoreError::NodeUnavailable`] if a sibling lives in another massif.
pub fn prove_inclusion(massif: &Massif, mmr_size: u64, mmr_index: u64) -> CoreResult<Vec<Hash>> {
    if mmr_size > massif.mmr_size() {
        return Err(CoreError::IndexOutOfRange {
            index: mmr_size,
            size: massif.mmr_size(),
        });
    }
    mmr::inclusion_proof(massif, mmr_size, mmr_index)
}

/// Verifies an inclusion proof against the accumulator for `mmr_size`.
#[must_use]
pub fn verify_inclusion(
    mmr_size: u64,
    leaf_hash: &Hash,
    mmr_index: u64,
    proof: &[Hash],
    accumulator: &[Hash],
) -> bool {
    mmr::verify_inclusion(mmr_size, leaf_hash, mmr_index, proof, accumulator)
}

/// Checks that the state `(size_a, peaks_a)` is a prefix of `massif_b`.
///
/// Returns whether every peak of `size_a` is included in the accumulator at
/// `massif_b.mmr_size()`, together with that accumulator.
///
/// # Errors
///
/// Returns an error if `size_a` is invalid or larger than the massif, or if
/// proof material is not held by the massif.
pub fn verify_consistency(
    massif_b: &Massif,
    size_a: u64,
    peaks_a: &[Hash],
) -> CoreResult<(bool, Vec<Hash>)> {
    verify_consistency_at(massif_b, massif_b.mmr_size(), size_a, peaks_a)
}

fn verify_consistency_at(
    massif: &Massif,
    size_b: u64,
    size_a: u64,
    peaks_a: &[Hash],
) -> CoreResult<(bool, Vec<Hash>)> {
    let peaks_b = massif.peaks_at(size_b)?;
    let proof = mmr::consistency_proof(massif, size_a, size_b)?;
    let ok = mmr::verify_consistency_proof(size_a, size_b, peaks_a, &peaks_b, &proof);
    Ok((ok, peaks_b))
}

/// Verifies a massif against its seal and, optionally, a trusted state.
///
/// Checks, in order:
/// 1. the seal signature, when a trusted sealer is given
/// 2. the sealed size lies in `(first_index, massif.mmr_size()]`
/// 3. the peaks computed from massif data at the sealed size equal the
///    sealed peaks
/// 4. the trusted state is consistent with the massif: a prefix of the
///    sealed state when it is no larger, otherwise reproduced exactly by
///    the massif data
///
/// Returns the sealed state on success.
///
/// # Errors
///
/// Returns the first failed check as [`CoreError::SealSignature`],
/// [`CoreError::SealOutOfRange`], [`CoreError::SealRootMismatch`] or
/// [`CoreError::ConsistencyFailed`].
pub fn verify_massif(
    massif: &Massif,
    seal: &Seal,
    trusted_base: Option<&MmrState>,
    sealer: Option<TrustedSealer<'_>>,
) -> CoreResult<MmrState> {
    let massif_index = massif.massif_index();

    if let Some(sealer) = sealer {
        if !sealer.verifier.verify(seal, sealer.key) {
            return Err(CoreError::SealSignature { massif_index });
        }
    }

    let sealed = seal.state();
    let first_index = massif.first_index();
    if sealed.mmr_size <= first_index || sealed.mmr_size > massif.mmr_size() {
        return Err(CoreError::SealOutOfRange {
            massif_index,
            mmr_size: sealed.mmr_size,
            first_index,
            massif_size: massif.mmr_size(),
        });
    }

    let computed = massif
        .peaks_at(sealed.mmr_size)
        .map_err(|_| CoreError::SealRootMismatch {
            massif_index,
            mmr_size: sealed.mmr_size,
        })?;
    if computed != sealed.peaks {
        return Err(CoreError::SealRootMismatch {
            massif_index,
            mmr_size: sealed.mmr_size,
        });
    }

    if let Some(base) = trusted_base {
        let inconsistent = |to_size| CoreError::ConsistencyFailed {
            massif_index,
            from_size: base.mmr_size,
            to_size,
        };
        if base.mmr_size <= sealed.mmr_size {
            let (ok, _) = verify_consistency_at(massif, sealed.mmr_size, base.mmr_size, &base.peaks)
                .map_err(|_| inconsistent(sealed.mmr_size))?;
            if !ok {
                return Err(inconsistent(sealed.mmr_size));
            }
        } else {
            let reproduced = massif
                .peaks_at(base.mmr_size)
                .map_err(|_| inconsistent(massif.mmr_size()))?;
            if reproduced != base.peaks {
                return Err(inconsistent(massif.mmr_size()));
            }
        }
    }

    debug!(
        massif_index,
        mmr_size = sealed.mmr_size,
        base = ?trusted_base.map(|b| b.mmr_size),
        "massif verified"
    );
    Ok(sealed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::massif::Massif;
    use crate::mmr::{add_hashed_leaf, NodeSource};
    use crate::seal::{Checkpoint, Ed25519SealVerifier, SealSigner};

    fn leaf(n: u64) -> Hash {
        let mut h = [0u8; 32];
        h[..8].copy_from_slice(&n.to_be_bytes());
        h
    }

    /// Two height-3 massifs (4 leaves each); the second only partly filled.
    fn massifs(second_leaves: u64) -> (Massif, Massif) {
        let mut m0 = Massif::new(3, 0, 0).unwrap();
        for n in 0..4 {
            add_hashed_leaf(&mut m0, leaf(n)).unwrap();
        }
        let mut m1 = Massif::new(3, 1, 0).unwrap();
        m1.set_peak_stack(&[m0.node(6).unwrap()]).unwrap();
        for n in 4..4 + second_leaves {
            add_hashed_leaf(&mut m1, leaf(n)).unwrap();
        }
        (m0, m1)
    }

    fn seal_for(signer: &SealSigner, massif: &Massif, mmr_size: u64) -> Seal {
        signer
            .sign(&Checkpoint {
                mmr_size,
                peaks: massif.peaks_at(mmr_size).unwrap(),
                commitment_epoch: 0,
                timestamp_ms: 0,
                last_idtimestamp: 0,
            })
            .unwrap()
    }

    #[test]
    fn inclusion_within_massif() {
        let (_, m1) = massifs(4);
        let size = m1.mmr_size();
        let acc = m1.peaks_at(size).unwrap();
        for index in m1.first_index()..size {
            let proof = prove_inclusion(&m1, size, index).unwrap();
            assert!(verify_inclusion(size, &m1.node(index).unwrap(), index, &proof, &acc));
        }
        assert!(prove_inclusion(&m1, size + 1, 0).is_err());
    }

    #[test]
    fn consistency_from_previous_massif() {
        let (m0, m1) = massifs(3);
        let peaks_a = m0.peaks_at(7).unwrap();
        let (ok, peaks_b) = verify_consistency(&m1, 7, &peaks_a).unwrap();
        assert!(ok);
        assert_eq!(peaks_b, m1.peaks_at(m1.mmr_size()).unwrap());

        let (ok, _) = verify_consistency(&m1, 7, &[[0u8; 32]]).unwrap();
        assert!(!ok);
    }

    #[test]
    fn massif_verifies_with_key_and_base() {
        let signer = SealSigner::from_seed([2u8; 32]);
        let (m0, m1) = massifs(4);
        let seal = seal_for(&signer, &m1, m1.mmr_size());
        let key = signer.public_key();
        let sealer = TrustedSealer {
            verifier: &Ed25519SealVerifier,
            key: &key,
        };
        let base = MmrState {
            mmr_size: 7,
            peaks: m0.peaks_at(7).unwrap(),
        };
        let state = verify_massif(&m1, &seal, Some(&base), Some(sealer)).unwrap();
        assert_eq!(state.mmr_size, m1.mmr_size());
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let (_, m1) = massifs(4);
        let seal = seal_for(&SealSigner::from_seed([2u8; 32]), &m1, m1.mmr_size());
        let other = SealSigner::from_seed([3u8; 32]).public_key();
        let sealer = TrustedSealer {
            verifier: &Ed25519SealVerifier,
            key: &other,
        };
        assert!(matches!(
            verify_massif(&m1, &seal, None, Some(sealer)),
            Err(CoreError::SealSignature { massif_index: 1 })
        ));
    }

    #[test]
    fn seal_range_is_checked() {
        let signer = SealSigner::from_seed([2u8; 32]);
        let (m0, m1) = massifs(1);
        // a seal for massif 0 presented with massif 1
        let seal = seal_for(&signer, &m0, 7);
        assert!(matches!(
            verify_massif(&m1, &seal, None, None),
            Err(CoreError::SealOutOfRange { .. })
        ));
    }

    #[test]
    fn seal_peaks_must_match_data() {
        let signer = SealSigner::from_seed([2u8; 32]);
        let (_, m1) = massifs(2);
        let seal = signer
            .sign(&Checkpoint {
                mmr_size: m1.mmr_size(),
                peaks: vec![[9u8; 32]; 2],
                commitment_epoch: 0,
                timestamp_ms: 0,
                last_idtimestamp: 0,
            })
            .unwrap();
        assert!(matches!(
            verify_massif(&m1, &seal, None, None),
            Err(CoreError::SealRootMismatch { .. })
        ));
    }

    #[test]
    fn forked_base_is_rejected() {
        let signer = SealSigner::from_seed([2u8; 32]);
        let (_, m1) = massifs(4);
        let seal = seal_for(&signer, &m1, m1.mmr_size());
        let forked = MmrState {
            mmr_size: 7,
            peaks: vec![[0xaa; 32]],
        };
        assert!(matches!(
            verify_massif(&m1, &seal, Some(&forked), None),
            Err(CoreError::ConsistencyFailed { from_size: 7, .. })
        ));
    }

    #[test]
    fn base_beyond_seal_must_be_reproduced() {
        let signer = SealSigner::from_seed([2u8; 32]);
        let (_, m1) = massifs(4);
        // seal lags behind the data the base already covers
        let sealed_size = 8;
        let seal = seal_for(&signer, &m1, sealed_size);
        let base = MmrState {
            mmr_size: m1.mmr_size(),
            peaks: m1.peaks_at(m1.mmr_size()).unwrap(),
        };
        assert!(verify_massif(&m1, &seal, Some(&base), None).is_ok());

        let wrong = MmrState {
            mmr_size: m1.mmr_size(),
            peaks: vec![[1u8; 32]],
        };
        assert!(verify_massif(&m1, &seal, Some(&wrong), None).is_err());
    }
}
