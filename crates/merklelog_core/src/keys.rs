//! Entry key derivation: trie keys and versioned leaf hashes.

use crate::error::{CoreError, CoreResult};
use crate::massif::EXTRA_BYTES_SIZE;
use crate::mmr::Hash;
use sha2::{Digest, Sha256};
use std::fmt;

/// How an entry payload is prepared before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Domain {
    /// Payload bytes are hashed exactly as given.
    Serialized = 0,
    /// Payload is CBOR and is re-encoded canonically before hashing.
    CanonicalCbor = 1,
}

impl Domain {
    /// Parses a domain byte.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownDomain`] for unassigned values.
    pub fn from_byte(byte: u8) -> CoreResult<Self> {
        match byte {
            0 => Ok(Self::Serialized),
            1 => Ok(Self::CanonicalCbor),
            other => Err(CoreError::UnknownDomain(other)),
        }
    }

    /// The domain byte.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialized => write!(f, "serialized"),
            Self::CanonicalCbor => write!(f, "canonical-cbor"),
        }
    }
}

/// Content-addressed trie key: `SHA256(domain || log_id || app_id)`.
///
/// Inputs are used verbatim.
#[must_use]
pub fn trie_key(domain: u8, log_id: &[u8], app_id: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([domain]);
    hasher.update(log_id);
    hasher.update(app_id);
    hasher.finalize().into()
}

/// Right-pads extra bytes to the fixed field width.
///
/// # Errors
///
/// Returns [`CoreError::ExtraBytesTooLong`] for more than 24 bytes.
pub fn pad_extra_bytes(extra_bytes: &[u8]) -> CoreResult<[u8; EXTRA_BYTES_SIZE]> {
    if extra_bytes.len() > EXTRA_BYTES_SIZE {
        return Err(CoreError::ExtraBytesTooLong {
            len: extra_bytes.len(),
        });
    }
    let mut out = [0u8; EXTRA_BYTES_SIZE];
    out[..extra_bytes.len()].copy_from_slice(extra_bytes);
    Ok(out)
}

/// Version 1 leaf hash:
/// `SHA256(domain || extra_bytes_24 || idtimestamp_be8 || payload)`.
///
/// # Errors
///
/// Returns [`CoreError::ExtraBytesTooLong`] for oversized extra bytes, or a
/// codec error when a canonical-CBOR payload does not decode.
pub fn leaf_hash_v1(
    domain: Domain,
    extra_bytes: &[u8],
    idtimestamp: u64,
    payload: &[u8],
) -> CoreResult<Hash> {
    let extra = pad_extra_bytes(extra_bytes)?;
    let mut hasher = Sha256::new();
    hasher.update([domain.as_byte()]);
    hasher.update(extra);
    hasher.update(idtimestamp.to_be_bytes());
    match domain {
        Domain::Serialized => hasher.update(payload),
        Domain::CanonicalCbor => hasher.update(merklelog_codec::canonicalize(payload)?),
    }
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trie_key_is_plain_concatenation() {
        let mut hasher = Sha256::new();
        hasher.update([0u8, b'l', b'o', b'g', b'a', b'p', b'p']);
        let expected: Hash = hasher.finalize().into();
        assert_eq!(trie_key(0, b"log", b"app"), expected);
        assert_ne!(trie_key(1, b"log", b"app"), expected);
        // no normalization of app ids
        assert_ne!(trie_key(0, b"log", b"App"), expected);
    }

    #[test]
    fn leaf_hash_is_deterministic() {
        let a = leaf_hash_v1(Domain::Serialized, b"x", 5, b"payload").unwrap();
        let b = leaf_hash_v1(Domain::Serialized, b"x", 5, b"payload").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn leaf_hash_inputs_are_distinct() {
        let base = leaf_hash_v1(Domain::Serialized, b"x", 5, b"payload").unwrap();
        assert_ne!(base, leaf_hash_v1(Domain::Serialized, b"y", 5, b"payload").unwrap());
        assert_ne!(base, leaf_hash_v1(Domain::Serialized, b"x", 6, b"payload").unwrap());
        assert_ne!(base, leaf_hash_v1(Domain::Serialized, b"x", 5, b"payloae").unwrap());
    }

    #[test]
    fn short_extra_bytes_are_zero_padded() {
        let short = leaf_hash_v1(Domain::Serialized, b"ab", 1, b"p").unwrap();
        let mut padded = [0u8; 24];
        padded[..2].copy_from_slice(b"ab");
        assert_eq!(short, leaf_hash_v1(Domain::Serialized, &padded, 1, b"p").unwrap());
    }

    #[test]
    fn long_extra_bytes_rejected() {
        let err = leaf_hash_v1(Domain::Serialized, &[0u8; 25], 1, b"p").unwrap_err();
        assert!(matches!(err, CoreError::ExtraBytesTooLong { len: 25 }));
    }

    #[test]
    fn canonical_domain_ignores_encoding_differences() {
        // {"b": 1, "a": 2} and {"a": 2, "b": 1}
        let unsorted = [0xa2, 0x61, b'b', 0x01, 0x61, b'a', 0x02];
        let sorted = [0xa2, 0x61, b'a', 0x02, 0x61, b'b', 0x01];
        let h1 = leaf_hash_v1(Domain::CanonicalCbor, b"", 9, &unsorted).unwrap();
        let h2 = leaf_hash_v1(Domain::CanonicalCbor, b"", 9, &sorted).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, leaf_hash_v1(Domain::Serialized, b"", 9, &sorted).unwrap());
    }

    #[test]
    fn canonical_domain_rejects_non_cbor() {
        assert!(matches!(
            leaf_hash_v1(Domain::CanonicalCbor, b"", 9, &[0xff]),
            Err(CoreError::Codec(_))
        ));
    }

    #[test]
    fn domain_bytes() {
        assert_eq!(Domain::from_byte(1).unwrap(), Domain::CanonicalCbor);
        assert!(Domain::from_byte(2).is_err());
        assert_eq!(Domain::Serialized.as_byte(), 0);
    }
}
