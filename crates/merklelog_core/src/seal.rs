//! Signed checkpoints ("seals").
//!
//! A seal is a COSE_Sign1 structure: CBOR tag 18 around
//! `[protected, unprotected, payload, signature]`. The payload is a
//! canonical CBOR checkpoint map; the signature covers the standard
//! `["Signature1", protected, b"", payload]` structure. Ed25519 is the only
//! algorithm (COSE alg -8).

use crate::error::{CoreError, CoreResult};
use crate::mmr::Hash;
use crate::verify::MmrState;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use merklelog_codec::{from_cbor_lenient, to_canonical_cbor, Value};

/// CBOR tag of COSE_Sign1.
pub const COSE_SIGN1_TAG: u64 = 18;
/// COSE algorithm identifier for EdDSA.
pub const COSE_ALG_EDDSA: i64 = -8;
const COSE_HEADER_ALG: i64 = 1;

const KEY_MMR_SIZE: &str = "mmrSize";
const KEY_PEAKS: &str = "peaks";
const KEY_EPOCH: &str = "commitmentEpoch";
const KEY_TIMESTAMP: &str = "timestamp";
const KEY_IDTIMESTAMP: &str = "idtimestamp";

/// The state a seal attests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// MMR size at sealing time.
    pub mmr_size: u64,
    /// Peaks of the MMR at `mmr_size`, left to right.
    pub peaks: Vec<Hash>,
    /// Commitment epoch of `last_idtimestamp`.
    pub commitment_epoch: u32,
    /// Unix milliseconds when the seal was made.
    pub timestamp_ms: u64,
    /// Idtimestamp of the last leaf covered.
    pub last_idtimestamp: u64,
}

fn int(value: u64, field: &str) -> CoreResult<Value> {
    i64::try_from(value)
        .map(Value::Integer)
        .map_err(|_| CoreError::invalid_format(format!("{field} does not fit in a CBOR integer")))
}

fn field_u64(map: &Value, key: &str) -> CoreResult<u64> {
    map.get(key)
        .and_then(Value::as_integer)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| CoreError::invalid_format(format!("checkpoint {key} missing or invalid")))
}

impl Checkpoint {
    /// Canonical CBOR encoding of the checkpoint map.
    ///
    /// # Errors
    ///
    /// Returns an error if a field does not fit in a CBOR integer.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let map = Value::map(vec![
            (Value::from(KEY_MMR_SIZE), int(self.mmr_size, KEY_MMR_SIZE)?),
            (
                Value::from(KEY_PEAKS),
                Value::Array(self.peaks.iter().map(|p| Value::from(&p[..])).collect()),
            ),
            (Value::from(KEY_EPOCH), Value::from(self.commitment_epoch)),
            (Value::from(KEY_TIMESTAMP), int(self.timestamp_ms, KEY_TIMESTAMP)?),
            (
                Value::from(KEY_IDTIMESTAMP),
                Value::from(self.last_idtimestamp.to_be_bytes().to_vec()),
            ),
        ]);
        Ok(to_canonical_cbor(&map)?)
    }

    /// Decodes a checkpoint map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] for missing or mistyped fields.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let map = from_cbor_lenient(bytes)?;
        let peaks = map
            .get(KEY_PEAKS)
            .and_then(Value::as_array)
            .ok_or_else(|| CoreError::invalid_format("checkpoint peaks missing"))?
            .iter()
            .map(|p| {
                p.as_bytes()
                    .and_then(|b| <Hash>::try_from(b).ok())
                    .ok_or_else(|| CoreError::invalid_format("checkpoint peak is not 32 bytes"))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        let commitment_epoch = u32::try_from(field_u64(&map, KEY_EPOCH)?)
            .map_err(|_| CoreError::invalid_format("checkpoint epoch out of range"))?;
        let last_idtimestamp = map
            .get(KEY_IDTIMESTAMP)
            .and_then(Value::as_bytes)
            .and_then(|b| <[u8; 8]>::try_from(b).ok())
            .map(u64::from_be_bytes)
            .ok_or_else(|| CoreError::invalid_format("checkpoint idtimestamp missing or invalid"))?;
        Ok(Self {
            mmr_size: field_u64(&map, KEY_MMR_SIZE)?,
            peaks,
            commitment_epoch,
            timestamp_ms: field_u64(&map, KEY_TIMESTAMP)?,
            last_idtimestamp,
        })
    }
}

/// A decoded seal, keeping the exact signed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seal {
    checkpoint: Checkpoint,
    protected: Vec<u8>,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

fn protected_header() -> CoreResult<Vec<u8>> {
    Ok(to_canonical_cbor(&Value::map(vec![(
        Value::Integer(COSE_HEADER_ALG),
        Value::Integer(COSE_ALG_EDDSA),
    )]))?)
}

fn signature_input(protected: &[u8], payload: &[u8]) -> CoreResult<Vec<u8>> {
    Ok(to_canonical_cbor(&Value::Array(vec![
        Value::from("Signature1"),
        Value::from(protected),
        Value::Bytes(Vec::new()),
        Value::from(payload),
    ]))?)
}

impl Seal {
    /// Decodes a COSE_Sign1 seal.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the envelope or checkpoint is
    /// malformed, or if the protected header names another algorithm.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let envelope = from_cbor_lenient(bytes)?;
        let (tag, inner) = envelope
            .as_tag()
            .ok_or_else(|| CoreError::invalid_format("seal is not tagged"))?;
        if tag != COSE_SIGN1_TAG {
            return Err(CoreError::invalid_format(format!("seal tag {tag}, expected 18")));
        }
        let parts = inner
            .as_array()
            .filter(|a| a.len() == 4)
            .ok_or_else(|| CoreError::invalid_format("seal must be a 4-element array"))?;
        let bstr = |v: &Value, what: &str| {
            v.as_bytes()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| CoreError::invalid_format(format!("seal {what} is not a byte string")))
        };
        let protected = bstr(&parts[0], "protected header")?;
        let payload = bstr(&parts[2], "payload")?;
        let signature = bstr(&parts[3], "signature")?;

        let alg = from_cbor_lenient(&protected)?
            .get_label(COSE_HEADER_ALG)
            .and_then(Value::as_integer);
        if alg != Some(COSE_ALG_EDDSA) {
            return Err(CoreError::invalid_format("seal algorithm is not EdDSA"));
        }

        Ok(Self {
            checkpoint: Checkpoint::decode(&payload)?,
            protected,
            payload,
            signature,
        })
    }

    /// Encodes the seal as tagged COSE_Sign1.
    ///
    /// # Errors
    ///
    /// Returns an error only if CBOR encoding fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_canonical_cbor(&Value::tagged(
            COSE_SIGN1_TAG,
            Value::Array(vec![
                Value::from(self.protected.as_slice()),
                Value::Map(Vec::new()),
                Value::from(self.payload.as_slice()),
                Value::from(self.signature.as_slice()),
            ]),
        ))?)
    }

    /// The attested checkpoint.
    #[must_use]
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// The attested MMR state.
    #[must_use]
    pub fn state(&self) -> MmrState {
        MmrState {
            mmr_size: self.checkpoint.mmr_size,
            peaks: self.checkpoint.peaks.clone(),
        }
    }

    /// Raw signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Bytes the signature covers.
    ///
    /// # Errors
    ///
    /// Returns an error only if CBOR encoding fails.
    pub fn signed_bytes(&self) -> CoreResult<Vec<u8>> {
        signature_input(&self.protected, &self.payload)
    }
}

/// Checks seal signatures against a trusted public key.
pub trait SealVerifier: Send + Sync {
    /// Returns true if `seal` was signed by `key`.
    fn verify(&self, seal: &Seal, key: &[u8]) -> bool;
}

/// Ed25519 seal verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519SealVerifier;

impl SealVerifier for Ed25519SealVerifier {
    fn verify(&self, seal: &Seal, key: &[u8]) -> bool {
        let Ok(key) = <[u8; 32]>::try_from(key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key) else {
            return false;
        };
        let Ok(signature) = <[u8; 64]>::try_from(seal.signature()) else {
            return false;
        };
        let Ok(message) = seal.signed_bytes() else {
            return false;
        };
        verifying_key
            .verify(&message, &Signature::from_bytes(&signature))
            .is_ok()
    }
}

/// Produces seals; used by log writers and test fixtures.
pub struct SealSigner {
    signing_key: SigningKey,
}

impl SealSigner {
    /// Creates a signer from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Creates a signer with a random key.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// The public key seals verify against.
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Signs a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be encoded.
    pub fn sign(&self, checkpoint: &Checkpoint) -> CoreResult<Seal> {
        let protected = protected_header()?;
        let payload = checkpoint.encode()?;
        let signature = self
            .signing_key
            .sign(&signature_input(&protected, &payload)?)
            .to_bytes()
            .to_vec();
        Ok(Seal {
            checkpoint: checkpoint.clone(),
            protected,
            payload,
            signature,
        })
    }
}

/// Parses a hex-encoded Ed25519 public key.
///
/// # Errors
///
/// Returns [`CoreError::InvalidHex`] or [`CoreError::InvalidKey`].
pub fn parse_public_key(text: &str) -> CoreResult<[u8; 32]> {
    let bytes = hex::decode(text.trim()).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
    let key = <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| CoreError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&key).map_err(|e| CoreError::InvalidKey(e.to_string()))?;
    Ok(key)
}
