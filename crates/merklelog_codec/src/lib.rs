//! # merklelog codec
//!
//! Canonical CBOR for merklelog.
//!
//! Two things in merklelog are hashed or signed over CBOR bytes and so need a
//! deterministic encoding:
//! - checkpoint seals (a COSE_Sign1 envelope around a checkpoint map)
//! - application entries in the canonical-CBOR domain, which are
//!   re-serialized before their leaf hash is derived
//!
//! ## Canonical rules
//!
//! - Map keys sorted by encoded form (length-first, then bytewise)
//! - Shortest integer and length heads
//! - Definite lengths only, no floats
//!
//! ## Usage
//!
//! ```
//! use merklelog_codec::{canonicalize, from_cbor, to_canonical_cbor, Value};
//!
//! let value = Value::map(vec![(Value::from("mmrSize"), Value::Integer(7))]);
//! let bytes = to_canonical_cbor(&value).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), value);
//! assert_eq!(canonicalize(&bytes).unwrap(), bytes);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{canonicalize, from_cbor, from_cbor_lenient, CborDecoder, DecodeMode};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;
