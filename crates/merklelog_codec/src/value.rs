//! Dynamic CBOR value type.

use std::cmp::Ordering;

/// A dynamic CBOR value.
///
/// Covers the subset of CBOR used by merklelog: checkpoint seals, COSE
/// envelopes and application entry payloads. Floats are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs.
    Map(Vec<(Value, Value)>),
    /// Tagged item (major type 6), e.g. tag 18 for COSE_Sign1.
    Tag(u64, Box<Value>),
}

impl Value {
    /// Create a map value with keys in canonical order.
    pub fn map(mut pairs: Vec<(Value, Value)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
        Value::Map(pairs)
    }

    /// Create a tagged value.
    pub fn tagged(tag: u64, inner: Value) -> Self {
        Value::Tag(tag, Box::new(inner))
    }

    /// Compare two values for map key ordering.
    ///
    /// Values of different major types order by major type; within a type
    /// the order matches the canonical length-first, bytewise rule. The
    /// encoder sorts by the encoded bytes regardless.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        let self_type = self.major_type();
        let other_type = other.major_type();

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) if self_type == other_type => {
                Self::cmp_unsigned_canonical(integer_argument(*a), integer_argument(*b))
            }
            (Value::Bytes(a), Value::Bytes(b)) => cmp_len_then_bytes(a, b),
            (Value::Text(a), Value::Text(b)) => cmp_len_then_bytes(a.as_bytes(), b.as_bytes()),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, Value::Bool(_)) => Ordering::Greater,
            (Value::Bool(_), Value::Null) => Ordering::Less,
            (Value::Array(a), Value::Array(b)) => a
                .len()
                .cmp(&b.len())
                .then_with(|| cmp_elementwise(a.iter(), b.iter())),
            (Value::Map(a), Value::Map(b)) => a.len().cmp(&b.len()).then_with(|| {
                cmp_elementwise(
                    a.iter().flat_map(|(k, v)| [k, v]),
                    b.iter().flat_map(|(k, v)| [k, v]),
                )
            }),
            (Value::Tag(ta, a), Value::Tag(tb, b)) => {
                Self::cmp_unsigned_canonical(*ta, *tb).then_with(|| a.cmp_canonical(b))
            }
            _ => self_type.cmp(&other_type),
        }
    }

    fn cmp_unsigned_canonical(a: u64, b: u64) -> Ordering {
        Self::cbor_uint_encoded_len(a)
            .cmp(&Self::cbor_uint_encoded_len(b))
            .then(a.cmp(&b))
    }

    /// Returns the encoded length (in bytes) of a CBOR head carrying `n`.
    fn cbor_uint_encoded_len(n: u64) -> usize {
        if n <= 23 {
            1
        } else if n <= 0xFF {
            2
        } else if n <= 0xFFFF {
            3
        } else if n <= 0xFFFF_FFFF {
            5
        } else {
            9
        }
    }

    fn major_type(&self) -> u8 {
        match self {
            Value::Integer(n) if *n >= 0 => 0,
            Value::Integer(_) => 1,
            Value::Bytes(_) => 2,
            Value::Text(_) => 3,
            Value::Array(_) => 4,
            Value::Map(_) => 5,
            Value::Tag(..) => 6,
            Value::Bool(_) | Value::Null => 7,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Strip a tag, returning the tag number and inner value.
    pub fn as_tag(&self) -> Option<(u64, &Value)> {
        match self {
            Value::Tag(tag, inner) => Some((*tag, inner)),
            _ => None,
        }
    }

    /// Look up a text key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    /// Look up an integer key in this map value (COSE header labels).
    pub fn get_label(&self, label: i64) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_integer() == Some(label))
            .map(|(_, v)| v)
    }
}

#[allow(clippy::cast_sign_loss)]
fn integer_argument(n: i64) -> u64 {
    if n >= 0 {
        n as u64
    } else {
        (-1 - n) as u64
    }
}

fn cmp_len_then_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_elementwise<'a>(
    a: impl Iterator<Item = &'a Value>,
    b: impl Iterator<Item = &'a Value>,
) -> Ordering {
    for (x, y) in a.zip(b) {
        let ord = x.cmp_canonical(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keys_are_sorted() {
        let map = Value::map(vec![
            (Value::from("mmrSize"), Value::Integer(1)),
            (Value::from("peaks"), Value::Integer(2)),
            (Value::from("a"), Value::Integer(3)),
        ]);
        let keys: Vec<_> = map
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_text().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "peaks", "mmrSize"]);
    }

    #[test]
    fn integer_keys_sort_before_text() {
        let map = Value::map(vec![
            (Value::from("x"), Value::Null),
            (Value::Integer(-8), Value::Null),
            (Value::Integer(1), Value::Null),
        ]);
        let keys: Vec<_> = map.as_map().unwrap().iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(
            keys,
            vec![Value::Integer(1), Value::Integer(-8), Value::from("x")]
        );
    }

    #[test]
    fn label_lookup() {
        let map = Value::map(vec![(Value::Integer(1), Value::Integer(-8))]);
        assert_eq!(map.get_label(1), Some(&Value::Integer(-8)));
        assert_eq!(map.get_label(4), None);
        assert_eq!(map.get("1"), None);
    }

    #[test]
    fn tag_accessor() {
        let v = Value::tagged(18, Value::Array(vec![]));
        let (tag, inner) = v.as_tag().unwrap();
        assert_eq!(tag, 18);
        assert_eq!(inner.as_array().unwrap().len(), 0);
    }
}
