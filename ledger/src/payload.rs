//! # Record Payloads
//!
//! A [`Payload`] is the application-defined body of a block: an ordered list
//! of `key -> value` entries describing one provenance event (who grew what,
//! where, for how much). The ledger core never interprets these entries; it
//! only needs to turn them into bytes the same way every single time.
//!
//! ## Canonical Encoding
//!
//! [`Payload::canonical_bytes`] produces the exact byte sequence that feeds
//! the block hash. JSON is deliberately not used here: serializer settings,
//! float formatting and key escaping all vary across versions and languages,
//! and a provenance hash must be recomputable a decade from now. The encoding
//! is a plain concatenation instead:
//!
//! ```text
//! for each entry, in insertion order:
//!     key length   (4 bytes, little-endian u32)
//!     key bytes    (UTF-8)
//!     value tag    (1 byte)
//!     value bytes  (tag-dependent, fixed layout)
//! ```
//!
//! Length prefixes keep the encoding injective: no two distinct payloads can
//! concatenate to the same byte string. Entry order is part of the identity,
//! so `{a, b}` and `{b, a}` hash differently. That is intentional: the bytes
//! a farmer's submission produced are the bytes an auditor must recompute.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value tags for the canonical encoding. Tag bytes are part of the hash
/// preimage, so they are as frozen as the genesis sentinel.
const TAG_STR: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_BOOL: u8 = 0x04;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a payload could not be canonically encoded.
///
/// A payload that fails here never reaches the chain: hashing happens before
/// any mutation, so a rejected payload leaves the ledger exactly as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    /// The same key appears twice. Last-one-wins semantics would make two
    /// different submissions hash identically, so duplicates are refused
    /// outright.
    #[error("duplicate payload key: {key}")]
    DuplicateKey { key: String },

    /// NaN or an infinity. Neither has a meaningful canonical bit pattern
    /// (NaN != NaN), and no real-world cost or quantity is non-finite.
    #[error("non-finite number under payload key: {key}")]
    NonFiniteNumber { key: String },
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single payload value. The four scalar shapes cover everything the
/// provenance forms produce; nesting is out of scope for the ledger core.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Str(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Str(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Int(value)
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        PayloadValue::Float(value)
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Str(s) => write!(f, "{s}"),
            PayloadValue::Int(i) => write!(f, "{i}"),
            PayloadValue::Float(x) => write!(f, "{x}"),
            PayloadValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Serialize for PayloadValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PayloadValue::Str(s) => serializer.serialize_str(s),
            PayloadValue::Int(i) => serializer.serialize_i64(*i),
            PayloadValue::Float(x) => serializer.serialize_f64(*x),
            PayloadValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl<'de> Deserialize<'de> for PayloadValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = PayloadValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, integer, float or boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(PayloadValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(PayloadValue::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(PayloadValue::Int)
                    .map_err(|_| E::custom("integer out of range for payload value"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(PayloadValue::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(PayloadValue::Str(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(PayloadValue::Str(v))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// An ordered collection of `key -> value` entries.
///
/// Entries keep their insertion order, and that order is load-bearing: it
/// flows into the canonical encoding and therefore into the block hash.
/// A `HashMap` would shuffle iteration order between runs and quietly break
/// hash reproducibility, which is why the backing store is a `Vec`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload {
    entries: Vec<(String, PayloadValue)>,
}

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for constructing payloads inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Appends an entry. Duplicate keys are not checked here; they surface
    /// as [`PayloadError::DuplicateKey`] when the payload is encoded.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Returns the value under `key`, if present.
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encodes the payload into the canonical byte sequence used for block
    /// hashing.
    ///
    /// The output is a deterministic function of the entries and their
    /// order. Rejects duplicate keys and non-finite floats; everything else
    /// encodes. See the module docs for the exact layout.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut out = Vec::with_capacity(self.entries.len() * 32);

        for (key, value) in &self.entries {
            if !seen.insert(key.as_str()) {
                return Err(PayloadError::DuplicateKey { key: key.clone() });
            }

            out.extend_from_slice(&(key.len() as u32).to_le_bytes());
            out.extend_from_slice(key.as_bytes());

            match value {
                PayloadValue::Str(s) => {
                    out.push(TAG_STR);
                    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
                PayloadValue::Int(i) => {
                    out.push(TAG_INT);
                    out.extend_from_slice(&i.to_le_bytes());
                }
                PayloadValue::Float(x) => {
                    if !x.is_finite() {
                        return Err(PayloadError::NonFiniteNumber { key: key.clone() });
                    }
                    // to_bits pins the exact IEEE 754 pattern; formatting a
                    // float as text would not survive round-tripping.
                    out.push(TAG_FLOAT);
                    out.extend_from_slice(&x.to_bits().to_le_bytes());
                }
                PayloadValue::Bool(b) => {
                    out.push(TAG_BOOL);
                    out.push(u8::from(*b));
                }
            }
        }

        Ok(out)
    }
}

/// Serializes as a JSON-style map, in insertion order.
impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Deserializes from a map, preserving the document's key order.
impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = Payload;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of payload entries")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, PayloadValue>()? {
                    entries.push((key, value));
                }
                Ok(Payload { entries })
            }
        }

        deserializer.deserialize_map(PayloadVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harvest_payload() -> Payload {
        Payload::new()
            .with("farmer_name", "Asha Kulkarni")
            .with("herb_type", "Tulsi")
            .with("cost_per_kg", 10.0)
            .with("organic", true)
            .with("batch", 7_i64)
    }

    #[test]
    fn canonical_bytes_are_deterministic() {
        let a = harvest_payload().canonical_bytes().unwrap();
        let b = harvest_payload().canonical_bytes().unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn entry_order_changes_the_encoding() {
        let ab = Payload::new().with("a", 1_i64).with("b", 2_i64);
        let ba = Payload::new().with("b", 2_i64).with("a", 1_i64);
        assert_ne!(
            ab.canonical_bytes().unwrap(),
            ba.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn length_prefixes_prevent_boundary_shifting() {
        // Without length prefixes these two would concatenate to the same
        // byte string.
        let left = Payload::new().with("ab", "c");
        let right = Payload::new().with("a", "bc");
        assert_ne!(
            left.canonical_bytes().unwrap(),
            right.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn single_character_change_changes_the_encoding() {
        let original = harvest_payload();
        let tampered = Payload::new()
            .with("farmer_name", "Asha Kulkarni")
            .with("herb_type", "Xulsi")
            .with("cost_per_kg", 10.0)
            .with("organic", true)
            .with("batch", 7_i64);
        assert_ne!(
            original.canonical_bytes().unwrap(),
            tampered.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let payload = Payload::new().with("herb_type", "Tulsi").with("herb_type", "Neem");
        assert_eq!(
            payload.canonical_bytes(),
            Err(PayloadError::DuplicateKey {
                key: "herb_type".to_string()
            })
        );
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let payload = Payload::new().with("cost_per_kg", bad);
            assert!(matches!(
                payload.canonical_bytes(),
                Err(PayloadError::NonFiniteNumber { .. })
            ));
        }
    }

    #[test]
    fn float_encoding_is_bit_exact() {
        // 10.0 and 10.000000000000002 differ by one ULP-ish nudge and must
        // not encode identically.
        let a = Payload::new().with("cost_per_kg", 10.0);
        let b = Payload::new().with("cost_per_kg", 10.000000000000002);
        assert_ne!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn get_returns_first_match() {
        let payload = harvest_payload();
        assert_eq!(
            payload.get("herb_type"),
            Some(&PayloadValue::Str("Tulsi".to_string()))
        );
        assert_eq!(payload.get("missing"), None);
        assert_eq!(payload.len(), 5);
    }

    #[test]
    fn json_round_trip_preserves_entry_order() {
        let payload = harvest_payload();
        let json = serde_json::to_string(&payload).unwrap();

        // serde_json emits map entries in the order we serialize them.
        let farmer_pos = json.find("farmer_name").unwrap();
        let herb_pos = json.find("herb_type").unwrap();
        let batch_pos = json.find("batch").unwrap();
        assert!(farmer_pos < herb_pos && herb_pos < batch_pos);

        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(
            back.canonical_bytes().unwrap(),
            payload.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn value_conversions_cover_the_scalar_shapes() {
        assert_eq!(PayloadValue::from("x"), PayloadValue::Str("x".to_string()));
        assert_eq!(PayloadValue::from(3_i64), PayloadValue::Int(3));
        assert_eq!(PayloadValue::from(2.5), PayloadValue::Float(2.5));
        assert_eq!(PayloadValue::from(false), PayloadValue::Bool(false));
    }
}
