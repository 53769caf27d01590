//! 32-byte Keccak-256 digests and canonical structural hashing.
//!
//! Every commitment in the chain (state roots, transaction roots, block
//! identities, signing payloads) goes through [`canonical_hash`]: the value is
//! serialized to JSON, the serialized bytes are sorted, and the sorted bytes
//! are digested. Sorting makes the digest a pure function of the value's
//! *structure* - two values with the same fields in a different order always
//! hash identically.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest as _, Keccak256};
use std::fmt;
use thiserror::Error;

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Fixed-size 32-byte Keccak-256 digest.
///
/// `Copy` because digests are compared and passed constantly during block
/// validation. `Ord` compares big-endian bytes, which matches the numeric
/// ordering of the hex rendering - exactly what the proof-of-work target
/// comparison needs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

/// Error produced when parsing a digest from a hex string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid digest: expected {expected} hex characters", expected = DIGEST_LEN * 2)]
pub struct ParseDigestError;

impl Digest {
    /// The all-zero digest, used as a fixed placeholder in the genesis header.
    pub fn zero() -> Digest {
        Digest([0u8; DIGEST_LEN])
    }

    /// The all-`ff` digest - the loosest possible proof-of-work target.
    pub fn max() -> Digest {
        Digest([0xffu8; DIGEST_LEN])
    }

    /// Returns the digest as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parses a digest from its 64-character lowercase hex rendering.
    pub fn from_hex(s: &str) -> Result<Digest, ParseDigestError> {
        let bytes = hex::decode(s).map_err(|_| ParseDigestError)?;
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| ParseDigestError)?;
        Ok(Digest(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(D::Error::custom)
    }
}

/// Computes the Keccak-256 digest of raw bytes.
pub fn keccak(bytes: &[u8]) -> Digest {
    Digest(Keccak256::digest(bytes).into())
}

/// Computes the canonical structural hash of any serializable value.
///
/// The value is serialized to JSON, the serialized bytes are sorted, and the
/// result is digested with Keccak-256. Structurally equal values hash
/// identically regardless of field order; the digest is stable across process
/// runs. Side-effect free.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> Digest {
    let mut serialized = to_canonical_bytes(value);
    serialized.sort_unstable();
    keccak(&serialized)
}

/// Serializes a value to its JSON wire bytes.
///
/// Every hashed type in this crate derives `Serialize` with string map keys
/// and no non-finite floats, so serialization cannot fail.
pub(crate) fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("crate value types serialize infallibly")
}

/// Converts a value into a JSON tree for storage in a trie.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).expect("crate value types serialize infallibly")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_structures_hash_identically_regardless_of_field_order() {
        let first = json!({ "foo": "foo", "bar": "bar" });
        let second = json!({ "bar": "bar", "foo": "foo" });
        assert_eq!(canonical_hash(&first), canonical_hash(&second));
    }

    #[test]
    fn different_structures_hash_differently() {
        let first = json!({ "foo": "foo" });
        let second = json!({ "bar": "bar" });
        assert_ne!(canonical_hash(&first), canonical_hash(&second));
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let value = json!({ "balance": 1000, "address": "abc" });
        assert_eq!(canonical_hash(&value), canonical_hash(&value));
    }

    #[test]
    fn display_renders_fixed_width_hex() {
        let rendered = canonical_hash(&"payload").to_string();
        assert_eq!(rendered.len(), DIGEST_LEN * 2);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn from_hex_roundtrip() {
        let digest = canonical_hash(&42u64);
        let parsed = Digest::from_hex(&digest.to_string()).expect("parse");
        assert_eq!(parsed, digest);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert_eq!(Digest::from_hex("zz"), Err(ParseDigestError));
        assert_eq!(Digest::from_hex("abcd"), Err(ParseDigestError));
    }

    #[test]
    fn serde_roundtrip_through_hex_string() {
        let digest = canonical_hash(&"roundtrip");
        let encoded = serde_json::to_string(&digest).expect("serialize");
        let decoded: Digest = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, digest);
    }

    #[test]
    fn ordering_matches_hex_ordering() {
        let small = Digest::zero();
        let large = Digest::max();
        assert!(small < large);
        assert!(small.to_string() < large.to_string());
    }
}
