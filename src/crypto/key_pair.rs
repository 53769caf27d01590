//! ECDSA key pairs on secp256k1.
//!
//! An account's address is the hex encoding of its SEC1 public key, so the
//! address doubles as the verification key. Signatures always cover the
//! canonical structural hash of the signed payload, never the raw bytes.

use crate::types::hash::canonical_hash;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel rendering for an unset address (mining rewards have no sender).
const NONE_ADDRESS: &str = "-";

/// Account address: the hex-encoded uncompressed SEC1 public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// The sentinel address used where no real account is involved.
    pub fn none() -> Address {
        Address(NONE_ADDRESS.to_string())
    }

    /// Returns `true` if this is the sentinel address.
    pub fn is_none(&self) -> bool {
        self.0 == NONE_ADDRESS
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Address {
        Address(s.to_string())
    }
}

/// Hex-encoded ECDSA signature over a canonical payload hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

/// Private signing key with its derived address.
///
/// Generated from OS entropy. Never serialized or transmitted.
#[derive(Clone)]
pub struct KeyPair {
    key: SigningKey,
    address: Address,
}

impl KeyPair {
    /// Generates a new random key pair using OS-provided entropy.
    pub fn new() -> Self {
        let key = SigningKey::random(&mut OsRng);
        let address = derive_address(key.verifying_key());
        Self { key, address }
    }

    /// Returns the address derived from this key pair's public key.
    pub fn address(&self) -> Address {
        self.address.clone()
    }

    /// Signs the canonical hash of `payload`.
    pub fn sign<T: Serialize>(&self, payload: &T) -> Signature {
        let digest = canonical_hash(payload);
        let signature: EcdsaSignature = self.key.sign(digest.as_bytes());
        Signature(hex::encode(signature.to_bytes()))
    }
}

impl Default for KeyPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Derives the hex address from a verifying key (uncompressed SEC1 point).
fn derive_address(key: &VerifyingKey) -> Address {
    Address(hex::encode(key.to_encoded_point(false).as_bytes()))
}

/// Verifies `signature` over the canonical hash of `payload` against the
/// public key encoded in `address`.
///
/// Returns `false` for the sentinel address, malformed keys, or malformed
/// signatures - never an error.
pub fn verify_signature<T: Serialize>(address: &Address, payload: &T, signature: &Signature) -> bool {
    let Ok(key_bytes) = hex::decode(address.as_str()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_sec1_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(&signature.0) else {
        return false;
    };
    let Ok(signature) = EcdsaSignature::from_slice(&sig_bytes) else {
        return false;
    };
    let digest = canonical_hash(payload);
    key.verify(digest.as_bytes(), &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_then_verify_succeeds() {
        let key_pair = KeyPair::new();
        let payload = json!({ "to": "somewhere", "value": 50 });
        let signature = key_pair.sign(&payload);
        assert!(verify_signature(&key_pair.address(), &payload, &signature));
    }

    #[test]
    fn verify_fails_for_tampered_payload() {
        let key_pair = KeyPair::new();
        let payload = json!({ "value": 50 });
        let signature = key_pair.sign(&payload);
        let tampered = json!({ "value": 9001 });
        assert!(!verify_signature(&key_pair.address(), &tampered, &signature));
    }

    #[test]
    fn verify_fails_for_wrong_key() {
        let signer = KeyPair::new();
        let other = KeyPair::new();
        let payload = json!({ "value": 50 });
        let signature = signer.sign(&payload);
        assert!(!verify_signature(&other.address(), &payload, &signature));
    }

    #[test]
    fn verify_fails_for_sentinel_address() {
        let key_pair = KeyPair::new();
        let payload = json!({ "value": 50 });
        let signature = key_pair.sign(&payload);
        assert!(!verify_signature(&Address::none(), &payload, &signature));
    }

    #[test]
    fn verify_handles_same_fields_in_different_order() {
        let key_pair = KeyPair::new();
        let signature = key_pair.sign(&json!({ "a": 1, "b": 2 }));
        // Structural equality, not byte equality, is what the signature covers.
        assert!(verify_signature(
            &key_pair.address(),
            &json!({ "b": 2, "a": 1 }),
            &signature
        ));
    }

    #[test]
    fn addresses_are_unique_per_key() {
        assert_ne!(KeyPair::new().address(), KeyPair::new().address());
    }

    #[test]
    fn sentinel_address_is_recognized() {
        assert!(Address::none().is_none());
        assert!(!KeyPair::new().address().is_none());
    }
}
