//! Ed25519 message signing and verification.
//!
//! A message is signed over its canonical form: the serialized JSON object
//! without the `signatures` and `@context` keys. The resulting signature
//! carries the hex encoded public key as its `keyId`.

use crate::error::SigningError;
use crate::signature::{Signature, Signatures};
use crate::JsonObject;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// `signingMethod` written into every signature produced here.
pub const SIGNING_METHOD: &str = "Ed25519";

/// `encodingMethod` of key ids and signature values.
pub const ENCODING_METHOD: &str = "hex";

/// An Ed25519 key used to sign outgoing messages.
#[derive(Clone)]
pub struct SignKey {
    key: SigningKey,
    name: Option<String>,
    description: Option<String>,
}

impl SignKey {
    /// Creates a key from its 32 byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
            name: None,
            description: None,
        }
    }

    /// Creates a key from a hex encoded seed, ignoring surrounding whitespace.
    pub fn from_hex(seed: &str) -> Result<Self, SigningError> {
        let bytes = hex::decode(seed.trim()).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            SigningError::InvalidKey(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self::from_seed(seed))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Hex encoded public key, used as the signature `keyId`.
    pub fn key_id(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    /// Signs the canonical form of `object`.
    pub fn sign(&self, object: &JsonObject) -> Signature {
        let signature = self.key.sign(&canonical_bytes(object));
        let mut result = Signature::new(self.key_id(), hex::encode(signature.to_bytes()))
            .with_methods(SIGNING_METHOD, ENCODING_METHOD);
        result.name = self.name.clone();
        result.description = self.description.clone();
        result
    }
}

impl std::fmt::Debug for SignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret seed
        f.debug_struct("SignKey")
            .field("key_id", &self.key_id())
            .field("name", &self.name)
            .finish()
    }
}

/// The bytes covered by a message signature.
pub fn canonical_bytes(object: &JsonObject) -> Vec<u8> {
    let mut object = object.clone();
    object.shift_remove("signatures");
    object.shift_remove("@context");
    serde_json::to_vec(&object).unwrap_or_default()
}

/// Checks a single signature against the canonical form of `object`.
pub fn verify_signature(object: &JsonObject, signature: &Signature) -> Result<(), SigningError> {
    if let Some(method) = &signature.signing_method {
        if !method.eq_ignore_ascii_case(SIGNING_METHOD) {
            return Err(SigningError::UnsupportedMethod(method.clone()));
        }
    }

    let malformed = |reason: String| SigningError::MalformedSignature {
        key_id: signature.key_id.clone(),
        reason,
    };

    let key_bytes = hex::decode(&signature.key_id).map_err(|e| malformed(e.to_string()))?;
    let key_bytes: [u8; 32] = key_bytes
        .try_into()
        .map_err(|b: Vec<u8>| malformed(format!("public key is {} bytes, expected 32", b.len())))?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|e| malformed(e.to_string()))?;

    let value = hex::decode(&signature.value).map_err(|e| malformed(e.to_string()))?;
    let value = ed25519_dalek::Signature::from_slice(&value).map_err(|e| malformed(e.to_string()))?;

    verifying_key
        .verify(&canonical_bytes(object), &value)
        .map_err(|_| SigningError::VerificationFailed {
            key_id: signature.key_id.clone(),
        })
}

/// Checks every signature of a message. An empty set verifies trivially.
pub fn verify_signatures(object: &JsonObject, signatures: &Signatures) -> Result<(), SigningError> {
    for signature in signatures {
        if let Err(e) = verify_signature(object, signature) {
            tracing::warn!(key_id = %signature.key_id, error = %e, "signature verification failed");
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(o) => o,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let key = SignKey::from_seed([7u8; 32]).with_name("station-7");
        let msg = object(json!({"transactionId": "t-1"}));

        let signature = key.sign(&msg);
        assert_eq!(signature.key_id, key.key_id());
        assert_eq!(signature.signing_method.as_deref(), Some(SIGNING_METHOD));
        assert_eq!(signature.name.as_deref(), Some("station-7"));
        assert!(verify_signature(&msg, &signature).is_ok());
    }

    #[test]
    fn test_signatures_key_is_ignored() {
        let key = SignKey::from_seed([1u8; 32]);
        let msg = object(json!({"evseId": 1}));
        let signature = key.sign(&msg);

        let mut signed = msg.clone();
        signed.insert("signatures".to_string(), json!([]));
        signed.insert("@context".to_string(), json!("https://example.invalid"));
        assert!(verify_signature(&signed, &signature).is_ok());
    }

    #[test]
    fn test_tampered_message_fails() {
        let key = SignKey::from_seed([2u8; 32]);
        let signature = key.sign(&object(json!({"transactionId": "t-1"})));

        let err = verify_signature(&object(json!({"transactionId": "t-2"})), &signature).unwrap_err();
        assert!(matches!(err, SigningError::VerificationFailed { .. }));
    }

    #[test]
    fn test_malformed_signature_value() {
        let key = SignKey::from_seed([3u8; 32]);
        let signature = Signature::new(key.key_id(), "zz-not-hex");
        let err = verify_signature(&object(json!({})), &signature).unwrap_err();
        assert!(matches!(err, SigningError::MalformedSignature { .. }));
    }

    #[test]
    fn test_unsupported_method() {
        let signature = Signature::new("00", "00").with_methods("RSA", "base64");
        let err = verify_signature(&object(json!({})), &signature).unwrap_err();
        assert_eq!(err, SigningError::UnsupportedMethod("RSA".to_string()));
    }

    #[test]
    fn test_key_from_hex() {
        let key = SignKey::from_hex(&format!("{}\n", hex::encode([9u8; 32]))).unwrap();
        assert_eq!(key.key_id(), SignKey::from_seed([9u8; 32]).key_id());

        assert!(SignKey::from_hex("abcd").is_err());
        assert!(SignKey::from_hex("not hex").is_err());
    }

    #[test]
    fn test_debug_hides_seed() {
        let key = SignKey::from_seed([5u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains(&key.key_id()));
        assert!(!debug.contains(&hex::encode([5u8; 32])));
    }

    #[test]
    fn test_verify_all() {
        let msg = object(json!({"a": 1}));
        let good: Signatures = vec![
            SignKey::from_seed([1u8; 32]).sign(&msg),
            SignKey::from_seed([2u8; 32]).sign(&msg),
        ]
        .into_iter()
        .collect();
        assert!(verify_signatures(&msg, &good).is_ok());
        assert!(verify_signatures(&msg, &Signatures::new()).is_ok());

        let mut bad = good.clone();
        bad.insert(Signature::new(SignKey::from_seed([3u8; 32]).key_id(), "00".repeat(64)));
        assert!(verify_signatures(&msg, &bad).is_err());
    }
}
