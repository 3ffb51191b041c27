use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// A public key bound to an `ai_id`, as stored in the session store's
/// `identities/{ai_id}` keyspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    pub ai_id: String,
    #[serde(with = "hex_bytes")]
    pub bytes: [u8; 32],
    pub registered_at: DateTime<Utc>,
}

impl PublicKeyRecord {
    pub fn verifying_key(&self) -> Result<VerifyingKey, IdentityError> {
        VerifyingKey::from_bytes(&self.bytes).map_err(|e| IdentityError::KeyLoadError {
            path: std::path::PathBuf::new(),
            reason: e.to_string(),
        })
    }

    /// A PEM-style wrapper around the raw 32-byte public key, suitable for
    /// out-of-band distribution. Not a PKCS#8 SubjectPublicKeyInfo; the body
    /// is the wire-contract base64 encoding of the raw key bytes.
    pub fn to_pem(&self) -> String {
        format!(
            "-----BEGIN EMPIRICA PUBLIC KEY-----\n{}\n-----END EMPIRICA PUBLIC KEY-----\n",
            base64_lines(&self.bytes)
        )
    }
}

fn base64_lines(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// An Ed25519 key pair for one `ai_id`. The signing (private) half never
/// leaves this type — it is written to disk only by [`crate::store::IdentityStore`].
pub struct IdentityKeyPair {
    ai_id: String,
    signing_key: SigningKey,
}

impl IdentityKeyPair {
    pub fn generate(ai_id: impl Into<String>) -> Self {
        Self {
            ai_id: ai_id.into(),
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    pub fn from_bytes(ai_id: impl Into<String>, secret: &[u8; 32]) -> Self {
        Self {
            ai_id: ai_id.into(),
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    pub fn ai_id(&self) -> &str {
        &self.ai_id
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key_record(&self) -> PublicKeyRecord {
        PublicKeyRecord {
            ai_id: self.ai_id.clone(),
            bytes: self.signing_key.verifying_key().to_bytes(),
            registered_at: Utc::now(),
        }
    }

    pub fn sign(&self, payload_bytes: &[u8]) -> Signature {
        let sig = self.signing_key.sign(payload_bytes);
        Signature {
            bytes: sig.to_bytes(),
        }
    }
}

/// An Ed25519 signature over canonical-JSON payload bytes. Serializes as the
/// wire-contract base64 encoding of the raw 64 signature bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "base64_sig")]
    bytes: [u8; 64],
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }
}

/// Verify `signature` over `payload_bytes` under `public_key`. A failed
/// `VerifyingKey::verify` is treated as false rather than propagated,
/// matching the boolean contract; ed25519-dalek's own `verify` is already
/// constant-time for the cryptographic check itself.
pub fn verify(payload_bytes: &[u8], signature: &Signature, public_key: &PublicKeyRecord) -> bool {
    let Ok(verifying_key) = public_key.verifying_key() else {
        return false;
    };
    let ed_signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying_key.verify(payload_bytes, &ed_signature).is_ok()
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        hex::encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected 32 bytes, got {len}")))
    }
}

mod base64_sig {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        BASE64.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 64], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected 64 bytes, got {len}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trips() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let public = keypair.public_key_record();
        let signature = keypair.sign(b"hello");
        assert!(verify(b"hello", &signature, &public));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let public = keypair.public_key_record();
        let signature = keypair.sign(b"hello");
        assert!(!verify(b"goodbye", &signature, &public));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let other = IdentityKeyPair::generate("agent-b").public_key_record();
        let signature = keypair.sign(b"hello");
        assert!(!verify(b"hello", &signature, &other));
    }

    #[test]
    fn secret_bytes_round_trip_through_from_bytes() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let secret = keypair.secret_bytes();
        let restored = IdentityKeyPair::from_bytes("agent-a", &secret);
        assert_eq!(
            keypair.public_key_record().bytes,
            restored.public_key_record().bytes
        );
    }

    #[test]
    fn public_key_pem_round_trips_base64() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let public = keypair.public_key_record();
        let pem = public.to_pem();
        assert!(pem.contains("BEGIN EMPIRICA PUBLIC KEY"));
        assert!(pem.contains(&BASE64.encode(public.bytes)));
    }

    #[test]
    fn signature_serializes_as_base64() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let signature = keypair.sign(b"hello");
        let json = serde_json::to_string(&signature).expect("signature serializes");
        assert_eq!(json, format!("{{\"bytes\":\"{}\"}}", signature.to_base64()));
    }
}
