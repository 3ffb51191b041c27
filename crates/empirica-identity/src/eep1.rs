use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use empirica_core::content_hash::{canonicalize, ContentHash};
use serde::{Deserialize, Serialize};

use crate::keypair::{IdentityKeyPair, PublicKeyRecord, Signature};

/// An EEP-1 signed attestation of a final epistemic state and its cascade
/// trace hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedPayload {
    pub content_hash: ContentHash,
    pub creator_id: String,
    pub creator_public_key: String,
    pub timestamp: DateTime<Utc>,
    pub epistemic_state_final: BTreeMap<String, f64>,
    pub cascade_trace_hash: ContentHash,
    pub metadata_sources: Vec<String>,
    pub model_id: String,
    pub signature: Signature,
}

/// The fields that `content_hash` is computed over: every EEP-1 field
/// except `content_hash` and `signature` themselves.
#[derive(Serialize)]
struct HashedFields<'a> {
    creator_id: &'a str,
    creator_public_key: &'a str,
    timestamp: DateTime<Utc>,
    epistemic_state_final: &'a BTreeMap<String, f64>,
    cascade_trace_hash: &'a ContentHash,
    metadata_sources: &'a [String],
    model_id: &'a str,
}

/// Construct and sign an EEP-1 record. `epistemic_state_final` is typically
/// an [`empirica_vector::EpistemicVector::to_flat`] snapshot.
pub fn sign_assessment(
    keypair: &IdentityKeyPair,
    epistemic_state_final: BTreeMap<String, f64>,
    cascade_trace_hash: ContentHash,
    model_id: impl Into<String>,
    metadata_sources: Vec<String>,
) -> SignedPayload {
    let public_key = keypair.public_key_record();
    let timestamp = Utc::now();
    let model_id = model_id.into();

    let hashed = HashedFields {
        creator_id: keypair.ai_id(),
        creator_public_key: &public_key.to_pem(),
        timestamp,
        epistemic_state_final: &epistemic_state_final,
        cascade_trace_hash: &cascade_trace_hash,
        metadata_sources: &metadata_sources,
        model_id: &model_id,
    };
    let content_hash = hash_fields(&hashed);
    let signature = keypair.sign(content_hash.as_bytes());

    SignedPayload {
        content_hash,
        creator_id: keypair.ai_id().to_string(),
        creator_public_key: public_key.to_pem(),
        timestamp,
        epistemic_state_final,
        cascade_trace_hash,
        metadata_sources,
        model_id,
        signature,
    }
}

/// Verify a signed payload's integrity: recomputes `content_hash` from the
/// payload's other fields and checks the signature against it.
pub fn verify_payload(payload: &SignedPayload, public_key: &PublicKeyRecord) -> bool {
    let hashed = HashedFields {
        creator_id: &payload.creator_id,
        creator_public_key: &payload.creator_public_key,
        timestamp: payload.timestamp,
        epistemic_state_final: &payload.epistemic_state_final,
        cascade_trace_hash: &payload.cascade_trace_hash,
        metadata_sources: &payload.metadata_sources,
        model_id: &payload.model_id,
    };
    let recomputed = hash_fields(&hashed);
    if recomputed != payload.content_hash {
        return false;
    }
    crate::keypair::verify(payload.content_hash.as_bytes(), &payload.signature, public_key)
}

fn hash_fields(fields: &HashedFields<'_>) -> ContentHash {
    let value = serde_json::to_value(fields).expect("HashedFields always serializes");
    ContentHash::from_bytes(canonicalize(&value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> BTreeMap<String, f64> {
        [
            ("engagement".to_string(), 0.85),
            ("foundation_know".to_string(), 0.40),
            ("uncertainty".to_string(), 0.20),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn sign_and_verify_round_trips() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let public = keypair.public_key_record();
        let payload = sign_assessment(
            &keypair,
            sample_state(),
            ContentHash::from_bytes(b"trace"),
            "gpt-test",
            vec!["session://abc".into()],
        );
        assert!(verify_payload(&payload, &public));
    }

    #[test]
    fn tampered_epistemic_state_fails_verification() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let public = keypair.public_key_record();
        let mut payload = sign_assessment(
            &keypair,
            sample_state(),
            ContentHash::from_bytes(b"trace"),
            "gpt-test",
            vec![],
        );
        *payload.epistemic_state_final.get_mut("uncertainty").unwrap() += 0.01;
        assert!(!verify_payload(&payload, &public));
    }

    #[test]
    fn restoring_tampered_field_restores_verification() {
        let keypair = IdentityKeyPair::generate("agent-a");
        let public = keypair.public_key_record();
        let mut payload = sign_assessment(
            &keypair,
            sample_state(),
            ContentHash::from_bytes(b"trace"),
            "gpt-test",
            vec![],
        );
        let original = payload.epistemic_state_final.clone();
        *payload.epistemic_state_final.get_mut("uncertainty").unwrap() += 0.01;
        assert!(!verify_payload(&payload, &public));
        payload.epistemic_state_final = original;
        assert!(verify_payload(&payload, &public));
    }
}
