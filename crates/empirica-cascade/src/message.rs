//! The inter-agent message envelope: a signed, typed wrapper agents use to
//! hand off status and control between each other across a shared session.
//! Only the envelope shape and its signature gate live here; no concrete
//! transport is implemented.

use chrono::{DateTime, Utc};
use empirica_core::content_hash::{canonicalize, ContentHash};
use empirica_identity::keypair::{self, IdentityKeyPair, PublicKeyRecord, Signature};
use empirica_identity::IdentityError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    StatusReport,
    ProceedToAct,
    RequestReassessment,
    Terminate,
    EscalationRequest,
    CompletionReport,
    ErrorReport,
}

/// A signed message one agent sends another. `payload` is free-form JSON
/// whose shape depends on `message_type` (e.g. a `StatusReport` payload
/// carries a flattened epistemic vector; an `EscalationRequest` carries a
/// reason string and the triggering checkpoint id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message_type: MessageType,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub signature: Signature,
}

#[derive(Serialize)]
struct HashedEnvelopeFields<'a> {
    message_type: MessageType,
    sender_id: &'a str,
    recipient_id: &'a Option<String>,
    timestamp: DateTime<Utc>,
    payload: &'a serde_json::Value,
}

fn envelope_hash(fields: &HashedEnvelopeFields<'_>) -> ContentHash {
    let value = serde_json::to_value(fields).expect("HashedEnvelopeFields always serializes");
    ContentHash::from_bytes(canonicalize(&value).as_bytes())
}

/// Build and sign an envelope. The signature covers every field but the
/// signature itself, the same way an EEP-1 payload's `content_hash` does.
pub fn sign_envelope(
    keypair: &IdentityKeyPair,
    message_type: MessageType,
    recipient_id: Option<String>,
    payload: serde_json::Value,
) -> MessageEnvelope {
    let timestamp = Utc::now();
    let sender_id = keypair.ai_id().to_string();

    let hashed = HashedEnvelopeFields {
        message_type,
        sender_id: &sender_id,
        recipient_id: &recipient_id,
        timestamp,
        payload: &payload,
    };
    let hash = envelope_hash(&hashed);
    let signature = keypair.sign(hash.as_bytes());

    MessageEnvelope {
        message_type,
        sender_id,
        recipient_id,
        timestamp,
        payload,
        signature,
    }
}

/// Recompute the envelope's hash from its fields and check the signature
/// against it under the sender's claimed public key.
pub fn verify_envelope(envelope: &MessageEnvelope, sender_public_key: &PublicKeyRecord) -> bool {
    if envelope.sender_id != sender_public_key.ai_id {
        return false;
    }
    let hashed = HashedEnvelopeFields {
        message_type: envelope.message_type,
        sender_id: &envelope.sender_id,
        recipient_id: &envelope.recipient_id,
        timestamp: envelope.timestamp,
        payload: &envelope.payload,
    };
    let hash = envelope_hash(&hashed);
    keypair::verify(hash.as_bytes(), &envelope.signature, sender_public_key)
}

/// The core's own inbound gate: every message an agent receives from another
/// agent passes through here before its payload is trusted. Refuses unsigned
/// or badly-signed envelopes outright rather than handing back a bool for the
/// caller to forget to check.
pub fn verify_inbound(envelope: &MessageEnvelope, sender_public_key: &PublicKeyRecord) -> Result<(), IdentityError> {
    if verify_envelope(envelope, sender_public_key) {
        Ok(())
    } else {
        Err(IdentityError::InvalidSignature {
            sender_id: envelope.sender_id.clone(),
        })
    }
}
