use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use empirica_core::content_hash::canonicalize;
use empirica_core::ContentHash;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The cascade phase a checkpoint was written from, or a terminal state the
/// cascade ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Preflight,
    Think,
    Investigate,
    Check,
    Act,
    Postflight,
    Blocked,
    Escalated,
    Faulted,
    Canceled,
    Completed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Blocked | Phase::Escalated | Phase::Faulted | Phase::Canceled | Phase::Completed
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        write!(f, "{s}")
    }
}

/// An immutable, content-addressed checkpoint: a snapshot of the 13-vector
/// plus summary metadata, written at a cascade phase boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub session_id: Uuid,
    pub ai_id: String,
    pub phase: Phase,
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    pub vectors: BTreeMap<String, f64>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CheckpointRecord {
    /// Content-addressed id: SHA-256 over the canonical-JSON serialization
    /// of every field. Two checkpoints with identical content collide to
    /// the same id by design — `append` is therefore idempotent.
    pub fn id(&self) -> ContentHash {
        let value = serde_json::to_value(self).expect("CheckpointRecord always serializes");
        ContentHash::from_bytes(canonicalize(&value).as_bytes())
    }

    /// Serialized size in bytes, checked against the configured budget by
    /// the store at `append` time (a soft target, not a hard invariant).
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self)
            .map(|v| v.len())
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CheckpointRecord {
        CheckpointRecord {
            session_id: Uuid::nil(),
            ai_id: "agent-a".into(),
            phase: Phase::Check,
            round: 0,
            timestamp: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            vectors: [("engagement".to_string(), 0.70)].into_iter().collect(),
            metadata: [(
                "confidence".to_string(),
                serde_json::json!(0.63),
            )]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn id_is_deterministic() {
        assert_eq!(sample().id(), sample().id());
    }

    #[test]
    fn id_changes_with_content() {
        let mut other = sample();
        other.round = 1;
        assert_ne!(sample().id(), other.id());
    }

    #[test]
    fn terminal_phases_are_flagged() {
        assert!(Phase::Completed.is_terminal());
        assert!(!Phase::Check.is_terminal());
    }

    #[test]
    fn phase_display_is_uppercase() {
        assert_eq!(Phase::Preflight.to_string(), "PREFLIGHT");
    }
}
