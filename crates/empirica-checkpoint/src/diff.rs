use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::CheckpointRecord;

/// The result of [`diff_records`]: componentwise score deltas and a
/// symmetric difference over metadata keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointDiff {
    /// `b[component] - a[component]` for every component present in either.
    pub component_deltas: BTreeMap<String, f64>,
    /// Metadata keys whose value differs (or is present in only one side),
    /// mapped to `(a_value, b_value)`.
    pub metadata_diff: BTreeMap<String, (Option<serde_json::Value>, Option<serde_json::Value>)>,
}

/// Componentwise subtraction of two checkpoints' vectors, plus a symmetric
/// difference over their metadata.
pub fn diff_records(a: &CheckpointRecord, b: &CheckpointRecord) -> CheckpointDiff {
    let mut component_deltas = BTreeMap::new();
    let mut names: Vec<&String> = a.vectors.keys().chain(b.vectors.keys()).collect();
    names.sort();
    names.dedup();
    for name in names {
        let a_score = a.vectors.get(name).copied().unwrap_or(0.0);
        let b_score = b.vectors.get(name).copied().unwrap_or(0.0);
        component_deltas.insert(name.clone(), b_score - a_score);
    }

    let mut metadata_diff = BTreeMap::new();
    let mut keys: Vec<&String> = a.metadata.keys().chain(b.metadata.keys()).collect();
    keys.sort();
    keys.dedup();
    for key in keys {
        let a_value = a.metadata.get(key).cloned();
        let b_value = b.metadata.get(key).cloned();
        if a_value != b_value {
            metadata_diff.insert(key.clone(), (a_value, b_value));
        }
    }

    CheckpointDiff {
        component_deltas,
        metadata_diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Phase;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(vectors: &[(&str, f64)], metadata: &[(&str, serde_json::Value)]) -> CheckpointRecord {
        CheckpointRecord {
            session_id: Uuid::nil(),
            ai_id: "agent-a".into(),
            phase: Phase::Check,
            round: 0,
            timestamp: Utc::now(),
            vectors: vectors.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn component_deltas_are_componentwise() {
        let a = record(&[("engagement", 0.60)], &[]);
        let b = record(&[("engagement", 0.85)], &[]);
        let diff = diff_records(&a, &b);
        assert!((diff.component_deltas["engagement"] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn metadata_diff_is_symmetric() {
        let a = record(&[], &[("confidence", serde_json::json!(0.5))]);
        let b = record(
            &[],
            &[
                ("confidence", serde_json::json!(0.7)),
                ("task", serde_json::json!("audit")),
            ],
        );
        let diff = diff_records(&a, &b);
        assert_eq!(diff.metadata_diff.len(), 2);
        assert!(diff.metadata_diff.contains_key("task"));
    }

    #[test]
    fn identical_records_have_zero_diff() {
        let a = record(&[("engagement", 0.6)], &[("confidence", serde_json::json!(0.5))]);
        let diff = diff_records(&a, &a.clone());
        assert!(diff.component_deltas.values().all(|d| *d == 0.0));
        assert!(diff.metadata_diff.is_empty());
    }
}
