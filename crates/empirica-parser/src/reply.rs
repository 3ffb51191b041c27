use crate::error::ParserError;
use empirica_vector::{canonicalize_name, EpistemicVector, VectorComponent};
use std::collections::HashMap;

/// A successfully parsed reply: the validated vector plus any non-fatal
/// warnings (unknown top-level keys).
#[derive(Debug)]
pub struct ParsedReply {
    pub vector: EpistemicVector,
    pub warnings: Vec<String>,
}

const TIER_KEYS: [&str; 3] = ["foundation", "comprehension", "execution"];

/// Strip a fenced-code wrapper (```json ... ``` or ``` ... ```) if present.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    trimmed
}

/// Parse an LM reply (nested-by-tier or flat-by-component) into a validated
/// [`EpistemicVector`].
pub fn parse_reply(reply_text: &str) -> Result<ParsedReply, ParserError> {
    let stripped = strip_fence(reply_text);
    let value: serde_json::Value = serde_json::from_str(stripped)
        .map_err(|e| ParserError::MalformedReply(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ParserError::MalformedReply("reply is not a JSON object".into()))?;

    let mut warnings = Vec::new();
    let mut components: HashMap<String, VectorComponent> = HashMap::new();

    let looks_nested = TIER_KEYS
        .iter()
        .any(|k| object.get(*k).is_some_and(|v| v.is_object()));

    if looks_nested {
        ingest_nested(object, &mut components, &mut warnings)?;
    } else {
        ingest_flat(object, &mut components, &mut warnings)?;
    }

    let vector = EpistemicVector::from_parsed(components)?;
    Ok(ParsedReply { vector, warnings })
}

fn decode_leaf(name: &str, value: &serde_json::Value) -> Result<VectorComponent, ParserError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ParserError::MalformedReply(format!("{name}: {e}")))
}

fn ingest_nested(
    object: &serde_json::Map<String, serde_json::Value>,
    out: &mut HashMap<String, VectorComponent>,
    warnings: &mut Vec<String>,
) -> Result<(), ParserError> {
    for (key, value) in object {
        match key.as_str() {
            "engagement" | "uncertainty" => {
                out.insert(key.clone(), decode_leaf(key, value)?);
            }
            "foundation" => ingest_group(value, &["know", "do", "context"], "foundation", out)?,
            "comprehension" => ingest_group(
                value,
                &["clarity", "coherence", "signal", "density"],
                "comprehension",
                out,
            )?,
            "execution" => ingest_group(
                value,
                &["state", "change", "completion", "impact"],
                "execution",
                out,
            )?,
            other => warnings.push(format!("unknown top-level key: {other}")),
        }
    }
    Ok(())
}

fn ingest_group(
    value: &serde_json::Value,
    sub_keys: &[&str],
    tier_prefix: &str,
    out: &mut HashMap<String, VectorComponent>,
) -> Result<(), ParserError> {
    let object = value
        .as_object()
        .ok_or_else(|| ParserError::MalformedReply(format!("{tier_prefix} is not an object")))?;
    for sub_key in sub_keys {
        if let Some(leaf) = object.get(*sub_key) {
            let canonical = format!("{tier_prefix}_{sub_key}");
            out.insert(canonical.clone(), decode_leaf(&canonical, leaf)?);
        }
    }
    Ok(())
}

fn ingest_flat(
    object: &serde_json::Map<String, serde_json::Value>,
    out: &mut HashMap<String, VectorComponent>,
    warnings: &mut Vec<String>,
) -> Result<(), ParserError> {
    for (key, value) in object {
        match canonicalize_name(key) {
            Some(canonical) => {
                out.insert(canonical.to_string(), decode_leaf(canonical, value)?);
            }
            None => warnings.push(format!("unknown top-level key: {key}")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(score: f64) -> serde_json::Value {
        serde_json::json!({
            "score": score,
            "rationale": "because",
            "warrants_investigation": false,
            "investigation_priority": 0
        })
    }

    fn nested_reply() -> serde_json::Value {
        serde_json::json!({
            "engagement": leaf(0.85),
            "foundation": {"know": leaf(0.75), "do": leaf(0.80), "context": leaf(0.70)},
            "comprehension": {"clarity": leaf(0.85), "coherence": leaf(0.80), "signal": leaf(0.75), "density": leaf(0.40)},
            "execution": {"state": leaf(0.70), "change": leaf(0.60), "completion": leaf(0.50), "impact": leaf(0.65)},
            "uncertainty": leaf(0.20)
        })
    }

    #[test]
    fn parses_nested_shape() {
        let text = nested_reply().to_string();
        let parsed = parse_reply(&text).unwrap();
        assert_eq!(parsed.vector.engagement.score, 0.85);
        assert_eq!(parsed.vector.foundation_know.score, 0.75);
    }

    #[test]
    fn parses_fenced_reply() {
        let text = format!("```json\n{}\n```", nested_reply());
        let parsed = parse_reply(&text).unwrap();
        assert_eq!(parsed.vector.engagement.score, 0.85);
    }

    #[test]
    fn flat_and_nested_shapes_are_equivalent() {
        let nested = parse_reply(&nested_reply().to_string()).unwrap();

        let flat = serde_json::json!({
            "engagement": leaf(0.85),
            "foundation_know": leaf(0.75),
            "foundation_do": leaf(0.80),
            "foundation_context": leaf(0.70),
            "comprehension_clarity": leaf(0.85),
            "comprehension_coherence": leaf(0.80),
            "comprehension_signal": leaf(0.75),
            "comprehension_density": leaf(0.40),
            "execution_state": leaf(0.70),
            "execution_change": leaf(0.60),
            "execution_completion": leaf(0.50),
            "execution_impact": leaf(0.65),
            "uncertainty": leaf(0.20)
        });
        let flat_parsed = parse_reply(&flat.to_string()).unwrap();

        assert_eq!(nested.vector.to_flat(), flat_parsed.vector.to_flat());
    }

    #[test]
    fn bare_conceptual_flat_names_are_tolerated() {
        let flat = serde_json::json!({
            "engagement": leaf(0.85),
            "know": leaf(0.75),
            "do": leaf(0.80),
            "context": leaf(0.70),
            "clarity": leaf(0.85),
            "coherence": leaf(0.80),
            "signal": leaf(0.75),
            "density": leaf(0.40),
            "state": leaf(0.70),
            "change": leaf(0.60),
            "completion": leaf(0.50),
            "impact": leaf(0.65),
            "uncertainty": leaf(0.20)
        });
        let parsed = parse_reply(&flat.to_string()).unwrap();
        assert_eq!(parsed.vector.foundation_know.score, 0.75);
    }

    #[test]
    fn missing_component_errors() {
        let mut value = nested_reply();
        value.as_object_mut().unwrap().remove("uncertainty");
        let err = parse_reply(&value.to_string()).unwrap_err();
        assert!(matches!(err, ParserError::MissingComponent(_)));
    }

    #[test]
    fn malformed_json_errors() {
        let err = parse_reply("not json at all").unwrap_err();
        assert!(matches!(err, ParserError::MalformedReply(_)));
    }

    #[test]
    fn out_of_range_score_errors() {
        let mut value = nested_reply();
        value["engagement"]["score"] = serde_json::json!(1.5);
        let err = parse_reply(&value.to_string()).unwrap_err();
        assert!(matches!(err, ParserError::OutOfRange(_, _)));
    }

    #[test]
    fn inconsistent_flags_error() {
        let mut value = nested_reply();
        value["uncertainty"]["warrants_investigation"] = serde_json::json!(true);
        value["uncertainty"]["investigation_priority"] = serde_json::json!(0);
        let err = parse_reply(&value.to_string()).unwrap_err();
        assert!(matches!(err, ParserError::InconsistentFlags(_)));
    }

    #[test]
    fn unknown_top_level_keys_produce_warning_not_error() {
        let mut value = nested_reply();
        value["extra_field"] = serde_json::json!("ignored");
        let parsed = parse_reply(&value.to_string()).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn unknown_inner_keys_are_silently_ignored() {
        let mut value = nested_reply();
        value["engagement"]["extra_inner"] = serde_json::json!("ignored");
        let parsed = parse_reply(&value.to_string()).unwrap();
        assert!(parsed.warnings.is_empty());
    }
}
