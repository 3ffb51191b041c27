use crate::profile::PersonaProfile;
use empirica_vector::EpistemicVector;

/// Phase-dependent blend strength: PREFLIGHT is prior-dominated (the
/// persona is fresh, unprovisioned by evidence); THINK eases off slightly;
/// every later phase balances evidence and expertise equally.
pub fn blend_strength(phase: &str) -> f64 {
    match phase {
        "PREFLIGHT" => 1.0,
        "THINK" => 0.8,
        _ => 0.5,
    }
}

/// Blend `baseline`'s scores with `persona`'s priors at strength `s`,
/// producing a new vector. `evidence`, `warrants_investigation`, and
/// `investigation_priority` are preserved from `baseline`; the rationale is
/// annotated with the prior value and blend strength that were applied.
pub fn blend_priors(baseline: &EpistemicVector, persona: &PersonaProfile, s: f64) -> EpistemicVector {
    let priors = persona.canonical_priors();
    let mut blended = baseline.clone();

    for name in empirica_vector::CANONICAL_NAMES {
        let Some(&prior) = priors.get(name) else {
            continue;
        };
        let component = blended
            .component_mut(name)
            .expect("CANONICAL_NAMES names are always valid components");
        component.score = component.score * (1.0 - s) + prior * s;
        component.rationale = format!("{} [prior={:.2}, s={:.1}]", component.rationale, prior, s);
    }

    blended
}
