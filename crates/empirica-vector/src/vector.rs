use crate::component::{ComponentError, VectorComponent};
use std::collections::HashMap;

/// The 13 canonical, tier-prefixed component names, in the order §3's table
/// lists their tiers.
pub const CANONICAL_NAMES: [&str; 13] = [
    "engagement",
    "foundation_know",
    "foundation_do",
    "foundation_context",
    "comprehension_clarity",
    "comprehension_coherence",
    "comprehension_signal",
    "comprehension_density",
    "execution_state",
    "execution_change",
    "execution_completion",
    "execution_impact",
    "uncertainty",
];

/// Bare conceptual aliases, positionally matched to [`CANONICAL_NAMES`].
/// Used only for ingestion tolerance and persona-authoring readability.
const CONCEPTUAL_ALIASES: [&str; 13] = [
    "engagement",
    "know",
    "do",
    "context",
    "clarity",
    "coherence",
    "signal",
    "density",
    "state",
    "change",
    "completion",
    "impact",
    "uncertainty",
];

/// Map a bare conceptual name (or an already-canonical name) to its
/// canonical, tier-prefixed form.
pub fn canonicalize_name(name: &str) -> Option<&'static str> {
    if let Some(pos) = CANONICAL_NAMES.iter().position(|n| *n == name) {
        return Some(CANONICAL_NAMES[pos]);
    }
    CONCEPTUAL_ALIASES
        .iter()
        .position(|n| *n == name)
        .map(|pos| CANONICAL_NAMES[pos])
}

#[derive(Debug, Clone, Copy)]
pub struct TierWeights {
    pub engagement: f64,
    pub foundation: f64,
    pub comprehension: f64,
    pub execution: f64,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            engagement: 0.15,
            foundation: 0.35,
            comprehension: 0.25,
            execution: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TierConfidences {
    pub foundation: f64,
    pub comprehension: f64,
    pub execution: f64,
}

/// A per-component floor/ceiling supplied by a bound persona's critical
/// thresholds. Defined here (rather than in `empirica-persona`) so the
/// vector crate can evaluate breaches without depending on the persona
/// crate.
#[derive(Debug, Clone)]
pub struct ComponentBound {
    pub component: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("missing component: {0}")]
    MissingComponent(String),
    #[error("invalid component {0}: {1}")]
    Invalid(String, #[source] ComponentError),
}

/// The full 13-component epistemic vector.
#[derive(Debug, Clone)]
pub struct EpistemicVector {
    pub engagement: VectorComponent,
    pub foundation_know: VectorComponent,
    pub foundation_do: VectorComponent,
    pub foundation_context: VectorComponent,
    pub comprehension_clarity: VectorComponent,
    pub comprehension_coherence: VectorComponent,
    pub comprehension_signal: VectorComponent,
    pub comprehension_density: VectorComponent,
    pub execution_state: VectorComponent,
    pub execution_change: VectorComponent,
    pub execution_completion: VectorComponent,
    pub execution_impact: VectorComponent,
    pub uncertainty: VectorComponent,
}

impl EpistemicVector {
    /// Build from a parser output keyed by canonical name. Fails with
    /// `MissingComponent`/`Invalid` if any of the 13 components is absent or
    /// fails its own validation.
    pub fn from_parsed(
        mut payload: HashMap<String, VectorComponent>,
    ) -> Result<Self, VectorError> {
        let mut take = |name: &str| -> Result<VectorComponent, VectorError> {
            let component = payload
                .remove(name)
                .ok_or_else(|| VectorError::MissingComponent(name.to_string()))?;
            component
                .validate()
                .map_err(|e| VectorError::Invalid(name.to_string(), e))?;
            Ok(component)
        };

        Ok(Self {
            engagement: take("engagement")?,
            foundation_know: take("foundation_know")?,
            foundation_do: take("foundation_do")?,
            foundation_context: take("foundation_context")?,
            comprehension_clarity: take("comprehension_clarity")?,
            comprehension_coherence: take("comprehension_coherence")?,
            comprehension_signal: take("comprehension_signal")?,
            comprehension_density: take("comprehension_density")?,
            execution_state: take("execution_state")?,
            execution_change: take("execution_change")?,
            execution_completion: take("execution_completion")?,
            execution_impact: take("execution_impact")?,
            uncertainty: take("uncertainty")?,
        })
    }

    /// All 13 (canonical name, component) pairs, in `CANONICAL_NAMES` order.
    pub fn components(&self) -> [(&'static str, &VectorComponent); 13] {
        [
            ("engagement", &self.engagement),
            ("foundation_know", &self.foundation_know),
            ("foundation_do", &self.foundation_do),
            ("foundation_context", &self.foundation_context),
            ("comprehension_clarity", &self.comprehension_clarity),
            ("comprehension_coherence", &self.comprehension_coherence),
            ("comprehension_signal", &self.comprehension_signal),
            ("comprehension_density", &self.comprehension_density),
            ("execution_state", &self.execution_state),
            ("execution_change", &self.execution_change),
            ("execution_completion", &self.execution_completion),
            ("execution_impact", &self.execution_impact),
            ("uncertainty", &self.uncertainty),
        ]
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut VectorComponent> {
        match name {
            "engagement" => Some(&mut self.engagement),
            "foundation_know" => Some(&mut self.foundation_know),
            "foundation_do" => Some(&mut self.foundation_do),
            "foundation_context" => Some(&mut self.foundation_context),
            "comprehension_clarity" => Some(&mut self.comprehension_clarity),
            "comprehension_coherence" => Some(&mut self.comprehension_coherence),
            "comprehension_signal" => Some(&mut self.comprehension_signal),
            "comprehension_density" => Some(&mut self.comprehension_density),
            "execution_state" => Some(&mut self.execution_state),
            "execution_change" => Some(&mut self.execution_change),
            "execution_completion" => Some(&mut self.execution_completion),
            "execution_impact" => Some(&mut self.execution_impact),
            "uncertainty" => Some(&mut self.uncertainty),
            _ => None,
        }
    }

    /// Tier confidences: arithmetic mean of each tier's components, except
    /// `comprehension_density` is inverted (1 − score) before averaging.
    pub fn tier_confidences(&self) -> TierConfidences {
        let foundation = mean([
            self.foundation_know.score,
            self.foundation_do.score,
            self.foundation_context.score,
        ]);
        let comprehension = mean([
            self.comprehension_clarity.score,
            self.comprehension_coherence.score,
            self.comprehension_signal.score,
            1.0 - self.comprehension_density.score,
        ]);
        let execution = mean([
            self.execution_state.score,
            self.execution_change.score,
            self.execution_completion.score,
            self.execution_impact.score,
        ]);
        TierConfidences {
            foundation,
            comprehension,
            execution,
        }
    }

    /// Weighted sum of tier confidences, with engagement taking the gate
    /// weight directly. Uses canonical weights unless a persona's tier
    /// weights are supplied.
    pub fn overall_confidence(&self, weights: TierWeights) -> f64 {
        let tiers = self.tier_confidences();
        self.engagement.score * weights.engagement
            + tiers.foundation * weights.foundation
            + tiers.comprehension * weights.comprehension
            + tiers.execution * weights.execution
    }

    /// The recommended action per §3's rules. `thresholds` are a bound
    /// persona's critical thresholds, if any; a breach forces INVESTIGATE
    /// regardless of confidence.
    pub fn recommended_action(
        &self,
        weights: TierWeights,
        engagement_gate: f64,
        confidence_to_proceed: f64,
        thresholds: &[ComponentBound],
    ) -> crate::Action {
        use crate::Action;

        if self.engagement.score < engagement_gate {
            return Action::Block;
        }

        let any_high_priority_flag = self
            .components()
            .iter()
            .any(|(_, c)| c.warrants_investigation && c.investigation_priority >= 5);

        if self.uncertainty.score > 0.70 || any_high_priority_flag {
            return Action::Investigate;
        }

        let breach = thresholds.iter().any(|bound| {
            let score = self
                .components()
                .iter()
                .find(|(name, _)| *name == bound.component)
                .map(|(_, c)| c.score);
            match score {
                Some(score) => {
                    bound.min.is_some_and(|min| score < min)
                        || bound.max.is_some_and(|max| score > max)
                }
                None => false,
            }
        });

        if breach {
            return Action::Investigate;
        }

        let confidence = self.overall_confidence(weights);
        if confidence >= confidence_to_proceed {
            Action::Proceed
        } else {
            // Ties between PROCEED and INVESTIGATE resolve to INVESTIGATE
            // (safety bias) — anything below the proceed threshold that
            // isn't already BLOCK/INVESTIGATE escalates instead.
            Action::Escalate
        }
    }

    /// 13-entry canonical-name -> score map, for checkpoints and hashing.
    pub fn to_flat(&self) -> HashMap<String, f64> {
        self.components()
            .into_iter()
            .map(|(name, c)| (name.to_string(), c.score))
            .collect()
    }

    // Conceptual-name read-only aliases, for persona authoring and legacy
    // persistence readability.
    pub fn know(&self) -> &VectorComponent {
        &self.foundation_know
    }
    pub fn do_(&self) -> &VectorComponent {
        &self.foundation_do
    }
    pub fn context(&self) -> &VectorComponent {
        &self.foundation_context
    }
    pub fn clarity(&self) -> &VectorComponent {
        &self.comprehension_clarity
    }
    pub fn coherence(&self) -> &VectorComponent {
        &self.comprehension_coherence
    }
    pub fn signal(&self) -> &VectorComponent {
        &self.comprehension_signal
    }
    pub fn density(&self) -> &VectorComponent {
        &self.comprehension_density
    }
    pub fn state(&self) -> &VectorComponent {
        &self.execution_state
    }
    pub fn change(&self) -> &VectorComponent {
        &self.execution_change
    }
    pub fn completion(&self) -> &VectorComponent {
        &self.execution_completion
    }
    pub fn impact(&self) -> &VectorComponent {
        &self.execution_impact
    }
}

fn mean(scores: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0;
    for s in scores {
        sum += s;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Action;

    fn component(score: f64) -> VectorComponent {
        VectorComponent::new(score, "because", false, 0).unwrap()
    }

    fn flagged(score: f64, priority: u8) -> VectorComponent {
        VectorComponent::new(score, "flagged", true, priority).unwrap()
    }

    fn scenario_1_vector() -> EpistemicVector {
        EpistemicVector {
            engagement: component(0.85),
            foundation_know: component(0.75),
            foundation_do: component(0.80),
            foundation_context: component(0.70),
            comprehension_clarity: component(0.85),
            comprehension_coherence: component(0.80),
            comprehension_signal: component(0.75),
            comprehension_density: component(0.40),
            execution_state: component(0.70),
            execution_change: component(0.60),
            execution_completion: component(0.50),
            execution_impact: component(0.65),
            uncertainty: component(0.20),
        }
    }

    #[test]
    fn canonicalize_name_resolves_aliases() {
        assert_eq!(canonicalize_name("know"), Some("foundation_know"));
        assert_eq!(canonicalize_name("foundation_know"), Some("foundation_know"));
        assert_eq!(canonicalize_name("nonexistent"), None);
    }

    #[test]
    fn from_parsed_requires_all_13() {
        let mut payload = HashMap::new();
        payload.insert("engagement".to_string(), component(0.8));
        let err = EpistemicVector::from_parsed(payload).unwrap_err();
        assert!(matches!(err, VectorError::MissingComponent(_)));
    }

    #[test]
    fn density_inversion_in_tier_mean() {
        let mut v = scenario_1_vector();
        v.comprehension_density = component(1.0);
        let tiers = v.tier_confidences();
        // clarity=0.85, coherence=0.80, signal=0.75, inverted density=0.0
        let expected = (0.85 + 0.80 + 0.75 + 0.0) / 4.0;
        assert!((tiers.comprehension - expected).abs() < 1e-9);
    }

    #[test]
    fn scenario_1_recommends_proceed() {
        let v = scenario_1_vector();
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &[]);
        assert_eq!(action, Action::Proceed);
    }

    #[test]
    fn engagement_below_gate_blocks() {
        let mut v = scenario_1_vector();
        v.engagement = component(0.45);
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &[]);
        assert_eq!(action, Action::Block);
    }

    #[test]
    fn engagement_exactly_at_gate_passes() {
        let mut v = scenario_1_vector();
        v.engagement = component(0.60);
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &[]);
        assert_ne!(action, Action::Block);
    }

    #[test]
    fn high_uncertainty_forces_investigate() {
        let mut v = scenario_1_vector();
        v.uncertainty = component(0.85);
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &[]);
        assert_eq!(action, Action::Investigate);
    }

    #[test]
    fn high_priority_flag_forces_investigate() {
        let mut v = scenario_1_vector();
        v.execution_impact = flagged(0.65, 5);
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &[]);
        assert_eq!(action, Action::Investigate);
    }

    #[test]
    fn low_priority_flag_does_not_force_investigate() {
        let mut v = scenario_1_vector();
        v.execution_impact = flagged(0.65, 2);
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &[]);
        assert_eq!(action, Action::Proceed);
    }

    #[test]
    fn critical_threshold_breach_forces_investigate() {
        let v = scenario_1_vector();
        let thresholds = vec![ComponentBound {
            component: "comprehension_coherence",
            min: Some(0.90),
            max: None,
        }];
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &thresholds);
        assert_eq!(action, Action::Investigate);
    }

    #[test]
    fn low_confidence_without_flags_escalates() {
        let mut v = scenario_1_vector();
        v.execution_state = component(0.20);
        v.execution_change = component(0.20);
        v.execution_completion = component(0.20);
        v.execution_impact = component(0.20);
        v.uncertainty = component(0.30);
        let action = v.recommended_action(TierWeights::default(), 0.60, 0.70, &[]);
        assert_eq!(action, Action::Escalate);
    }

    #[test]
    fn to_flat_has_13_entries() {
        let v = scenario_1_vector();
        assert_eq!(v.to_flat().len(), 13);
    }

    #[test]
    fn alias_accessors_match_canonical_fields() {
        let v = scenario_1_vector();
        assert_eq!(v.know().score, v.foundation_know.score);
        assert_eq!(v.density().score, v.comprehension_density.score);
    }
}
