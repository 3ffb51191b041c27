use empirica_vector::{canonicalize_name, ComponentBound, TierWeights, CANONICAL_NAMES};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One of the three investigation profiles. Overrides the cascade's
/// engagement gate, confidence-to-proceed threshold, and round budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationProfile {
    Cautious,
    Balanced,
    Autonomous,
}

impl Default for InvestigationProfile {
    fn default() -> Self {
        InvestigationProfile::Balanced
    }
}

/// The three cascade knobs an investigation profile overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileKnobs {
    pub engagement_gate: f64,
    pub confidence_to_proceed: f64,
    pub max_investigation_rounds: u32,
}

impl ProfileKnobs {
    pub const DEFAULT: ProfileKnobs = ProfileKnobs {
        engagement_gate: 0.60,
        confidence_to_proceed: 0.70,
        max_investigation_rounds: 7,
    };
}

impl InvestigationProfile {
    /// Resolve this profile's cascade-knob overrides. `cautious` raises the
    /// bar to proceed (higher required confidence, higher engagement gate)
    /// and doubles the round budget; `autonomous` lowers the bar and halves
    /// the budget; `balanced` reproduces the bare defaults.
    pub fn knobs(self) -> ProfileKnobs {
        match self {
            InvestigationProfile::Balanced => ProfileKnobs::DEFAULT,
            InvestigationProfile::Cautious => ProfileKnobs {
                engagement_gate: 0.70,
                confidence_to_proceed: 0.85,
                max_investigation_rounds: 14,
            },
            InvestigationProfile::Autonomous => ProfileKnobs {
                engagement_gate: 0.50,
                confidence_to_proceed: 0.55,
                max_investigation_rounds: 3,
            },
        }
    }
}

/// A per-component floor/ceiling that forces INVESTIGATE if breached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalThreshold {
    pub component: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// A stored persona profile: identity, priors, tier weights, critical
/// thresholds, focus domains, and an investigation profile selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub persona_id: String,
    pub display_name: String,
    /// Free-form tag (e.g. "security", "performance", "ux", "generalist").
    pub persona_type: String,
    /// Baseline scores, conceptual-name keyed for authorability (e.g.
    /// `"know"` rather than `"foundation_know"`); canonicalized on load.
    pub priors: HashMap<String, f64>,
    pub tier_weights: PersonaTierWeights,
    #[serde(default)]
    pub critical_thresholds: Vec<CriticalThreshold>,
    #[serde(default)]
    pub focus_domains: Vec<String>,
    #[serde(default)]
    pub investigation_profile: InvestigationProfile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PersonaTierWeights {
    pub engagement: f64,
    pub foundation: f64,
    pub comprehension: f64,
    pub execution: f64,
}

impl From<PersonaTierWeights> for TierWeights {
    fn from(w: PersonaTierWeights) -> Self {
        TierWeights {
            engagement: w.engagement,
            foundation: w.foundation,
            comprehension: w.comprehension,
            execution: w.execution,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("priors missing component: {0}")]
    MissingPrior(String),
    #[error("tier weights must sum to 1.0 (+/- 1e-6), got {0}")]
    TierWeightsDontSum(f64),
    #[error("threshold for {0} out of range [0,1]: {1}")]
    ThresholdOutOfRange(String, f64),
}

impl PersonaProfile {
    /// Validate that priors cover all 13 components, tier weights sum to
    /// 1.0 +/- 1e-6, and thresholds lie in [0,1].
    pub fn validate(&self) -> Result<(), PersonaError> {
        for name in CANONICAL_NAMES {
            if self.canonical_priors().get(name).is_none() {
                return Err(PersonaError::MissingPrior(name.to_string()));
            }
        }

        let sum = self.tier_weights.engagement
            + self.tier_weights.foundation
            + self.tier_weights.comprehension
            + self.tier_weights.execution;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(PersonaError::TierWeightsDontSum(sum));
        }

        for threshold in &self.critical_thresholds {
            for bound in [threshold.min, threshold.max].into_iter().flatten() {
                if !(0.0..=1.0).contains(&bound) {
                    return Err(PersonaError::ThresholdOutOfRange(
                        threshold.component.clone(),
                        bound,
                    ));
                }
            }
        }

        Ok(())
    }

    /// Priors re-keyed to canonical, tier-prefixed names.
    pub fn canonical_priors(&self) -> HashMap<&'static str, f64> {
        self.priors
            .iter()
            .filter_map(|(name, score)| canonicalize_name(name).map(|canonical| (canonical, *score)))
            .collect()
    }

    pub fn critical_bounds(&self) -> Vec<ComponentBound> {
        self.critical_thresholds
            .iter()
            .filter_map(|t| {
                canonicalize_name(&t.component).map(|component| ComponentBound {
                    component,
                    min: t.min,
                    max: t.max,
                })
            })
            .collect()
    }
}
