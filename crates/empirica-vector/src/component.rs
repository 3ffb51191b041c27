use serde::{Deserialize, Serialize};

/// A scored belief on a single dimension of the epistemic vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorComponent {
    pub score: f64,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub warrants_investigation: bool,
    pub investigation_priority: u8,
}

impl VectorComponent {
    pub fn new(
        score: f64,
        rationale: impl Into<String>,
        warrants_investigation: bool,
        investigation_priority: u8,
    ) -> Result<Self, ComponentError> {
        let component = Self {
            score,
            rationale: rationale.into(),
            evidence: None,
            warrants_investigation,
            investigation_priority,
        };
        component.validate()?;
        Ok(component)
    }

    pub fn validate(&self) -> Result<(), ComponentError> {
        if !(0.0..=1.0).contains(&self.score) {
            return Err(ComponentError::OutOfRange("score".into(), self.score));
        }
        if self.investigation_priority > 10 {
            return Err(ComponentError::OutOfRange(
                "investigation_priority".into(),
                self.investigation_priority as f64,
            ));
        }
        if self.warrants_investigation && self.investigation_priority < 1 {
            return Err(ComponentError::InconsistentFlags);
        }
        Ok(())
    }
}

/// A component as received from the parser, before validation freezes it
/// into a [`VectorComponent`]. Distinct type so callers can't accidentally
/// construct an already-"validated" component without going through
/// [`VectorComponent::new`] or [`VectorComponent::validate`].
pub type ComponentInput = VectorComponent;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ComponentError {
    #[error("{0} out of range: {1}")]
    OutOfRange(String, f64),
    #[error("warrants_investigation is true but investigation_priority is 0")]
    InconsistentFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_component_constructs() {
        let c = VectorComponent::new(0.5, "reasonable", false, 0).unwrap();
        assert_eq!(c.score, 0.5);
    }

    #[test]
    fn score_out_of_range_rejected() {
        assert!(VectorComponent::new(1.5, "bad", false, 0).is_err());
        assert!(VectorComponent::new(-0.1, "bad", false, 0).is_err());
    }

    #[test]
    fn warrants_investigation_requires_priority() {
        let err = VectorComponent::new(0.5, "flagged", true, 0).unwrap_err();
        assert_eq!(err, ComponentError::InconsistentFlags);
    }

    #[test]
    fn priority_above_ten_rejected() {
        assert!(VectorComponent::new(0.5, "x", true, 11).is_err());
    }
}
