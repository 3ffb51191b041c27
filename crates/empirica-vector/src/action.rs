use serde::{Deserialize, Serialize};
use std::fmt;

/// The recommended action derived from an [`crate::EpistemicVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Block,
    Investigate,
    Proceed,
    Escalate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Block => "BLOCK",
            Action::Investigate => "INVESTIGATE",
            Action::Proceed => "PROCEED",
            Action::Escalate => "ESCALATE",
        };
        write!(f, "{s}")
    }
}
