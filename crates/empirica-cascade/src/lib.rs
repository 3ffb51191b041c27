//! The cascade state machine: the composition root that drives one agent's
//! epistemic self-assessment through PREFLIGHT → (THINK) → INVESTIGATE* →
//! CHECK → ACT → POSTFLIGHT, writing a checkpoint at every phase boundary
//! and landing in one of five terminal states.

pub mod cascade;
pub mod error;
pub mod message;
pub mod state;

pub use cascade::{CancelToken, Cascade, CascadeOutcome, InvestigationRoundLog};
pub use error::CascadeError;
pub use message::{sign_envelope, verify_envelope, verify_inbound, MessageEnvelope, MessageType};
pub use state::{can_transition, PhaseTransitionRecord};
