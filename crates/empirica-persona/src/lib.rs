//! Persona profiles (priors, tier weights, critical thresholds, focus
//! domains, investigation profile) and the phase-dependent prior blender.

pub mod blend;
pub mod profile;
pub mod registry;

pub use blend::{blend_priors, blend_strength};
pub use profile::{
    CriticalThreshold, InvestigationProfile, PersonaError, PersonaProfile, ProfileKnobs,
};
pub use registry::{PersonaRegistry, RegistryError};
