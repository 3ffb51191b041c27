//! Per-agent Ed25519 identities and the EEP-1 signed-payload format.

pub mod eep1;
pub mod error;
pub mod keypair;
pub mod store;

pub use eep1::SignedPayload;
pub use error::IdentityError;
pub use keypair::{PublicKeyRecord, Signature};
pub use store::IdentityStore;
