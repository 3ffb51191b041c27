//! Foundation crate for Empirica — configuration, the consumed-interface
//! traits (LM transport, session store), canonical-JSON content addressing,
//! and the logging bootstrap shared by every other component crate.

pub mod config;
pub mod content_hash;
pub mod llm_transport;
pub mod session_store;
pub mod telemetry;

pub use config::EmpiricaConfig;
pub use content_hash::ContentHash;
pub use llm_transport::{LlmTransport, LlmTransportError};
pub use session_store::{FileSessionStore, SessionStore, SessionStoreError};
