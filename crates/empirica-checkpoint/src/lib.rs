//! The checkpoint store: content-addressed, append-only checkpoint records
//! backed by the session store, with an optional VCS side-notes mirror.

pub mod alias;
pub mod diff;
pub mod error;
#[cfg(feature = "libgit2")]
pub mod notes;
pub mod record;
pub mod store;

pub use diff::{diff_records, CheckpointDiff};
pub use error::CheckpointError;
#[cfg(feature = "libgit2")]
pub use notes::GitNotesBackend;
pub use record::{CheckpointRecord, Phase};
pub use store::CheckpointStore;
