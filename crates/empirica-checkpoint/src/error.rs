#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("session store error: {0}")]
    SessionStore(#[from] empirica_core::session_store::SessionStoreError),

    #[error("no checkpoints found for session {0}")]
    EmptySession(String),

    #[error("unknown checkpoint alias: {0}")]
    UnknownAlias(String),

    #[error("checkpoint not found: {0}")]
    NotFound(String),

    #[cfg(feature = "libgit2")]
    #[error("git side-notes error: {0}")]
    Git(#[from] git2::Error),
}
