use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no identity registered for ai_id: {0}")]
    UnknownIdentity(String),

    #[error("identity already exists for {0} (pass overwrite=true to replace it)")]
    AlreadyExists(String),

    #[error("key material at {path} is corrupt: {reason}")]
    KeyLoadError { path: PathBuf, reason: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("signature verification failed for {sender_id}")]
    InvalidSignature { sender_id: String },
}
