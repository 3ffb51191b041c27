use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::keypair::{IdentityKeyPair, PublicKeyRecord};

#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    ai_id: String,
    #[serde(with = "hex_secret")]
    secret: [u8; 32],
}

mod hex_secret {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        hex::encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected 32 bytes, got {len}")))
    }
}

/// A one-file-per-`ai_id` local identity store. Private key material is
/// written with owner-only permissions and never leaves this process'
/// filesystem (it is distinct from the session store's `identities/{ai_id}`
/// keyspace, which holds only [`PublicKeyRecord`]s).
pub struct IdentityStore {
    dir: PathBuf,
}

impl IdentityStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".empirica")
            .join("identities")
    }

    fn path_for(&self, ai_id: &str) -> PathBuf {
        self.dir.join(format!("{ai_id}.json"))
    }

    /// Generate a new Ed25519 key pair for `ai_id` and persist it. Refuses
    /// to overwrite an existing identity unless `overwrite` is set.
    pub fn create_identity(
        &self,
        ai_id: &str,
        overwrite: bool,
    ) -> Result<PublicKeyRecord, IdentityError> {
        let path = self.path_for(ai_id);
        if path.exists() && !overwrite {
            return Err(IdentityError::AlreadyExists(ai_id.to_string()));
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| IdentityError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let keypair = IdentityKeyPair::generate(ai_id);
        self.persist(&keypair, &path)?;
        Ok(keypair.public_key_record())
    }

    fn persist(&self, keypair: &IdentityKeyPair, path: &Path) -> Result<(), IdentityError> {
        let stored = StoredIdentity {
            ai_id: keypair.ai_id().to_string(),
            secret: keypair.secret_bytes(),
        };
        let json = serde_json::to_string_pretty(&stored).expect("StoredIdentity always serializes");
        std::fs::write(path, json).map_err(|source| IdentityError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        set_owner_only_permissions(path)?;
        Ok(())
    }

    /// Load the key pair for `ai_id` from disk.
    pub fn load(&self, ai_id: &str) -> Result<IdentityKeyPair, IdentityError> {
        let path = self.path_for(ai_id);
        let text = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IdentityError::UnknownIdentity(ai_id.to_string())
            } else {
                IdentityError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let stored: StoredIdentity =
            serde_json::from_str(&text).map_err(|e| IdentityError::KeyLoadError {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if stored.ai_id != ai_id {
            return Err(IdentityError::KeyLoadError {
                path,
                reason: format!("ai_id mismatch: file contains {}", stored.ai_id),
            });
        }
        Ok(IdentityKeyPair::from_bytes(stored.ai_id, &stored.secret))
    }

    pub fn export_public_key(&self, ai_id: &str) -> Result<String, IdentityError> {
        Ok(self.load(ai_id)?.public_key_record().to_pem())
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), IdentityError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|source| {
        IdentityError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), IdentityError> {
    Ok(())
}
