//! SHA-256 content addressing over canonical JSON.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest, displayed and persisted as `sha256:<hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest: [u8; 32] = hasher.finalize().into();
        Self(digest)
    }

    /// Parse from `sha256:<hex>` or bare hex.
    pub fn from_string(s: &str) -> Result<Self, ContentHashError> {
        let hex_part = s.strip_prefix("sha256:").unwrap_or(s);
        if hex_part.len() != 64 {
            return Err(ContentHashError::InvalidLength(hex_part.len()));
        }
        let bytes = hex::decode(hex_part).map_err(|e| ContentHashError::InvalidHex(e.to_string()))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ContentHashError::InvalidLength(64))?;
        Ok(Self(digest))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// SHA-256 over the ordered concatenation of a sequence of hashes — used
    /// for `session_trace_hash` / `cascade_trace_hash`.
    pub fn chain(hashes: impl IntoIterator<Item = ContentHash>) -> Self {
        let mut hasher = Sha256::new();
        for h in hashes {
            hasher.update(h.0);
        }
        let digest: [u8; 32] = hasher.finalize().into();
        Self(digest)
    }

    pub fn verify(&self, data: &[u8]) -> bool {
        *self == Self::from_bytes(data)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentHashError {
    #[error("hash must be 64 hex chars, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Serialize a `serde_json::Value` as canonical JSON: UTF-8, keys sorted
/// recursively, no insignificant whitespace.
pub fn canonicalize(value: &serde_json::Value) -> String {
    let sorted = sort_value(value);
    serde_json::to_string(&sorted).expect("canonical json values are always serializable")
}

fn sort_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), sort_value(&map[k]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_value).collect())
        }
        other => other.clone(),
    }
}
