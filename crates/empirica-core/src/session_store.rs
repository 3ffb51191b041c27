//! Durable key-value session store.
//!
//! The keyspaces used by the rest of the core are `sessions/{id}`,
//! `assessments/{session_id}/{phase}/{round}`, `goals/{id}`, and
//! `identities/{ai_id}`; this crate only provides the generic `put`/`get`/
//! `list_prefix`/`delete_prefix` contract plus a file-backed reference
//! implementation. Single-writer-per-session is a caller-level invariant —
//! the store itself does not arbitrate between concurrent writers beyond
//! what the filesystem already gives a single process.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), SessionStoreError>;
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, SessionStoreError>;
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, SessionStoreError>;
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, SessionStoreError>;
}

/// File-backed `SessionStore`: one JSON file per key under `base_dir`, with
/// an in-process LRU read cache.
pub struct FileSessionStore {
    base_dir: PathBuf,
    cache: Mutex<LruCache<String, serde_json::Value>>,
}

impl FileSessionStore {
    /// Default base directory: `~/.empirica/sessions`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".empirica")
            .join("sessions")
    }

    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(256).unwrap())),
        }
    }

    async fn ensure_dir(&self, path: &Path) -> Result<(), SessionStoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Map a slash-separated key to a file path, preserving directory
    /// structure so prefix scans can walk the filesystem directly.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.base_dir.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path.set_extension("json");
        path
    }

    fn walk_prefix(dir: &Path, current_key: &str, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if path.is_dir() {
                let next_key = if current_key.is_empty() {
                    name
                } else {
                    format!("{current_key}/{name}")
                };
                Self::walk_prefix(&path, &next_key, out);
            } else if let Some(stem) = path.file_stem() {
                let stem = stem.to_string_lossy().to_string();
                let key = if current_key.is_empty() {
                    stem
                } else {
                    format!("{current_key}/{stem}")
                };
                out.push(key);
            }
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), SessionStoreError> {
        let path = self.path_for(key);
        self.ensure_dir(&path).await?;
        let text = serde_json::to_string_pretty(&value)?;
        tokio::fs::write(&path, text).await?;
        self.cache.lock().await.put(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, SessionStoreError> {
        if let Some(value) = self.cache.lock().await.get(key) {
            return Ok(Some(value.clone()));
        }
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let value: serde_json::Value = serde_json::from_str(&text)?;
                self.cache.lock().await.put(key.to_string(), value.clone());
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, SessionStoreError> {
        let mut dir = self.base_dir.clone();
        for segment in prefix.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        let mut keys = Vec::new();
        Self::walk_prefix(&dir, prefix.trim_end_matches('/'), &mut keys);
        keys.sort();
        Ok(keys)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, SessionStoreError> {
        let keys = self.list_prefix(prefix).await?;
        let mut removed = 0;
        for key in &keys {
            let path = self.path_for(key);
            if tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
                self.cache.lock().await.pop(key);
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (FileSessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (FileSessionStore::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let (store, _dir) = temp_store();
        store
            .put("sessions/abc", serde_json::json!({"phase": "PREFLIGHT"}))
            .await
            .unwrap();
        let value = store.get("sessions/abc").await.unwrap().unwrap();
        assert_eq!(value["phase"], "PREFLIGHT");
    }

    #[tokio::test]
    async fn get_missing_key_returns_none() {
        let (store, _dir) = temp_store();
        assert!(store.get("sessions/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_prefix_finds_nested_keys() {
        let (store, _dir) = temp_store();
        store
            .put("assessments/s1/PREFLIGHT/0", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        store
            .put("assessments/s1/CHECK/1", serde_json::json!({"a": 2}))
            .await
            .unwrap();
        let keys = store.list_prefix("assessments/s1").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn delete_prefix_removes_matching_keys() {
        let (store, _dir) = temp_store();
        store.put("goals/g1", serde_json::json!({})).await.unwrap();
        store.put("goals/g2", serde_json::json!({})).await.unwrap();
        let removed = store.delete_prefix("goals").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("goals/g1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_serves_without_rereading_disk() {
        let (store, dir) = temp_store();
        store
            .put("sessions/cached", serde_json::json!({"v": 1}))
            .await
            .unwrap();
        // Corrupt the file on disk directly; cached get should still succeed.
        let path = dir.path().join("sessions").join("cached.json");
        std::fs::write(&path, "not json").unwrap();
        let value = store.get("sessions/cached").await.unwrap().unwrap();
        assert_eq!(value["v"], 1);
    }
}
