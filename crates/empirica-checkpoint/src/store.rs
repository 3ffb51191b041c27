use std::collections::BTreeSet;
use std::sync::Arc;

use empirica_core::content_hash::canonicalize;
use empirica_core::session_store::SessionStore;
use empirica_core::ContentHash;
use uuid::Uuid;

use crate::alias::{self, Alias};
use crate::diff::{diff_records, CheckpointDiff};
use crate::error::CheckpointError;
use crate::record::CheckpointRecord;

#[cfg(feature = "libgit2")]
use crate::notes::GitNotesBackend;

fn body_key(session_id: &str, hex_id: &str) -> String {
    format!("checkpoints/{session_id}/body/{hex_id}")
}

fn index_key(session_id: &str) -> String {
    format!("checkpoints/{session_id}/index")
}

fn session_meta_key(session_id: &str) -> String {
    format!("sessions/{session_id}")
}

/// Durable, content-addressed checkpoint storage. The session store holds
/// the full record bodies plus a per-session append-order index (the
/// authoritative history); an optional git-notes mirror
/// ([`GitNotesBackend`]) carries only the *latest* checkpoint per anchor
/// commit, for cross-repository shareability.
pub struct CheckpointStore {
    session_store: Arc<dyn SessionStore>,
    size_budget_bytes: usize,
    #[cfg(feature = "libgit2")]
    notes: Option<GitNotesBackend>,
}

impl CheckpointStore {
    pub fn new(session_store: Arc<dyn SessionStore>, size_budget_bytes: usize) -> Self {
        Self {
            session_store,
            size_budget_bytes,
            #[cfg(feature = "libgit2")]
            notes: None,
        }
    }

    #[cfg(feature = "libgit2")]
    pub fn with_git_notes(mut self, notes: GitNotesBackend) -> Self {
        self.notes = Some(notes);
        self
    }

    /// Append a checkpoint. Idempotent: appending an identical record twice
    /// yields the same id and a no-op second write.
    pub async fn append(&self, record: CheckpointRecord) -> Result<ContentHash, CheckpointError> {
        let id = record.id();
        if record.encoded_len() > self.size_budget_bytes {
            tracing::warn!(
                bytes = record.encoded_len(),
                budget = self.size_budget_bytes,
                "checkpoint exceeds size budget"
            );
        }

        let session_id = record.session_id.to_string();
        let hex_id = id.to_hex();
        let value = serde_json::to_value(&record).expect("CheckpointRecord always serializes");
        self.session_store
            .put(&body_key(&session_id, &hex_id), value)
            .await?;

        let mut index = self.read_index(&session_id).await?;
        if !index.contains(&hex_id) {
            index.push(hex_id.clone());
            self.session_store
                .put(&index_key(&session_id), serde_json::json!(index))
                .await?;
        }

        #[cfg(feature = "libgit2")]
        if let Some(notes) = &self.notes {
            let body = canonicalize(&serde_json::to_value(&record).unwrap());
            match notes.anchor_commit().and_then(|anchor| notes.write_note(anchor, &body)) {
                Ok(()) => {}
                Err(e) => tracing::warn!(error = %e, "git side-notes unavailable, degrading to session-store-only"),
            }
        }

        Ok(id)
    }

    async fn read_index(&self, session_id: &str) -> Result<Vec<String>, CheckpointError> {
        match self.session_store.get(&index_key(session_id)).await? {
            Some(value) => Ok(serde_json::from_value(value).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    async fn load(&self, session_id: &str, hex_id: &str) -> Result<CheckpointRecord, CheckpointError> {
        let value = self
            .session_store
            .get(&body_key(session_id, hex_id))
            .await?
            .ok_or_else(|| CheckpointError::NotFound(hex_id.to_string()))?;
        Ok(serde_json::from_value(value).map_err(empirica_core::session_store::SessionStoreError::from)?)
    }

    /// All checkpoints for `session_id`, ordered by timestamp ascending.
    pub async fn list(&self, session_id: &str) -> Result<Vec<CheckpointRecord>, CheckpointError> {
        let index = self.read_index(session_id).await?;
        let mut records = Vec::with_capacity(index.len());
        for hex_id in &index {
            records.push(self.load(session_id, hex_id).await?);
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    async fn is_active(&self, session_id: &str) -> Result<bool, CheckpointError> {
        match self.session_store.get(&session_meta_key(session_id)).await? {
            Some(value) => Ok(!value
                .get("terminal")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)),
            None => Ok(true),
        }
    }

    async fn all_session_ids(&self) -> Result<BTreeSet<String>, CheckpointError> {
        let keys = self.session_store.list_prefix("checkpoints").await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.split('/').nth(1).map(str::to_string))
            .collect())
    }

    /// Resolve a session id or alias (`latest`, `latest:active`,
    /// `latest:<ai_id>`, `latest:active:<ai_id>`) to a concrete session id.
    pub async fn resolve_alias(&self, input: &str) -> Result<String, CheckpointError> {
        match alias::parse(input) {
            Alias::Concrete(session_id) => Ok(session_id),
            Alias::Latest => self.resolve_global_latest(None, false).await,
            Alias::LatestActive => self.resolve_global_latest(None, true).await,
            Alias::LatestByAgent(ai_id) => self.resolve_global_latest(Some(ai_id), false).await,
            Alias::LatestActiveByAgent(ai_id) => self.resolve_global_latest(Some(ai_id), true).await,
        }
    }

    async fn resolve_global_latest(
        &self,
        ai_id_filter: Option<String>,
        active_only: bool,
    ) -> Result<String, CheckpointError> {
        let mut best: Option<(chrono::DateTime<chrono::Utc>, String)> = None;
        for session_id in self.all_session_ids().await? {
            if active_only && !self.is_active(&session_id).await? {
                continue;
            }
            let Some(checkpoint) = self.latest_in_session(&session_id, ai_id_filter.as_deref()).await? else {
                continue;
            };
            if best.as_ref().is_none_or(|(ts, _)| checkpoint.timestamp > *ts) {
                best = Some((checkpoint.timestamp, session_id));
            }
        }
        best.map(|(_, session_id)| session_id)
            .ok_or_else(|| CheckpointError::UnknownAlias(input_description(ai_id_filter, active_only)))
    }

    async fn latest_in_session(
        &self,
        session_id: &str,
        ai_id_filter: Option<&str>,
    ) -> Result<Option<CheckpointRecord>, CheckpointError> {
        let records = self.list(session_id).await?;
        Ok(records
            .into_iter()
            .filter(|r| ai_id_filter.is_none_or(|ai_id| r.ai_id == ai_id))
            .max_by_key(|r| r.timestamp))
    }

    /// The highest-timestamp checkpoint for `session_id`, optionally
    /// filtered to `agent_id`. `session_id` may be a concrete id or alias.
    pub async fn latest(
        &self,
        session_id: &str,
        agent_id: Option<&str>,
    ) -> Result<Option<CheckpointRecord>, CheckpointError> {
        let resolved = self.resolve_alias(session_id).await?;
        self.latest_in_session(&resolved, agent_id).await
    }

    pub async fn diff(
        &self,
        session_id: &str,
        a_id: &str,
        b_id: &str,
    ) -> Result<CheckpointDiff, CheckpointError> {
        let resolved = self.resolve_alias(session_id).await?;
        let a = self.load(&resolved, a_id).await?;
        let b = self.load(&resolved, b_id).await?;
        Ok(diff_records(&a, &b))
    }

    /// SHA-256 over the ordered concatenation of this session's checkpoint
    /// ids — used as `cascade_trace_hash` in EEP-1 signed payloads.
    pub async fn session_trace_hash(&self, session_id: &str) -> Result<ContentHash, CheckpointError> {
        let resolved = self.resolve_alias(session_id).await?;
        let records = self.list(&resolved).await?;
        if records.is_empty() {
            return Err(CheckpointError::EmptySession(resolved));
        }
        Ok(ContentHash::chain(records.iter().map(|r| r.id())))
    }
}

fn input_description(ai_id_filter: Option<String>, active_only: bool) -> String {
    match (ai_id_filter, active_only) {
        (Some(ai_id), true) => format!("latest:active:{ai_id}"),
        (Some(ai_id), false) => format!("latest:{ai_id}"),
        (None, true) => "latest:active".to_string(),
        (None, false) => "latest".to_string(),
    }
}
