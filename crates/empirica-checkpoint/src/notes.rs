//! libgit2-backed VCS side-notes. Only available with the `libgit2`
//! feature (enabled by default).
//!
//! Mirrors the checkpoint store's [`crate::record::CheckpointRecord`] onto
//! a note ref root, one note per anchor commit. Unlike the session-store
//! index, a note body holds only the *latest* checkpoint attached to that
//! commit — a second `append` targeting the same commit overwrites it
//! (last-writer-wins), matching the spec's VCS note semantics.

use std::path::Path;

use git2::{Oid, Repository, Signature};

use crate::error::CheckpointError;

/// Stateless wrapper over a discovered git repository, opened fresh per
/// call (cheap for local repos; avoids holding a stale index open).
pub struct GitNotesBackend {
    repo_path: std::path::PathBuf,
    note_ref_root: String,
}

impl GitNotesBackend {
    pub fn discover(workdir: impl AsRef<Path>, note_ref_root: impl Into<String>) -> Result<Self, CheckpointError> {
        let repo = Repository::discover(workdir.as_ref())?;
        Ok(Self {
            repo_path: repo.path().to_path_buf(),
            note_ref_root: note_ref_root.into(),
        })
    }

    fn open(&self) -> Result<Repository, CheckpointError> {
        Ok(Repository::open(&self.repo_path)?)
    }

    /// The commit this checkpoint store attaches notes to: HEAD, if it
    /// resolves to a commit. There is no dedicated per-session anchor
    /// commit — the note body instead carries the session id so a single
    /// commit can be shared by every session checkpointing against it.
    pub fn anchor_commit(&self) -> Result<Oid, CheckpointError> {
        let repo = self.open()?;
        let head = repo.head()?;
        let commit = head.peel_to_commit()?;
        Ok(commit.id())
    }

    /// Write (overwriting any prior content) the note body for `target` on
    /// this store's note-ref root.
    pub fn write_note(&self, target: Oid, body: &str) -> Result<(), CheckpointError> {
        let repo = self.open()?;
        let signature = Signature::now("empirica", "empirica@localhost")?;
        repo.note(
            &signature,
            &signature,
            Some(&self.note_ref_root),
            target,
            body,
            true,
        )?;
        Ok(())
    }

    pub fn read_note(&self, target: Oid) -> Result<Option<String>, CheckpointError> {
        let repo = self.open()?;
        match repo.find_note(Some(&self.note_ref_root), target) {
            Ok(note) => Ok(note.message().map(str::to_string)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let signature = Signature::now("test", "test@localhost").unwrap();
        let tree_id = {
            let mut index = repo.index().unwrap();
            index.write_tree().unwrap()
        };
        let tree = repo.find_tree(tree_id).unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
            .unwrap();
        repo
    }

    #[test]
    fn write_then_read_note_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let backend = GitNotesBackend::discover(dir.path(), "refs/notes/empirica/checkpoints").unwrap();
        let anchor = backend.anchor_commit().unwrap();
        backend.write_note(anchor, "{\"round\":0}").unwrap();
        let body = backend.read_note(anchor).unwrap();
        assert_eq!(body.as_deref(), Some("{\"round\":0}"));
    }

    #[test]
    fn second_write_overwrites_first() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let backend = GitNotesBackend::discover(dir.path(), "refs/notes/empirica/checkpoints").unwrap();
        let anchor = backend.anchor_commit().unwrap();
        backend.write_note(anchor, "{\"round\":0}").unwrap();
        backend.write_note(anchor, "{\"round\":1}").unwrap();
        let body = backend.read_note(anchor).unwrap();
        assert_eq!(body.as_deref(), Some("{\"round\":1}"));
    }

    #[test]
    fn missing_note_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let backend = GitNotesBackend::discover(dir.path(), "refs/notes/empirica/checkpoints").unwrap();
        let anchor = backend.anchor_commit().unwrap();
        assert_eq!(backend.read_note(anchor).unwrap(), None);
    }
}
