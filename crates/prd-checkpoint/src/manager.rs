//! Checkpoint manager
//!
//! Keeps the ordered checkpoint list and the single restored slot for one
//! session. Restore and undo replace the live triple in one assignment.

use crate::checkpoint::{Checkpoint, RawCheckpoint};
use crate::error::CheckpointError;
use parking_lot::Mutex;
use prd_state::{SessionState, SharedSession};
use std::path::Path;

/// Active restoration and the state it replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredCheckpoint {
    /// Checkpoint currently shown
    pub checkpoint: Checkpoint,
    /// Live triple captured right before the restore
    pub previous_state: SessionState,
}

#[derive(Debug, Default)]
struct CheckpointStore {
    checkpoints: Vec<Checkpoint>,
    restored: Option<RestoredCheckpoint>,
}

impl CheckpointStore {
    fn insert(&mut self, checkpoint: Checkpoint) {
        let len = checkpoint.conversation_len();
        self.checkpoints.retain(|cp| cp.conversation_len() != len);
        self.checkpoints.push(checkpoint);
    }

    fn find(&self, conversation_len: usize) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|cp| cp.conversation_len() == conversation_len)
    }
}

/// Creates, restores and undoes checkpoints of a live session
#[derive(Debug)]
pub struct CheckpointManager {
    session: SharedSession,
    store: Mutex<CheckpointStore>,
}

impl CheckpointManager {
    /// Manager for `session` with no checkpoints
    #[must_use]
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            store: Mutex::new(CheckpointStore::default()),
        }
    }

    /// Snapshot the live triple
    ///
    /// A checkpoint with the same conversation length is replaced.
    ///
    /// # Errors
    /// [`CheckpointError::Invalid`] if the snapshot is incomplete.
    pub fn create(&self) -> Result<Checkpoint, CheckpointError> {
        let checkpoint = Checkpoint::capture(&self.session.snapshot());
        let verdict = RawCheckpoint::from(checkpoint.clone()).validate();
        if !verdict.is_valid {
            return Err(CheckpointError::Invalid(verdict.error.unwrap_or_default()));
        }

        tracing::debug!(
            checkpoint_id = checkpoint.id(),
            messages = checkpoint.conversation_len(),
            "checkpoint created"
        );
        self.store.lock().insert(checkpoint.clone());
        Ok(checkpoint)
    }

    /// Show the checkpoint recorded at `conversation_len` messages
    ///
    /// Document and diff regions are replaced by the checkpoint's; the
    /// conversation keeps its messages so later ones can be marked, and
    /// its transient flags are reset. Over an active restoration, the state
    /// it replaced stays the one undo returns to.
    ///
    /// # Errors
    /// [`CheckpointError::NotFound`] when no checkpoint has that length;
    /// nothing changes then.
    pub fn restore_by_turn_index(
        &self,
        conversation_len: usize,
    ) -> Result<Checkpoint, CheckpointError> {
        let mut store = self.store.lock();
        let checkpoint = store
            .find(conversation_len)
            .cloned()
            .ok_or(CheckpointError::NotFound(conversation_len))?;

        let previous_state = match store.restored.take() {
            Some(active) => {
                tracing::debug!("replacing active restoration");
                active.previous_state
            }
            None => self.session.snapshot(),
        };
        let next = SessionState {
            conversation: previous_state.conversation.settled(),
            document: checkpoint.state().document.clone(),
            diff: checkpoint.state().diff.clone(),
        };
        self.session.replace(next);

        tracing::info!(
            checkpoint_id = checkpoint.id(),
            messages = conversation_len,
            "checkpoint restored"
        );
        store.restored = Some(RestoredCheckpoint {
            checkpoint: checkpoint.clone(),
            previous_state,
        });
        Ok(checkpoint)
    }

    /// Reinstate the triple replaced by the active restoration
    ///
    /// # Errors
    /// [`CheckpointError::NoPreviousState`] without an active restoration.
    pub fn undo(&self) -> Result<(), CheckpointError> {
        let mut store = self.store.lock();
        let restored = store.restored.take().ok_or(CheckpointError::NoPreviousState)?;
        self.session.replace(restored.previous_state);
        tracing::info!(checkpoint_id = restored.checkpoint.id(), "restoration undone");
        Ok(())
    }

    /// Close an active restoration before a new turn
    ///
    /// Truncates the conversation back to the restored checkpoint's length
    /// and clears the restored slot. Returns that length, if any.
    pub fn begin_turn(&self) -> Option<usize> {
        let mut store = self.store.lock();
        let restored = store.restored.take()?;
        let len = restored.checkpoint.conversation_len();
        self.session.update(|s| s.conversation.truncate(len));
        tracing::debug!(messages = len, "conversation truncated to restored checkpoint");
        Some(len)
    }

    /// Whether a checkpoint exists at `conversation_len`
    #[must_use]
    pub fn has_checkpoint_at(&self, conversation_len: usize) -> bool {
        self.store.lock().find(conversation_len).is_some()
    }

    /// Whether the active restoration is at `conversation_len`
    #[must_use]
    pub fn is_restored_at(&self, conversation_len: usize) -> bool {
        self.store
            .lock()
            .restored
            .as_ref()
            .is_some_and(|r| r.checkpoint.conversation_len() == conversation_len)
    }

    /// Whether message `index` lies at or past the active restoration
    #[must_use]
    pub fn is_after_restored(&self, index: usize) -> bool {
        self.store
            .lock()
            .restored
            .as_ref()
            .is_some_and(|r| index >= r.checkpoint.conversation_len())
    }

    /// Active restoration, if any
    #[must_use]
    pub fn restored(&self) -> Option<RestoredCheckpoint> {
        self.store.lock().restored.clone()
    }

    /// All checkpoints in creation order
    #[must_use]
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.store.lock().checkpoints.clone()
    }

    /// Remove a checkpoint by id
    pub fn remove(&self, id: &str) -> bool {
        let mut store = self.store.lock();
        let before = store.checkpoints.len();
        store.checkpoints.retain(|cp| cp.id() != id);
        before != store.checkpoints.len()
    }

    /// Drop every checkpoint and the restored slot
    pub fn clear(&self) {
        let mut store = self.store.lock();
        store.checkpoints.clear();
        store.restored = None;
    }

    /// Write the checkpoint list as JSON
    ///
    /// # Errors
    /// Encoding or filesystem failures.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<usize, CheckpointError> {
        let checkpoints = self.checkpoints();
        let json = serde_json::to_vec_pretty(&checkpoints)?;
        tokio::fs::write(path.as_ref(), json).await?;
        tracing::info!(
            count = checkpoints.len(),
            path = %path.as_ref().display(),
            "checkpoints saved"
        );
        Ok(checkpoints.len())
    }

    /// Load checkpoints written by [`Self::save_to`], replacing the list
    ///
    /// Invalid records are skipped with a warning. Returns how many were
    /// loaded.
    ///
    /// # Errors
    /// Decoding or filesystem failures.
    pub async fn load_from(&self, path: impl AsRef<Path>) -> Result<usize, CheckpointError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let records: Vec<RawCheckpoint> = serde_json::from_slice(&bytes)?;

        let mut loaded = CheckpointStore::default();
        for (index, record) in records.into_iter().enumerate() {
            match Checkpoint::try_from(record) {
                Ok(cp) => loaded.insert(cp),
                Err(e) => tracing::warn!(index, error = %e, "skipping invalid checkpoint"),
            }
        }

        let count = loaded.checkpoints.len();
        let mut store = self.store.lock();
        store.checkpoints = loaded.checkpoints;
        store.restored = None;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prd_state::{Message, SectionCatalog, SectionId};

    fn session() -> SharedSession {
        SharedSession::new(SectionCatalog::prd_default())
    }

    #[test]
    fn same_length_checkpoint_is_replaced() {
        let session = session();
        let manager = CheckpointManager::new(session.clone());
        let first = manager.create().unwrap();
        let second = manager.create().unwrap();

        let all = manager.checkpoints();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), second.id());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn restore_missing_index_changes_nothing() {
        let session = session();
        let manager = CheckpointManager::new(session.clone());
        manager.create().unwrap();
        let before = session.snapshot();

        let err = manager.restore_by_turn_index(7).unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(7)));
        assert_eq!(err.to_string(), "no checkpoint found at index 7");
        assert_eq!(session.snapshot(), before);
        assert!(manager.restored().is_none());
    }

    #[test]
    fn undo_without_restore_fails() {
        let manager = CheckpointManager::new(session());
        let err = manager.undo().unwrap_err();
        assert_eq!(err.to_string(), "no previous state to restore");
    }

    #[test]
    fn queries_track_restored_slot() {
        let session = session();
        let manager = CheckpointManager::new(session.clone());
        manager.create().unwrap();
        session.update(|s| s.conversation.push(Message::user("one")));
        manager.create().unwrap();
        session.update(|s| s.conversation.push(Message::assistant("two")));

        assert!(manager.has_checkpoint_at(1));
        assert!(manager.has_checkpoint_at(2));
        assert!(!manager.has_checkpoint_at(3));

        manager.restore_by_turn_index(1).unwrap();
        assert!(manager.is_restored_at(1));
        assert!(!manager.is_restored_at(2));
        assert!(manager.is_after_restored(1));
        assert!(manager.is_after_restored(2));
        assert!(!manager.is_after_restored(0));
        // messages stay visible while restored
        assert_eq!(session.read(|s| s.conversation.len()), 3);

        assert_eq!(manager.begin_turn(), Some(1));
        assert_eq!(session.read(|s| s.conversation.len()), 1);
        assert!(manager.restored().is_none());
        assert_eq!(manager.begin_turn(), None);
    }

    #[test]
    fn restore_while_restored_replaces_slot() {
        let session = session();
        let manager = CheckpointManager::new(session.clone());
        manager.create().unwrap();
        session.update(|s| {
            s.conversation.push(Message::user("one"));
            s.document.set_content(&SectionId::new("scope"), "# Scope of the Project\nv1").unwrap();
        });
        manager.create().unwrap();

        manager.restore_by_turn_index(1).unwrap();
        manager.restore_by_turn_index(2).unwrap();
        assert!(manager.is_restored_at(2));
        assert_eq!(
            session.read(|s| s.document.content("scope").map(str::to_string)),
            Some("# Scope of the Project\nv1".to_string())
        );
    }

    #[test]
    fn undo_after_second_restore_returns_live_state() {
        let session = session();
        let manager = CheckpointManager::new(session.clone());
        manager.create().unwrap();
        session.update(|s| {
            s.conversation.push(Message::user("one"));
            s.document.set_content(&SectionId::new("scope"), "# Scope of the Project\nv1").unwrap();
        });
        manager.create().unwrap();
        session.update(|s| {
            s.conversation.push(Message::assistant("two"));
            let latest = "# Scope of the Project\nlatest";
            s.document.set_content(&SectionId::new("scope"), latest).unwrap();
        });
        let live = session.snapshot();

        manager.restore_by_turn_index(1).unwrap();
        manager.restore_by_turn_index(2).unwrap();
        manager.undo().unwrap();

        assert_eq!(session.snapshot(), live);
        assert_eq!(session.read(|s| s.conversation.len()), 3);
        assert!(manager.restored().is_none());
    }

    #[test]
    fn remove_and_clear() {
        let session = session();
        let manager = CheckpointManager::new(session.clone());
        let cp = manager.create().unwrap();
        assert!(manager.remove(cp.id()));
        assert!(!manager.remove(cp.id()));
        manager.create().unwrap();
        manager.restore_by_turn_index(1).unwrap();
        manager.clear();
        assert!(manager.checkpoints().is_empty());
        assert!(manager.restored().is_none());
    }
}
