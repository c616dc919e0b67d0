//! Session triple and its shared live handle
//!
//! The three regions live in one [`SessionState`] value built on persistent
//! collections, so cloning it is cheap and replacing it is a single
//! assignment. [`SharedSession`] owns the live value behind a lock; every
//! mutation runs against a working copy that is swapped in only on success.

use crate::catalog::SectionCatalog;
use crate::conversation::ConversationState;
use crate::diff::{DiffState, SectionDiff};
use crate::document::DocumentState;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Conversation, document and diff regions of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Messages and generation flags
    pub conversation: ConversationState,
    /// Live sections and histories
    pub document: DocumentState,
    /// Proposals awaiting review
    pub diff: DiffState,
}

impl SessionState {
    /// Fresh session for `catalog`, opened by the assistant greeting
    #[must_use]
    pub fn from_catalog(catalog: &SectionCatalog) -> Self {
        Self {
            conversation: ConversationState::with_greeting(),
            document: DocumentState::from_catalog(catalog),
            diff: DiffState::new(),
        }
    }

    /// Outstanding diffs in document order
    #[must_use]
    pub fn pending_diffs(&self) -> Vec<SectionDiff> {
        let mut diffs: Vec<SectionDiff> = self.diff.pending_diffs.values().cloned().collect();
        diffs.sort_by_key(|d| self.document.position(d.section_id.as_str()).unwrap_or(usize::MAX));
        diffs
    }
}

/// Shared handle to the live session state
#[derive(Debug, Clone)]
pub struct SharedSession {
    catalog: Arc<SectionCatalog>,
    state: Arc<RwLock<SessionState>>,
}

impl SharedSession {
    /// New session laid out by `catalog`
    #[must_use]
    pub fn new(catalog: SectionCatalog) -> Self {
        let state = SessionState::from_catalog(&catalog);
        Self::with_state(catalog, state)
    }

    /// Wrap an existing state
    #[must_use]
    pub fn with_state(catalog: SectionCatalog, state: SessionState) -> Self {
        Self {
            catalog: Arc::new(catalog),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Section catalog of this session
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &SectionCatalog {
        &self.catalog
    }

    /// Shared catalog handle
    #[inline]
    #[must_use]
    pub fn catalog_arc(&self) -> Arc<SectionCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Point-in-time copy of the whole triple
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Read under the lock
    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.read())
    }

    /// Mutate a working copy and swap it in
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.state.write();
        let mut working = guard.clone();
        let out = f(&mut working);
        *guard = working;
        out
    }

    /// Mutate a working copy; swap it in only when `f` succeeds
    ///
    /// # Errors
    /// Whatever `f` returns; the live state is then unchanged.
    pub fn try_update<R, E>(
        &self,
        f: impl FnOnce(&mut SessionState) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut guard = self.state.write();
        let mut working = guard.clone();
        let out = f(&mut working)?;
        *guard = working;
        Ok(out)
    }

    /// Replace the whole triple, returning the previous one
    pub fn replace(&self, next: SessionState) -> SessionState {
        std::mem::replace(&mut *self.state.write(), next)
    }
}
