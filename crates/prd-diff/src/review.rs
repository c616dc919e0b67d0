//! Review surface over a shared session
//!
//! Every operation runs as one swap of the session triple, so observers see
//! either the state before a resolution or the state after it.

use crate::error::DiffError;
use crate::reconciler::{DiffReconciler, ProposedUpdate, Resolution};
use prd_state::{SectionDiff, SharedSession};

/// Accept/reject operations bound to a live session
#[derive(Debug, Clone)]
pub struct DiffReview {
    session: SharedSession,
    reconciler: DiffReconciler,
}

impl DiffReview {
    /// Bind to a session
    #[must_use]
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            reconciler: DiffReconciler::new(),
        }
    }

    /// Propose and record in one step; returns the recorded diffs
    pub fn submit(&self, updates: &[ProposedUpdate]) -> Vec<SectionDiff> {
        self.session.update(|state| {
            let diffs = self.reconciler.propose_diffs(state, updates);
            self.reconciler.record(state, &diffs);
            diffs
        })
    }

    /// Outstanding diffs in document order
    #[must_use]
    pub fn pending_diffs(&self) -> Vec<SectionDiff> {
        self.session.read(prd_state::SessionState::pending_diffs)
    }

    /// Whether any diff is outstanding
    #[must_use]
    pub fn has_pending_diffs(&self) -> bool {
        self.session.read(|s| s.diff.has_pending())
    }

    /// Whether the review view is shown
    #[must_use]
    pub fn is_diff_view_shown(&self) -> bool {
        self.session.read(|s| s.diff.show_diff)
    }

    /// Set the review view, or flip it when `show` is `None`
    pub fn toggle_diff_view(&self, show: Option<bool>) {
        self.session.update(|s| {
            s.diff.show_diff = show.unwrap_or(!s.diff.show_diff);
        });
    }

    /// Accept the diff for `id`
    ///
    /// # Errors
    /// [`DiffError`] when the live write fails; state is then unchanged.
    pub fn accept_one(&self, id: &str) -> Result<Resolution, DiffError> {
        self.session.try_update(|s| self.reconciler.accept_one(s, id))
    }

    /// Reject the diff for `id`
    ///
    /// # Errors
    /// [`DiffError`] when the live write fails; state is then unchanged.
    pub fn reject_one(&self, id: &str) -> Result<Resolution, DiffError> {
        self.session.try_update(|s| self.reconciler.reject_one(s, id))
    }

    /// Accept every diff
    ///
    /// # Errors
    /// [`DiffError`] when a live write fails; state is then unchanged.
    pub fn accept_all(&self) -> Result<usize, DiffError> {
        let applied = self.session.try_update(|s| self.reconciler.accept_all(s))?;
        tracing::info!(applied, "accepted all pending diffs");
        Ok(applied)
    }

    /// Reject every diff
    ///
    /// # Errors
    /// [`DiffError`] when a live write fails; state is then unchanged.
    pub fn reject_all(&self) -> Result<usize, DiffError> {
        let restored = self.session.try_update(|s| self.reconciler.reject_all(s))?;
        tracing::info!(restored, "rejected all pending diffs");
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prd_state::SectionCatalog;

    #[test]
    fn toggle_and_resolve_through_shared_session() {
        let session = SharedSession::new(SectionCatalog::prd_default());
        let review = DiffReview::new(session.clone());

        let diffs = review.submit(&[ProposedUpdate::new("use-cases", "# Use Cases\nCheckout")]);
        assert_eq!(diffs.len(), 1);
        assert!(review.is_diff_view_shown());

        review.toggle_diff_view(None);
        assert!(!review.is_diff_view_shown());
        review.toggle_diff_view(Some(true));

        review.accept_one("use-cases").unwrap();
        assert!(!review.has_pending_diffs());
        assert!(!review.is_diff_view_shown());
        assert_eq!(
            session.read(|s| s.document.content("use-cases").map(str::to_string)),
            Some("# Use Cases\nCheckout".to_string())
        );
    }
}
