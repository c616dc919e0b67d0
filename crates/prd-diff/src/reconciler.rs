//! Diff reconciliation
//!
//! Turns generated section content into pending diffs without touching live
//! sections. Each section is claimed by at most one outstanding diff; a new
//! proposal for a claimed section replaces the diff but keeps the episode
//! anchor (the content live before the first proposal).

use crate::error::DiffError;
use prd_state::{SectionDiff, SectionId, SessionState};
use serde::{Deserialize, Serialize};

/// Generated content for one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedUpdate {
    /// Target section
    pub section_id: SectionId,
    /// Generated content
    pub content: String,
}

impl ProposedUpdate {
    /// Create a proposal
    #[inline]
    #[must_use]
    pub fn new(section_id: impl Into<SectionId>, content: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            content: content.into(),
        }
    }
}

/// Outcome of resolving one section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Live content was written and the diff cleared
    Applied,
    /// Nothing was pending for the section
    NothingPending,
}

/// Stateless reconciliation rules over a [`SessionState`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffReconciler;

impl DiffReconciler {
    /// Create reconciler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Diffs the updates would produce; pure
    ///
    /// Updates equal to the current base (pending change, else live content)
    /// and updates for unknown sections produce nothing. When a section
    /// appears more than once, its last update wins.
    #[must_use]
    pub fn propose_diffs(
        &self,
        state: &SessionState,
        updates: &[ProposedUpdate],
    ) -> Vec<SectionDiff> {
        updates
            .iter()
            .enumerate()
            .filter(|(i, update)| {
                !updates[i + 1..].iter().any(|later| later.section_id == update.section_id)
            })
            .filter_map(|(_, update)| {
                let section = state.document.section(update.section_id.as_str())?;
                let pending = state.diff.pending_changes.get(update.section_id.as_str());
                let base = pending.unwrap_or(&section.content);
                if *base == update.content {
                    return None;
                }

                let old_content = pending
                    .and(state.diff.previous_content.get(update.section_id.as_str()))
                    .unwrap_or(&section.content)
                    .clone();

                Some(SectionDiff {
                    section_id: update.section_id.clone(),
                    title: section.title.clone(),
                    old_content,
                    new_content: update.content.clone(),
                })
            })
            .collect()
    }

    /// Record proposed diffs; returns true when any diff was recorded
    pub fn record(&self, state: &mut SessionState, diffs: &[SectionDiff]) -> bool {
        if diffs.is_empty() {
            return false;
        }
        for diff in diffs {
            let id = diff.section_id.clone();
            state.diff.pending_diffs.insert(id.clone(), diff.clone());
            if !state.diff.previous_content.contains_key(&id) {
                state.diff.previous_content.insert(id.clone(), diff.old_content.clone());
            }
            state.diff.pending_changes.insert(id, diff.new_content.clone());
        }
        state.diff.show_diff = true;
        true
    }

    /// Promote the pending change of `id` to live content
    ///
    /// # Errors
    /// [`DiffError::State`] if the section vanished from the document.
    pub fn accept_one(&self, state: &mut SessionState, id: &str) -> Result<Resolution, DiffError> {
        let Some(content) = state.diff.pending_changes.get(id).cloned() else {
            return Ok(Resolution::NothingPending);
        };
        state.document.set_content(&SectionId::new(id), content)?;
        state.diff.forget(id);
        tracing::debug!(section_id = id, "diff accepted");
        Ok(Resolution::Applied)
    }

    /// Restore the pre-episode content of `id`
    ///
    /// # Errors
    /// [`DiffError::State`] if the section vanished from the document.
    pub fn reject_one(&self, state: &mut SessionState, id: &str) -> Result<Resolution, DiffError> {
        let Some(content) = state.diff.previous_content.get(id).cloned() else {
            return Ok(Resolution::NothingPending);
        };
        state.document.set_content(&SectionId::new(id), content)?;
        state.diff.forget(id);
        tracing::debug!(section_id = id, "diff rejected");
        Ok(Resolution::Applied)
    }

    /// Promote every pending change, then clear the diff region
    ///
    /// # Errors
    /// [`DiffError::State`] if a section vanished from the document.
    pub fn accept_all(&self, state: &mut SessionState) -> Result<usize, DiffError> {
        let changes: Vec<(SectionId, String)> = state
            .diff
            .pending_changes
            .iter()
            .map(|(id, content)| (id.clone(), content.clone()))
            .collect();
        for (id, content) in &changes {
            state.document.set_content(id, content.clone())?;
        }
        state.diff.clear();
        Ok(changes.len())
    }

    /// Restore every pending section to its pre-episode content, then clear
    /// the diff region
    ///
    /// # Errors
    /// [`DiffError::State`] if a section vanished from the document.
    pub fn reject_all(&self, state: &mut SessionState) -> Result<usize, DiffError> {
        let mut restored = 0;
        let pending: Vec<SectionId> = state.diff.pending_diffs.keys().cloned().collect();
        for id in &pending {
            if let Some(previous) = state.diff.previous_content.get(id).cloned() {
                state.document.set_content(id, previous)?;
                restored += 1;
            }
        }
        state.diff.clear();
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prd_state::SectionCatalog;

    fn fresh() -> SessionState {
        SessionState::from_catalog(&SectionCatalog::prd_default())
    }

    #[test]
    fn unchanged_content_produces_no_diff() {
        let state = fresh();
        let live = state.document.content("scope").unwrap().to_string();
        let diffs =
            DiffReconciler::new().propose_diffs(&state, &[ProposedUpdate::new("scope", live)]);
        assert!(diffs.is_empty());
    }

    #[test]
    fn unknown_section_is_skipped() {
        let state = fresh();
        let diffs =
            DiffReconciler::new().propose_diffs(&state, &[ProposedUpdate::new("appendix", "x")]);
        assert!(diffs.is_empty());
    }

    #[test]
    fn duplicate_updates_keep_the_last() {
        let rec = DiffReconciler::new();
        let mut state = fresh();
        let original = state.document.content("scope").unwrap().to_string();

        let diffs = rec.propose_diffs(
            &state,
            &[
                ProposedUpdate::new("scope", "first"),
                ProposedUpdate::new("prototype", "p1"),
                ProposedUpdate::new("scope", "second"),
            ],
        );
        assert_eq!(diffs.len(), 2);
        let scope = diffs.iter().find(|d| d.section_id.as_str() == "scope").unwrap();
        assert_eq!(scope.new_content, "second");
        assert_eq!(scope.old_content, original);

        rec.record(&mut state, &diffs);
        assert_eq!(state.diff.pending_changes.get("scope").map(String::as_str), Some("second"));
        assert_eq!(state.diff.previous_content.get("scope"), Some(&original));

        // a trailing update equal to live content cancels the earlier one
        let diffs = rec.propose_diffs(
            &fresh(),
            &[ProposedUpdate::new("scope", "first"), ProposedUpdate::new("scope", original)],
        );
        assert!(diffs.is_empty());
    }

    #[test]
    fn episode_anchor_survives_second_proposal() {
        let rec = DiffReconciler::new();
        let mut state = fresh();
        let original = state.document.content("scope").unwrap().to_string();

        let first = rec.propose_diffs(&state, &[ProposedUpdate::new("scope", "v1")]);
        assert!(rec.record(&mut state, &first));
        let second = rec.propose_diffs(&state, &[ProposedUpdate::new("scope", "v2")]);
        assert_eq!(second[0].old_content, original);
        rec.record(&mut state, &second);

        assert_eq!(state.diff.pending_diffs.len(), 1);
        assert_eq!(state.diff.pending_changes.get("scope").map(String::as_str), Some("v2"));
        assert_eq!(state.document.content("scope"), Some(original.as_str()));

        // repeating the pending content is a no-op
        assert!(rec.propose_diffs(&state, &[ProposedUpdate::new("scope", "v2")]).is_empty());

        rec.reject_one(&mut state, "scope").unwrap();
        assert_eq!(state.document.content("scope"), Some(original.as_str()));
        assert!(!state.diff.show_diff);
    }

    #[test]
    fn accept_then_new_episode_anchors_on_accepted_content() {
        let rec = DiffReconciler::new();
        let mut state = fresh();
        let diffs = rec.propose_diffs(&state, &[ProposedUpdate::new("scope", "v1")]);
        rec.record(&mut state, &diffs);
        assert_eq!(rec.accept_one(&mut state, "scope").unwrap(), Resolution::Applied);
        assert_eq!(state.document.content("scope"), Some("v1"));

        let diffs = rec.propose_diffs(&state, &[ProposedUpdate::new("scope", "v2")]);
        rec.record(&mut state, &diffs);
        rec.reject_one(&mut state, "scope").unwrap();
        assert_eq!(state.document.content("scope"), Some("v1"));
    }

    #[test]
    fn resolving_nothing_is_a_no_op() {
        let rec = DiffReconciler::new();
        let mut state = fresh();
        let before = state.clone();
        assert_eq!(rec.accept_one(&mut state, "scope").unwrap(), Resolution::NothingPending);
        assert_eq!(rec.reject_one(&mut state, "scope").unwrap(), Resolution::NothingPending);
        assert_eq!(state, before);
    }

    #[test]
    fn bulk_resolution_clears_everything() {
        let rec = DiffReconciler::new();
        let mut state = fresh();
        let diffs = rec.propose_diffs(
            &state,
            &[ProposedUpdate::new("scope", "s1"), ProposedUpdate::new("prototype", "p1")],
        );
        rec.record(&mut state, &diffs);

        let mut rejected = state.clone();
        assert_eq!(rec.accept_all(&mut state).unwrap(), 2);
        assert_eq!(state.document.content("prototype"), Some("p1"));
        assert!(state.diff.pending_diffs.is_empty());
        assert!(state.diff.previous_content.is_empty());
        assert!(!state.diff.show_diff);

        assert_eq!(rec.reject_all(&mut rejected).unwrap(), 2);
        assert!(rejected.document.content("prototype").unwrap().starts_with("# Prototype\n"));
        assert!(rejected.diff.pending_changes.is_empty());
        assert!(!rejected.diff.show_diff);
    }
}
