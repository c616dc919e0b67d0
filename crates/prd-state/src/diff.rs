//! Diff region: proposals awaiting review

use crate::section::SectionId;
use im::OrdMap;
use serde::{Deserialize, Serialize};

/// Proposed replacement of one section's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDiff {
    /// Target section
    pub section_id: SectionId,
    /// Section title at proposal time
    pub title: String,
    /// Content before the proposal episode began
    pub old_content: String,
    /// Proposed content
    pub new_content: String,
}

/// Pending review state
///
/// `previous_content` holds the content that was live before the first
/// proposal of an episode and is written once per episode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffState {
    /// At most one outstanding diff per section
    pub pending_diffs: OrdMap<SectionId, SectionDiff>,
    /// Whether the review view is shown
    pub show_diff: bool,
    /// Latest proposed content per section
    pub pending_changes: OrdMap<SectionId, String>,
    /// Pre-episode content per section
    pub previous_content: OrdMap<SectionId, String>,
}

impl DiffState {
    /// Empty diff state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when any diff is outstanding
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_diffs.is_empty()
    }

    /// Whether `id` has an outstanding diff
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending_diffs.contains_key(id)
    }

    /// Drop every entry for `id`
    pub fn forget(&mut self, id: &str) {
        self.pending_diffs.remove(id);
        self.pending_changes.remove(id);
        self.previous_content.remove(id);
        self.settle_view();
    }

    /// Drop everything
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Hide the review view once nothing is left to review
    pub fn settle_view(&mut self) {
        if self.pending_diffs.is_empty() {
            self.show_diff = false;
        }
    }
}
