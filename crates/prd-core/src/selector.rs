//! Section selection
//!
//! Turns the latest message into per-section inputs. The result is an
//! [`IndexMap`] in catalog order so fan-out and reporting stay stable.

use crate::config::SelectionPolicy;
use crate::transition::TransitionTarget;
use indexmap::IndexMap;
use prd_state::{Message, SectionCatalog, SectionId};
use serde::{Deserialize, Serialize};

/// Input for one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInput {
    /// Whether the section should be regenerated
    pub should_update: bool,
    /// Text the section should incorporate
    pub relevant_info: String,
}

/// Ordered per-section inputs
pub type SectionSelection = IndexMap<SectionId, SectionInput>;

/// Chooses sections for a relevant turn
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionSelector {
    policy: SelectionPolicy,
}

impl SectionSelector {
    /// Create selector
    #[inline]
    #[must_use]
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Inputs for every section that should update, in catalog order
    ///
    /// `transition` is only consulted by the trigger policy, where the
    /// targeted section is always included.
    #[must_use]
    pub fn select_sections(
        &self,
        catalog: &SectionCatalog,
        messages: &[Message],
        transition: Option<&TransitionTarget>,
    ) -> SectionSelection {
        let Some(latest) = messages.last() else {
            return SectionSelection::new();
        };
        let info = latest.text();

        let selection = match self.policy {
            SelectionPolicy::TotalFanOut => fan_out(catalog, &info),
            SelectionPolicy::TriggerBased => {
                let targeted = transition.and_then(TransitionTarget::section_id);
                let picked: SectionSelection = catalog
                    .entries()
                    .iter()
                    .filter(|e| e.should_update_when(&info) || targeted == Some(&e.id))
                    .map(|e| (e.id.clone(), input(&info)))
                    .collect();
                if picked.is_empty() {
                    tracing::debug!("no section triggers matched, falling back to total fan-out");
                    fan_out(catalog, &info)
                } else {
                    picked
                }
            }
        };

        tracing::debug!(
            policy = ?self.policy,
            sections = selection.len(),
            "sections selected"
        );
        selection
    }
}

fn input(info: &str) -> SectionInput {
    SectionInput {
        should_update: true,
        relevant_info: info.to_string(),
    }
}

fn fan_out(catalog: &SectionCatalog, info: &str) -> SectionSelection {
    catalog.ids().map(|id| (id.clone(), input(info))).collect()
}
