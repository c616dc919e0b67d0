//! Section transition requests
//!
//! Detects when the user asks to move to a particular section, or just to
//! "move on", and resolves the latter to the least complete section.

use crate::completion::star_count;
use once_cell::sync::Lazy;
use prd_state::{DocumentState, Message, MessageContent, SectionCatalog, SectionId};
use regex::Regex;
use serde::{Deserialize, Serialize};

static GENERIC_TRANSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(next section|move on|proceed|continue|go ahead)\b")
        .expect("valid transition regex")
});

/// Where the user wants to go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "section_id")]
pub enum TransitionTarget {
    /// A named section
    Section(SectionId),
    /// Whichever section is least complete
    Next,
}

impl TransitionTarget {
    /// Section named by the request, if specific
    #[must_use]
    pub fn section_id(&self) -> Option<&SectionId> {
        match self {
            Self::Section(id) => Some(id),
            Self::Next => None,
        }
    }
}

/// Detect a transition request in `message`
///
/// Section phrases are checked in catalog order before the generic
/// "move on" phrases. Multi-part content is matched against its JSON form.
#[must_use]
pub fn detect_transition(catalog: &SectionCatalog, message: &Message) -> Option<TransitionTarget> {
    let text = match &message.content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => serde_json::to_string(parts).unwrap_or_default(),
    };

    if let Some(entry) = catalog.entries().iter().find(|e| e.is_transition_request(&text)) {
        return Some(TransitionTarget::Section(entry.id.clone()));
    }
    GENERIC_TRANSITION
        .is_match(&text)
        .then_some(TransitionTarget::Next)
}

/// Least complete section: fewest stars, ties broken by catalog order
///
/// Ratings are read from each section's last generated content.
#[must_use]
pub fn next_incomplete(catalog: &SectionCatalog, document: &DocumentState) -> Option<SectionId> {
    catalog
        .ids()
        .enumerate()
        .min_by_key(|(position, id)| {
            let history = document.history_of(id.as_str());
            (star_count(history.last_content_or_empty()), *position)
        })
        .map(|(_, id)| id.clone())
}

/// Section a transition lands on
#[must_use]
pub fn focus_section(
    catalog: &SectionCatalog,
    document: &DocumentState,
    target: &TransitionTarget,
) -> Option<SectionId> {
    match target {
        TransitionTarget::Section(id) => Some(id.clone()),
        TransitionTarget::Next => {
            let next = next_incomplete(catalog, document);
            if let Some(id) = &next {
                tracing::info!(section_id = %id, "Selected next section: {id}");
            }
            next
        }
    }
}
