//! Sections and their generation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Stable identifier of a document section (e.g. `"scope"`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    /// Create a section id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for SectionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One live section of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section identity
    pub id: SectionId,
    /// Human-readable title
    pub title: String,
    /// Authoritative markdown content
    pub content: String,
}

impl Section {
    /// Create a section
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<SectionId>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// A section counts as not started while it holds only its heading and
    /// placeholder line.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.content.split('\n').count() <= 2
    }
}

/// Per-section memory carried between generations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHistory {
    /// Most recently generated content
    pub last_content: Option<String>,
    /// When `last_content` was produced
    pub last_update: Option<DateTime<Utc>>,
    /// Input the last accepted generation was built from
    pub last_relevant_info: String,
    /// Rolling summary of section-relevant conversation
    pub chat_summary: String,
}

impl SectionHistory {
    /// Record freshly generated content, keeping the rest of the history
    #[must_use]
    pub fn with_generated(&self, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            last_content: Some(content.into()),
            last_update: Some(at),
            ..self.clone()
        }
    }

    /// Previous content, or empty when nothing was ever generated
    #[inline]
    #[must_use]
    pub fn last_content_or_empty(&self) -> &str {
        self.last_content.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_detection() {
        let fresh = Section::new(
            "scope",
            "Scope of the Project",
            "# Scope of the Project\nThis section will be populated as you provide information.",
        );
        assert!(fresh.is_placeholder());

        let filled = Section::new("scope", "Scope of the Project", "# Scope\nIn scope:\n- billing");
        assert!(!filled.is_placeholder());
    }

    #[test]
    fn generated_content_keeps_summary() {
        let history = SectionHistory {
            chat_summary: "Latest update: budget".into(),
            ..SectionHistory::default()
        };
        let now = Utc::now();
        let next = history.with_generated("# Scope\nbody", now);

        assert_eq!(next.last_content.as_deref(), Some("# Scope\nbody"));
        assert_eq!(next.last_update, Some(now));
        assert_eq!(next.chat_summary, "Latest update: budget");
    }

    #[test]
    fn section_id_serializes_as_string() {
        let id = SectionId::new("data-model");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"data-model\"");
        assert_eq!(id.to_string(), "data-model");
    }
}
