//! Document region: live sections and per-section history

use crate::catalog::SectionCatalog;
use crate::error::StateError;
use crate::section::{Section, SectionHistory, SectionId};
use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

/// Sections in document order plus their generation histories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    /// Live sections, one per catalog entry
    pub sections: Vector<Section>,
    /// Generation memory keyed by section
    #[serde(default)]
    pub history: OrdMap<SectionId, SectionHistory>,
}

impl DocumentState {
    /// Fresh document laid out by `catalog`
    #[must_use]
    pub fn from_catalog(catalog: &SectionCatalog) -> Self {
        Self {
            sections: catalog.initial_sections().into_iter().collect(),
            history: OrdMap::new(),
        }
    }

    /// Look up a section
    #[must_use]
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id.as_str() == id)
    }

    /// Live content of a section
    #[must_use]
    pub fn content(&self, id: &str) -> Option<&str> {
        self.section(id).map(|s| s.content.as_str())
    }

    /// Replace the live content of a section
    ///
    /// # Errors
    /// [`StateError::UnknownSection`] when `id` is not in the document.
    pub fn set_content(
        &mut self,
        id: &SectionId,
        content: impl Into<String>,
    ) -> Result<(), StateError> {
        let index = self
            .sections
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| StateError::UnknownSection(id.clone()))?;
        let mut section = self.sections[index].clone();
        section.content = content.into();
        self.sections.set(index, section);
        Ok(())
    }

    /// History of a section, empty when never generated
    #[must_use]
    pub fn history_of(&self, id: &str) -> SectionHistory {
        self.history.get(id).cloned().unwrap_or_default()
    }

    /// Overwrite the history of a section
    pub fn set_history(&mut self, id: SectionId, history: SectionHistory) {
        self.history.insert(id, history);
    }

    /// Position of a section in document order
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_content_replaces_only_target() {
        let catalog = SectionCatalog::prd_default();
        let mut doc = DocumentState::from_catalog(&catalog);
        let before = doc.clone();

        doc.set_content(&SectionId::new("scope"), "# Scope of the Project\nBilling only")
            .unwrap();

        assert_eq!(doc.content("scope"), Some("# Scope of the Project\nBilling only"));
        assert_eq!(doc.content("prototype"), before.content("prototype"));
        // the earlier value is untouched
        assert_ne!(before.content("scope"), doc.content("scope"));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let mut doc = DocumentState::from_catalog(&SectionCatalog::prd_default());
        let err = doc.set_content(&SectionId::new("appendix"), "x").unwrap_err();
        assert_eq!(err, StateError::UnknownSection(SectionId::new("appendix")));
    }

    #[test]
    fn missing_history_defaults() {
        let doc = DocumentState::from_catalog(&SectionCatalog::prd_default());
        assert_eq!(doc.history_of("scope"), SectionHistory::default());
    }
}
