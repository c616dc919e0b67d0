//! State errors

use crate::section::SectionId;

/// Errors raised while building or mutating session state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Section id is not part of the catalog
    #[error("unknown section: {0}")]
    UnknownSection(SectionId),

    /// Catalog lists the same id twice
    #[error("duplicate section in catalog: {0}")]
    DuplicateSection(SectionId),

    /// Catalog has no sections
    #[error("section catalog is empty")]
    EmptyCatalog,
}
