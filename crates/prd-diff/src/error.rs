//! Diff errors

use prd_state::StateError;

/// Errors raised while resolving diffs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Live state rejected the write
    #[error("state error: {0}")]
    State(#[from] StateError),
}
