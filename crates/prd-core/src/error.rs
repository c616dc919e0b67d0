//! Error types for the PRD pipeline
//!
//! [`PrdError`] aggregates the per-crate errors:
//! - generation failures and cancellation
//! - diff resolution against unknown sections
//! - checkpoint lookup and validation
//! - configuration loading

use prd_checkpoint::CheckpointError;
use prd_diff::DiffError;
use prd_generation::GenerationError;
use prd_state::StateError;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PrdError {
    /// Generation capability failed
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// State mutation rejected
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Diff resolution failed
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// Checkpoint operation failed
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// A turn is already running
    #[error("a turn is already in progress")]
    Busy,
}

impl PrdError {
    /// Check if the error is a cancellation
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Generation(e) if e.is_cancelled())
    }

    /// Check if a lookup found nothing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Checkpoint(e) if e.is_not_found())
    }
}

impl From<toml::de::Error> for PrdError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::io::Error> for PrdError {
    fn from(e: std::io::Error) -> Self {
        Self::Config(e.to_string())
    }
}
