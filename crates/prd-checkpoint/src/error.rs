//! Checkpoint errors

/// Errors raised by checkpoint operations
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// No checkpoint records this conversation length
    #[error("no checkpoint found at index {0}")]
    NotFound(usize),

    /// Undo requested without an active restoration
    #[error("no previous state to restore")]
    NoPreviousState,

    /// Checkpoint is missing required data
    #[error("invalid checkpoint: {0}")]
    Invalid(String),

    /// Persistence failed
    #[error("checkpoint io error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data could not be encoded or decoded
    #[error("checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckpointError {
    /// Check if the error is a failed lookup
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoPreviousState)
    }
}
