//! Generation errors

/// Errors raised by a generation backend or the streaming driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Backend failed to produce a reply
    #[error("backend error: {0}")]
    Backend(String),

    /// Stream broke off mid-reply
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// Reply could not be parsed into the expected shape
    #[error("unparseable reply: {0}")]
    Parse(String),

    /// Backend returned no text
    #[error("empty response")]
    EmptyResponse,

    /// The caller aborted the request
    #[error("request cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Check if the caller aborted the request
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if retrying could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Stream(_) | Self::EmptyResponse)
    }
}
