//! Backend contract
//!
//! The transport to a text-generation service is external. Implement
//! [`GenerationBackend`] to plug one in.

use crate::error::GenerationError;
use crate::types::{Completion, GenerationRequest, StreamEvent};
use futures::stream::BoxStream;

/// Stream of reply events
pub type EventStream = BoxStream<'static, Result<StreamEvent, GenerationError>>;

/// Text-generation capability
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce the whole reply at once
    async fn complete(&self, request: GenerationRequest) -> Result<Completion, GenerationError>;

    /// Open a streamed reply
    async fn stream(&self, request: GenerationRequest) -> Result<EventStream, GenerationError>;
}
