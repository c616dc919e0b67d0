//! PRD Generation
//!
//! Contract between the pipeline and an external text-generation backend.
//!
//! # Core Concepts
//!
//! - [`GenerationBackend`]: the pluggable capability (one-shot or streamed)
//! - [`GenerationClient`]: logging, JSON parsing and the streaming driver
//! - [`StreamCallbacks`]: token/chunk/complete/error observer
//! - [`TypingPacer`]: presentation-only pacing of streamed tokens
//!
//! Cancellation uses a [`tokio_util::sync::CancellationToken`]; an aborted
//! stream resolves to [`GenerationError::Cancelled`] and never reaches
//! `on_error`.

#![warn(unreachable_pub)]

pub mod backend;
pub mod callbacks;
pub mod client;
pub mod error;
pub mod pacer;
pub mod types;

pub use backend::{EventStream, GenerationBackend};
#[cfg(any(test, feature = "mock"))]
pub use backend::MockGenerationBackend;
pub use callbacks::{NoopCallbacks, StreamCallbacks};
pub use client::{parse_json_reply, GenerationClient};
pub use error::GenerationError;
pub use pacer::{PacingConfig, TypingPacer};
pub use types::{Completion, GenerationOptions, GenerationRequest, StreamEvent, Usage};

pub use tokio_util::sync::CancellationToken;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
