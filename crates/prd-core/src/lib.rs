//! PRD Core - chat-driven document pipeline
//!
//! Turns a chat about a product into a multi-section Product Requirements
//! Document:
//! - Routes each turn to decide whether it carries document content
//! - Fans relevant turns out to per-section generators
//! - Records the results as pending diffs for the user to resolve
//! - Replies through a conversational agent, optionally streamed
//! - Snapshots the session before every turn for restore and undo
//!
//! # Example
//!
//! ```rust,ignore
//! use prd_core::{ChatSession, PrdConfig};
//! use prd_state::SectionCatalog;
//!
//! # use prd_generation::GenerationBackend;
//! # use std::sync::Arc;
//! # async fn example(backend: Arc<dyn GenerationBackend>) -> Result<(), prd_core::PrdError> {
//! let chat = ChatSession::new(SectionCatalog::prd_default(), backend, PrdConfig::new());
//! let turn = chat.send_message("We need a CSV export for invoices", &[]).await?;
//!
//! println!("{}", turn.response);
//! for diff in chat.review().pending_diffs() {
//!     println!("pending: {}", diff.title);
//! }
//! chat.review().accept_all()?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Pipeline stages
pub mod conversation;
pub mod generator;
pub mod orchestrator;
pub mod router;
pub mod selector;
pub mod summary;

// Document helpers
pub mod completion;
pub mod context;
pub mod prompts;
pub mod repair;
pub mod transition;

// Session and configuration
pub mod config;
pub mod error;
pub mod session;

// Re-exports for convenience
pub use config::{CheckpointConfig, PipelineConfig, PrdConfig, RouterKind, SelectionPolicy};
pub use conversation::{ConversationAgent, ConversationReply, ConversationRequest, TROUBLE_REPLY};
pub use error::PrdError;
pub use generator::{GeneratedSection, SectionGenerator, SectionOutcome};
pub use orchestrator::{
    LogCallback, Orchestrator, SectionUpdate, TurnOptions, TurnOutcome, TurnResult, APOLOGY_REPLY,
    CANCELLED_REPLY, NO_UPDATES,
};
pub use router::{ModelRouter, RouteDecision, Router, RuleRouter};
pub use selector::{SectionInput, SectionSelection, SectionSelector};
pub use session::{Attachment, ChatSession};
pub use summary::{ConversationSummarizer, SectionSummarizer};
pub use transition::{detect_transition, next_incomplete, TransitionTarget};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a session
    pub use crate::{
        Attachment, ChatSession, PrdConfig, PrdError, SectionUpdate, TurnOptions, TurnOutcome,
        TurnResult,
    };
    pub use prd_state::{Message, SectionCatalog, SectionId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
