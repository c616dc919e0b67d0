//! PRD Checkpoint
//!
//! Snapshots of the conversation, document and diff regions with a single
//! restored slot and one level of undo.
//!
//! # Example
//!
//! ```rust,ignore
//! use prd_checkpoint::CheckpointManager;
//! use prd_state::{SectionCatalog, SharedSession};
//!
//! let session = SharedSession::new(SectionCatalog::prd_default());
//! let manager = CheckpointManager::new(session.clone());
//! manager.create()?;
//! manager.restore_by_turn_index(1)?;
//! manager.undo()?;
//! ```

#![warn(unreachable_pub)]

pub mod checkpoint;
pub mod error;
pub mod manager;

pub use checkpoint::{Checkpoint, RawChatState, RawCheckpoint, RawMarkdownState, ValidationResult};
pub use error::CheckpointError;
pub use manager::{CheckpointManager, RestoredCheckpoint};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
