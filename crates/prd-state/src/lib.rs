//! PRD State
//!
//! The three state regions of a document-authoring session:
//! - [`ConversationState`]: ordered messages plus transient generation flags
//! - [`DocumentState`]: live sections in catalog order plus per-section history
//! - [`DiffState`]: proposals awaiting review
//!
//! All regions are built on persistent collections from `im`, so a full
//! [`SessionState`] snapshot is an O(1) clone.
//!
//! # Example
//!
//! ```rust,ignore
//! use prd_state::{SectionCatalog, SharedSession};
//!
//! let session = SharedSession::new(SectionCatalog::prd_default());
//! let snapshot = session.snapshot();
//! assert_eq!(snapshot.document.sections.len(), 8);
//! ```

#![warn(unreachable_pub)]

pub mod catalog;
pub mod conversation;
pub mod diff;
pub mod document;
pub mod error;
pub mod message;
pub mod section;
pub mod session;

pub use catalog::{SectionCatalog, SectionSpec, SectionTemplate, INITIAL_PLACEHOLDER};
pub use conversation::{ConversationState, GenerationStatus, GREETING};
pub use diff::{DiffState, SectionDiff};
pub use document::DocumentState;
pub use error::StateError;
pub use message::{ContentPart, ImageRef, Message, MessageContent, Role};
pub use section::{Section, SectionHistory, SectionId};
pub use session::{SessionState, SharedSession};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
