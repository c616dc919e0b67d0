//! PRD Diff
//!
//! Review-gated reconciliation: generated section content becomes pending
//! diffs, and only an explicit accept/reject writes live sections.
//!
//! # Rules
//!
//! - At most one outstanding diff per section
//! - The first proposal of an episode fixes the content `reject` restores
//! - Proposals equal to the current base are dropped
//! - The review view is never shown with zero diffs

#![warn(unreachable_pub)]

pub mod error;
pub mod reconciler;
pub mod review;

pub use error::DiffError;
pub use reconciler::{DiffReconciler, ProposedUpdate, Resolution};
pub use review::DiffReview;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
