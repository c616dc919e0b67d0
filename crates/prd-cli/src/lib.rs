//! PRD Forge command line support
//!
//! The [`simulator`] module backs `prd-forge simulate`.

#![warn(unreachable_pub)]

pub mod simulator;

pub use simulator::{run_simulator, SimulatorConfig, SimulatorReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
