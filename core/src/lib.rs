//! LayerLens core types shared across the workspace.
//!
//! Provides the error taxonomy and analysis configuration consumed by the
//! engine and CLI crates.

pub mod config;
pub mod error;

pub use config::AnalysisConfig;
pub use error::{LensError, Result};

/// LayerLens core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
