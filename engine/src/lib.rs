//! LayerLens engine — container image package provenance analysis.
//!
//! Aligns a Dockerfile's instructions with the built image's layer
//! history, resolves the packages each layer installs (from a persisted
//! cache or the command knowledge base), tracks the completeness of every
//! recovered record, and composes the final classification report.
//!
//! # Architecture
//!
//! ```text
//! instructions + layer history
//!         │ align
//!         ▼
//! (instruction, layer id) pairs
//!         │ resolve (cache hit short-circuits extraction)
//!         ▼
//! classification buckets + notes
//!         │ compose
//!         ▼
//! report artifact
//! ```

pub mod align;
pub mod cache;
pub mod confirm;
pub mod docker;
pub mod dockerfile;
pub mod model;
pub mod notes;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod rules;

// Re-export common types
pub use align::{align, AlignedRun, Alignment};
pub use cache::LayerCache;
pub use confirm::{PackageConfirmationEngine, Resolution};
pub use docker::DockerCli;
pub use model::{
    ClassificationState, DockerfilePackages, Instruction, LayerHistoryEntry, LayerRecord, Package,
};
pub use pipeline::{AnalysisContext, Analyzer, ReportMode, RunReport};
pub use provider::{CommandLibrary, ContainerRuntime, ImageSource};
pub use report::{render_summary, write_report, LongformReport, Section};
pub use rules::RuleLibrary;

/// LayerLens engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
