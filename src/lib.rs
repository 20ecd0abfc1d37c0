// lib.rs - selexboot library root

//! # selexboot - Bootstrap-bounded enrichment for multi-round selection experiments
//!
//! This library turns per-round sequence count tables of a SELEX-style
//! selection experiment into enrichment tables. Every count is paired with a
//! binomial bootstrap interval, and every frequency and enrichment ratio is
//! reported with bounds derived from those intervals.
//!
//! ## Features
//!
//! - **Bootstrap intervals**: Seeded binomial resampling, memoized per `(total, observed)` pair
//! - **Persistent cache**: LZ4-compressed cache reusable across runs with the same depth and seed
//! - **Round planning**: Sorting table maps raw count files to rounds and roles (pre, post, negative)
//! - **Carry-forward baseline**: A round without pre-selection input uses the previous round's output
//! - **Stable names**: Base58 sequence names, optionally shared across runs through a JSON dictionary
//! - **Cross-round tables**: One wide table per metric, sorted by the last round
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use selexboot::prelude::*;
//!
//! let settings = PipelineSettings::for_dir("/data/run");
//! let engine = BootstrapEngine::new(BootstrapConfig::default());
//! let mut pipeline = EnrichmentPipeline::new(settings, engine, NameAssigner::new());
//!
//! let summary = pipeline.run()?;
//! println!("{} rounds written", summary.rounds_written());
//! # Ok::<(), selexboot::EnrichError>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod naming;
pub mod output;
pub mod pipeline;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{BootstrapConfig, BootstrapEngine, BootstrapInterval, BootstrapKey};
    pub use crate::core::{EnrichmentCalculator, EnrichmentResult, RoundMerger};
    pub use crate::data::{CountTable, Role, RunSchema, SortingTable};
    pub use crate::error::EnrichError;
    pub use crate::naming::{NameAssigner, NamePrefix};
    pub use crate::output::{write_pivots, write_round_file};
    pub use crate::pipeline::{EnrichmentPipeline, PipelineSettings, RunSummary};
}

// Re-export main types at the root level for convenience
pub use cli::{Args, ValidationResult};
pub use core::{BootstrapConfig, BootstrapEngine};
pub use error::EnrichError;
pub use naming::NameAssigner;
pub use pipeline::{EnrichmentPipeline, PipelineSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "selexboot v{} - Bootstrap-bounded enrichment for selection experiments",
        VERSION
    )
}
