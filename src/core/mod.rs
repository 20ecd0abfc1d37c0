// mod.rs - Core logic module

pub mod bootstrap;
pub mod enrichment;
pub mod merge;

// Re-export main types for convenience
pub use bootstrap::{
    resample_interval, BootstrapConfig, BootstrapEngine, BootstrapInterval, BootstrapKey,
    CacheMetadata, PersistedCache,
};
pub use enrichment::{safe_divide, EnrichedRound, EnrichedRow, EnrichmentCalculator, EnrichmentResult};
pub use merge::{MergedRound, MergedRow, RoundMerger, RoundTotals, SourceMeasures};
