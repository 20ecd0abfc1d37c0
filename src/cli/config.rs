// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub dir: Option<String>,
    pub output: Option<String>,
    pub sorting_table: Option<String>,
    pub counts_types: Option<String>,
    pub precision: Option<usize>,

    // Bootstrap
    pub bootstrap_depth: Option<usize>,
    pub seed: Option<u64>,
    pub no_seed: Option<bool>,

    // Performance
    pub threads: Option<usize>,
    pub cache_file: Option<String>,
    pub cache_note: Option<String>,

    // Naming
    pub names_file: Option<String>,

    // Flags
    pub force_recompute: Option<bool>,
    pub dry_run: Option<bool>,
    pub quiet: Option<bool>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, content)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        info!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# selexboot.toml - Configuration file for selexboot
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Run directory holding the counts/ and counts.aa/ folders
dir = "/path/to/run"

# Output directory (omit to write next to the counts folders)
# output = "/path/to/results"

# Sorting table mapping filename prefixes to round and role
# (omit for <dir>/enrichment_analysis_file_sorting_logic.csv)
# sorting_table = "/path/to/sorting.csv"

# Counts subfolders to process, comma-separated
counts_types = "counts,counts.aa"

# Decimal places of written frequencies and enrichments (0-10)
precision = 6

# =============================================================================
# BOOTSTRAP
# =============================================================================

# Binomial draws per interval
bootstrap_depth = 1000

# RNG seed reset before every interval; identical inputs give identical bounds
seed = 42

# Draw from entropy instead (non-reproducible, cannot be combined with seed)
# no_seed = true

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of threads (omit for auto-detection)
threads = 8

# Cache file path for reuse across runs (.lz4 extension)
cache_file = "bootstrap_cache.lz4"

# User note to save with the cache for future reference
cache_note = "My selection run"

# =============================================================================
# NAMING
# =============================================================================

# Sequence-name dictionary; keeps names stable across separate runs
# names_file = "sequence_names.json"

# =============================================================================
# FLAGS
# =============================================================================

# Ignore an existing cache file and start fresh
force_recompute = false

# Validate inputs and print the round plan without computation
dry_run = false

# Only log warnings and errors
quiet = false
"#
        .to_string()
    }
}
