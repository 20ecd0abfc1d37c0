// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        if self.dir.is_none() {
            self.dir = config.dir;
        }
        if self.output.is_none() {
            self.output = config.output;
        }
        if self.sorting_table.is_none() {
            self.sorting_table = config.sorting_table;
        }

        // Only override defaults, not explicit CLI values
        if self.counts_types == "counts,counts.aa" {
            if let Some(counts_types) = config.counts_types {
                self.counts_types = counts_types;
            }
        }
        if self.precision == 6 {
            if let Some(precision) = config.precision {
                self.precision = precision;
            }
        }

        // Bootstrap
        if self.bootstrap_depth == 1000 {
            if let Some(depth) = config.bootstrap_depth {
                self.bootstrap_depth = depth;
            }
        }
        // An explicit seed choice on the command line overrides both config keys
        if self.seed.is_none() && !self.no_seed {
            self.seed = config.seed;
            self.no_seed = config.no_seed.unwrap_or(false);
        }

        // Performance
        if self.threads.is_none() {
            self.threads = config.threads;
        }
        if self.cache_file.is_none() {
            self.cache_file = config.cache_file;
        }
        if self.cache_note.is_none() {
            self.cache_note = config.cache_note;
        }
        if self.names_file.is_none() {
            self.names_file = config.names_file;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.force_recompute && config.force_recompute.unwrap_or(false) {
            self.force_recompute = true;
        }
        if !self.dry_run && config.dry_run.unwrap_or(false) {
            self.dry_run = true;
        }
        if !self.quiet && config.quiet.unwrap_or(false) {
            self.quiet = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self, String> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}
