// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs, Debug)]
/// selexboot - Bootstrap-bounded enrichment for multi-round selection experiments
pub struct Args {
    /// run directory holding the counts/ and counts.aa/ folders
    #[argh(option)]
    pub dir: Option<String>,

    /// output directory (default: the run directory)
    #[argh(option)]
    pub output: Option<String>,

    /// sorting table CSV (default: <dir>/enrichment_analysis_file_sorting_logic.csv)
    #[argh(option)]
    pub sorting_table: Option<String>,

    /// comma-separated counts subfolders to process (default: counts,counts.aa)
    #[argh(option, default = "String::from(\"counts,counts.aa\")")]
    pub counts_types: String,

    /// decimal places of frequencies and enrichments, 0-10 (default: 6)
    #[argh(option, default = "6")]
    pub precision: usize,

    /// binomial draws per bootstrap interval (default: 1000)
    #[argh(option, default = "1000")]
    pub bootstrap_depth: usize,

    /// bootstrap RNG seed (default: 42)
    #[argh(option)]
    pub seed: Option<u64>,

    /// draw bootstrap samples from entropy (non-reproducible)
    #[argh(switch)]
    pub no_seed: bool,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// bootstrap cache file for reuse across runs (.lz4 extension)
    #[argh(option)]
    pub cache_file: Option<String>,

    /// user note to save with the cache for future reference
    #[argh(option)]
    pub cache_note: Option<String>,

    /// ignore an existing cache file and start fresh
    #[argh(switch)]
    pub force_recompute: bool,

    /// JSON sequence-name dictionary shared across runs
    #[argh(option)]
    pub names_file: Option<String>,

    /// validate inputs and print the round plan without computation
    #[argh(switch)]
    pub dry_run: bool,

    /// only log warnings and errors, hide progress bars
    #[argh(switch)]
    pub quiet: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}
