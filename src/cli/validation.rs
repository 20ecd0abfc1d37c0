// validation.rs - Input validation utilities

use std::path::{Path, PathBuf};

use crate::cli::args::Args;
use crate::core::bootstrap::{BootstrapConfig, BootstrapEngine, DEFAULT_SEED};
use crate::data::sorting::DEFAULT_SORTING_TABLE;
use crate::pipeline::PipelineSettings;

pub const MAX_PRECISION: usize = 10;

pub struct ValidationResult {
    pub settings: PipelineSettings,
    pub bootstrap: BootstrapConfig,
    pub cache_file: Option<PathBuf>,
    pub names_file: Option<PathBuf>,
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult, String> {
    // Run directory
    let dir = args
        .dir
        .as_deref()
        .ok_or_else(|| "--dir is required (on the command line or in the config file)".to_string())?;
    let input_dir = PathBuf::from(dir);
    if !input_dir.is_dir() {
        return Err(format!("Run directory '{}' not found", input_dir.display()));
    }

    // Numeric options
    if args.precision > MAX_PRECISION {
        return Err(format!(
            "Precision must be between 0 and {} (got {})",
            MAX_PRECISION, args.precision
        ));
    }
    if args.bootstrap_depth == 0 {
        return Err("Bootstrap depth must be at least 1".to_string());
    }
    if args.threads == Some(0) {
        return Err("Thread count must be at least 1".to_string());
    }

    // Seed
    if args.seed.is_some() && args.no_seed {
        return Err("--seed and --no-seed cannot be used together".to_string());
    }
    let bootstrap = BootstrapConfig {
        depth: args.bootstrap_depth,
        seed: if args.no_seed {
            None
        } else {
            Some(args.seed.unwrap_or(DEFAULT_SEED))
        },
    };

    let counts_types = parse_counts_types(&args.counts_types)?;

    let sorting_table = match &args.sorting_table {
        Some(path) => PathBuf::from(path),
        None => input_dir.join(DEFAULT_SORTING_TABLE),
    };
    if !sorting_table.is_file() {
        return Err(format!("Sorting table '{}' not found", sorting_table.display()));
    }

    // Early cache compatibility check (before loading any counts)
    let cache_file = args.cache_file.as_ref().map(PathBuf::from);
    if let Some(cache_path) = &cache_file {
        if cache_path.exists() && !args.force_recompute {
            check_cache(cache_path, bootstrap)?;
        }
    }

    let mut settings = PipelineSettings::for_dir(&input_dir);
    settings.sorting_table = sorting_table;
    settings.counts_types = counts_types;
    settings.precision = args.precision;
    settings.show_progress = !args.quiet;
    if let Some(output) = &args.output {
        settings.output_dir = PathBuf::from(output);
    }

    Ok(ValidationResult {
        settings,
        bootstrap,
        cache_file,
        names_file: args.names_file.as_ref().map(PathBuf::from),
    })
}

/// Split the comma-separated counts subfolder list
fn parse_counts_types(raw: &str) -> Result<Vec<String>, String> {
    let mut types: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(format!("Invalid counts type '{}': expected a subfolder name", name));
        }
        if !types.iter().any(|t| t == name) {
            types.push(name.to_string());
        }
    }
    if types.is_empty() {
        return Err("--counts-types must name at least one counts subfolder".to_string());
    }
    Ok(types)
}

fn check_cache(cache_path: &Path, bootstrap: BootstrapConfig) -> Result<(), String> {
    let probe = BootstrapEngine::new(bootstrap);
    probe.check_cache_compatibility(cache_path).map_err(|e| {
        format!(
            "Cache incompatible: {}\n💡 Solutions:\n   - Use --force-recompute to ignore existing cache\n   - Delete incompatible cache file\n   - Use the bootstrap depth and seed the cache was built with",
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use argh::FromArgs;
    use tempfile::TempDir;

    fn run_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_SORTING_TABLE),
            "filename,round_number,file_type\nR1_in,1,pre\nR1_out,1,post\n",
        )
        .unwrap();
        dir
    }

    fn parse(dir: &Path, extra: &[&str]) -> Args {
        let dir = dir.to_str().unwrap();
        let mut argv = vec!["--dir", dir];
        argv.extend_from_slice(extra);
        Args::from_args(&["selexboot"], &argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let dir = run_dir();
        let result = validate_args(&parse(dir.path(), &[])).unwrap();

        assert_eq!(result.bootstrap, BootstrapConfig::default());
        assert_eq!(result.settings.input_dir, dir.path());
        assert_eq!(result.settings.output_dir, dir.path());
        assert_eq!(result.settings.sorting_table, dir.path().join(DEFAULT_SORTING_TABLE));
        assert_eq!(result.settings.counts_types, vec!["counts", "counts.aa"]);
        assert_eq!(result.settings.precision, 6);
        assert!(result.settings.show_progress);
        assert!(result.cache_file.is_none());
        assert!(result.names_file.is_none());
    }

    #[test]
    fn test_seed_options() {
        let dir = run_dir();
        let seeded = validate_args(&parse(dir.path(), &["--seed", "7", "--bootstrap-depth", "200"])).unwrap();
        assert_eq!(seeded.bootstrap, BootstrapConfig { depth: 200, seed: Some(7) });

        let entropy = validate_args(&parse(dir.path(), &["--no-seed"])).unwrap();
        assert_eq!(entropy.bootstrap.seed, None);

        assert!(validate_args(&parse(dir.path(), &["--seed", "7", "--no-seed"])).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = run_dir();
        assert!(validate_args(&parse(dir.path(), &["--precision", "11"])).is_err());
        assert!(validate_args(&parse(dir.path(), &["--precision", "10"])).is_ok());
        assert!(validate_args(&parse(dir.path(), &["--bootstrap-depth", "0"])).is_err());
        assert!(validate_args(&parse(dir.path(), &["--threads", "0"])).is_err());
        assert!(validate_args(&parse(dir.path(), &["--counts-types", " , "])).is_err());
        assert!(validate_args(&parse(dir.path(), &["--counts-types", "../counts"])).is_err());
    }

    #[test]
    fn test_missing_inputs() {
        let no_dir = Args::from_args(&["selexboot"], &[]).unwrap();
        assert!(validate_args(&no_dir).is_err());

        let missing = Path::new("/nonexistent/selexboot/run");
        assert!(validate_args(&parse(missing, &[])).is_err());

        let empty = tempfile::tempdir().unwrap();
        let err = validate_args(&parse(empty.path(), &[])).err().unwrap();
        assert!(err.contains("Sorting table"));
    }

    #[test]
    fn test_counts_types_and_output() {
        let dir = run_dir();
        let out = dir.path().join("results");
        let result = validate_args(&parse(
            dir.path(),
            &["--counts-types", "counts.aa, counts,counts.aa", "--output", out.to_str().unwrap(), "--quiet"],
        ))
        .unwrap();
        assert_eq!(result.settings.counts_types, vec!["counts.aa", "counts"]);
        assert_eq!(result.settings.output_dir, out);
        assert!(!result.settings.show_progress);
    }

    #[test]
    fn test_incompatible_cache() {
        let dir = run_dir();
        let cache = dir.path().join("bootstrap.lz4");
        let mut engine = BootstrapEngine::new(BootstrapConfig::default());
        engine.interval(1000, 10);
        engine.save_cache(&cache).unwrap();
        let cache = cache.to_str().unwrap();

        assert!(validate_args(&parse(dir.path(), &["--cache-file", cache])).is_ok());

        let err = validate_args(&parse(dir.path(), &["--cache-file", cache, "--bootstrap-depth", "50"]))
            .err()
            .unwrap();
        assert!(err.contains("--force-recompute"));

        assert!(validate_args(&parse(
            dir.path(),
            &["--cache-file", cache, "--bootstrap-depth", "50", "--force-recompute"]
        ))
        .is_ok());
    }
}
