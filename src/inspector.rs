// inspector.rs - Bootstrap cache inspector with configuration analysis
// Features: LZ4 cache inspection, per-total breakdown, compatibility checks

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use argh::FromArgs;
use selexboot::core::{BootstrapInterval, BootstrapKey, PersistedCache};

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

#[derive(FromArgs)]
/// Inspect selexboot bootstrap cache files
struct Args {
    /// path to the cache file (.lz4)
    #[argh(option)]
    cache: String,

    /// show every source total instead of the top ones
    #[argh(switch)]
    detailed: bool,

    /// show cache entries for one source total (molecule count)
    #[argh(option)]
    show_total: Option<u64>,

    /// check compatibility with given bootstrap parameters (format: depth,seed or depth,none)
    #[argh(option)]
    check_compatibility: Option<String>,

    /// export every cache entry to a TSV file
    #[argh(option)]
    export_summary: Option<String>,

    /// validate cache integrity
    #[argh(switch)]
    validate: bool,

    /// show top N source totals by entry count (default: 10)
    #[argh(option, default = "10")]
    top: usize,

    /// quiet mode - minimal output
    #[argh(switch)]
    quiet: bool,
}

/// Entries of the cache keyed by their parsed key; unparseable keys are kept apart
struct ParsedEntries {
    entries: Vec<(BootstrapKey, BootstrapInterval)>,
    invalid_keys: Vec<String>,
}

/// Per-total aggregate: entry count, summed observed, summed interval width
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct TotalStats {
    entries: usize,
    observed_sum: u64,
    width_sum: f64,
}

impl TotalStats {
    fn avg_observed(&self) -> f64 {
        self.observed_sum as f64 / self.entries as f64
    }

    fn avg_width(&self) -> f64 {
        self.width_sum / self.entries as f64
    }
}

// ============================================================================
// CACHE LOADING
// ============================================================================

fn load_cache(cache_path: &Path, quiet: bool) -> Result<PersistedCache, Box<dyn std::error::Error>> {
    if !cache_path.exists() {
        return Err(format!("Cache file does not exist: {}", cache_path.display()).into());
    }

    if !quiet {
        println!("Loading cache: {}", cache_path.display());
    }

    let cache = PersistedCache::read(cache_path)?;

    if !quiet {
        println!("✅ Cache loaded successfully");
        let compressed = std::fs::metadata(cache_path)?.len();
        println!("Compressed size: {:.1} KB", compressed as f64 / 1024.0);
    }

    Ok(cache)
}

fn parse_entries(cache: &PersistedCache) -> ParsedEntries {
    let mut entries = Vec::with_capacity(cache.data.len());
    let mut invalid_keys = Vec::new();
    for (raw_key, interval) in &cache.data {
        match BootstrapKey::parse(raw_key) {
            Some(key) => entries.push((key, *interval)),
            None => invalid_keys.push(raw_key.clone()),
        }
    }
    entries.sort_by_key(|(key, _)| *key);
    invalid_keys.sort();
    ParsedEntries {
        entries,
        invalid_keys,
    }
}

fn stats_by_total(parsed: &ParsedEntries) -> BTreeMap<u64, TotalStats> {
    let mut by_total: BTreeMap<u64, TotalStats> = BTreeMap::new();
    for (key, interval) in &parsed.entries {
        let stats = by_total.entry(key.total).or_default();
        stats.entries += 1;
        stats.observed_sum += key.observed;
        stats.width_sum += interval.upper - interval.lower;
    }
    by_total
}

// ============================================================================
// ANALYSIS FUNCTIONS
// ============================================================================

fn analyze_cache_overview(cache: &PersistedCache, parsed: &ParsedEntries, args: &Args) {
    if args.quiet {
        return;
    }

    let meta = &cache.metadata;
    println!("\n=== CACHE SUMMARY ===");
    println!("Version: {}", meta.version);
    println!("Format version: {}", meta.format_version);
    println!("Created: {}", meta.created);
    println!("Last modified: {}", meta.last_modified);
    if let Some(note) = &meta.user_note {
        println!("Note: {}", note);
    }
    println!("Total entries: {}", cache.data.len());

    println!("\n=== BOOTSTRAP CONFIGURATION ===");
    println!("Depth: {}", meta.depth);
    match meta.seed {
        Some(seed) => println!("Seed: {} (reproducible)", seed),
        None => println!("Seed: none (entropy, not reproducible)"),
    }

    let by_total = stats_by_total(parsed);
    println!("Distinct source totals: {}", by_total.len());

    if !parsed.entries.is_empty() {
        let widths: f64 = parsed.entries.iter().map(|(_, i)| i.upper - i.lower).sum();
        let relative: f64 = parsed
            .entries
            .iter()
            .map(|(k, i)| i.half_width() / k.observed.max(1) as f64)
            .sum();
        let n = parsed.entries.len() as f64;
        println!("\n=== INTERVAL STATISTICS ===");
        println!("Average interval width: {:.2}", widths / n);
        println!("Average relative half-width: {:.2}%", relative / n * 100.0);
    }
}

fn analyze_totals_overview(parsed: &ParsedEntries, args: &Args) {
    if args.quiet && !args.detailed {
        return;
    }

    println!("\n=== SOURCE TOTALS OVERVIEW ===");

    let mut totals: Vec<(u64, TotalStats)> = stats_by_total(parsed).into_iter().collect();
    totals.sort_by(|a, b| b.1.entries.cmp(&a.1.entries).then(a.0.cmp(&b.0)));

    println!(
        "{:<15} {:>8} {:>14} {:>12}",
        "Total", "Entries", "Avg observed", "Avg width"
    );
    println!("{}", "=".repeat(52));

    let show_count = if args.detailed {
        totals.len()
    } else {
        args.top.min(totals.len())
    };

    for (total, stats) in totals.iter().take(show_count) {
        println!(
            "{:<15} {:>8} {:>14.2} {:>12.2}",
            total,
            stats.entries,
            stats.avg_observed(),
            stats.avg_width()
        );
    }

    if !args.detailed && totals.len() > args.top {
        println!(
            "... and {} more totals (use --detailed to show all)",
            totals.len() - args.top
        );
    }
}

fn analyze_specific_total(parsed: &ParsedEntries, total: u64) {
    println!("\n=== SOURCE TOTAL DETAILS: {} ===", total);

    let entries: Vec<&(BootstrapKey, BootstrapInterval)> =
        parsed.entries.iter().filter(|(k, _)| k.total == total).collect();

    if entries.is_empty() {
        println!("❌ Total {} not found in cache", total);
        let mut available: Vec<u64> = parsed.entries.iter().map(|(k, _)| k.total).collect();
        available.dedup();
        println!("Available totals: {:?}", available);
        return;
    }

    println!("Total entries: {}", entries.len());

    println!("\nCache entries (showing up to 10):");
    println!("{:<12} {:>12} {:>12} {:>12}", "Observed", "Lower", "Upper", "Half-width");
    println!("{}", "-".repeat(52));

    for (key, interval) in entries.iter().take(10) {
        println!(
            "{:<12} {:>12.2} {:>12.2} {:>12.2}",
            key.observed,
            interval.lower,
            interval.upper,
            interval.half_width()
        );
    }

    if entries.len() > 10 {
        println!("... and {} more entries", entries.len() - 10);
    }
}

/// Parse `depth,seed` where the seed may be `none`
fn parse_target(params_str: &str) -> Result<(usize, Option<u64>), String> {
    let (depth, seed) = params_str
        .split_once(',')
        .ok_or_else(|| "Invalid parameter format. Use: depth,seed (e.g. 1000,42 or 1000,none)".to_string())?;
    let depth = depth
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("Invalid depth '{}'", depth.trim()))?;
    let seed = match seed.trim() {
        "none" => None,
        s => Some(s.parse::<u64>().map_err(|_| format!("Invalid seed '{}'", s))?),
    };
    Ok((depth, seed))
}

fn check_compatibility(cache: &PersistedCache, params_str: &str) {
    println!("\n=== COMPATIBILITY CHECK ===");

    let (depth, seed) = match parse_target(params_str) {
        Ok(target) => target,
        Err(e) => {
            println!("❌ ERROR: {}", e);
            return;
        }
    };

    let meta = &cache.metadata;
    println!("Cache bootstrap config:  depth={}, seed={:?}", meta.depth, meta.seed);
    println!("Target bootstrap config: depth={}, seed={:?}", depth, seed);

    if meta.depth == depth && meta.seed == seed {
        println!("\n✅ COMPATIBLE: Cache and target configurations match perfectly!");
        println!("   You can safely reuse this cache with your target parameters.");
    } else {
        println!("\n❌ INCOMPATIBLE: Cache and target configurations differ!");
        println!("   selexboot refuses to load this cache with the target parameters.");
        println!("   Recommendation: Use a different cache file or run with --force-recompute.");

        println!("\nDifferences:");
        if meta.depth != depth {
            println!("  • Depth: {} → {}", meta.depth, depth);
        }
        if meta.seed != seed {
            println!("  • Seed: {:?} → {:?}", meta.seed, seed);
        }
    }
}

fn validate_cache_integrity(cache: &PersistedCache, parsed: &ParsedEntries) -> bool {
    println!("\n=== CACHE VALIDATION ===");

    let mut errors = 0;
    let mut warnings = 0;

    if !parsed.invalid_keys.is_empty() {
        println!(
            "❌ ERROR: {} keys are not in 'total:observed' form (first: '{}')",
            parsed.invalid_keys.len(),
            parsed.invalid_keys[0]
        );
        errors += 1;
    }

    if cache.metadata.total_entries != cache.data.len() {
        println!(
            "⚠️  WARNING: Metadata lists {} entries, cache holds {}",
            cache.metadata.total_entries,
            cache.data.len()
        );
        warnings += 1;
    }

    // Interval bounds
    let mut inverted = 0;
    let mut negative = 0;
    let mut oversized = 0;
    for (key, interval) in &parsed.entries {
        if interval.lower > interval.upper {
            if inverted < 5 {
                println!(
                    "❌ ERROR: Inverted interval at {}:{}: {} > {}",
                    key.total, key.observed, interval.lower, interval.upper
                );
            }
            inverted += 1;
        }
        if interval.lower < 0.0 {
            negative += 1;
        }
        if key.observed > key.total {
            if oversized < 5 {
                println!(
                    "⚠️  WARNING: Observed count exceeds total at {}:{}",
                    key.total, key.observed
                );
            }
            oversized += 1;
        }
    }

    if inverted > 0 || negative > 0 {
        if negative > 0 {
            println!("❌ ERROR: {} intervals have a negative lower bound", negative);
        }
        errors += 1;
    }
    if oversized > 0 {
        if oversized > 5 {
            println!("⚠️  WARNING: {} total entries with observed > total", oversized);
        }
        warnings += 1;
    }

    // Summary
    if errors == 0 && warnings == 0 {
        println!("✅ Cache validation passed - no issues found");
        true
    } else {
        println!(
            "⚠️  Cache validation completed: {} errors, {} warnings",
            errors, warnings
        );
        if errors > 0 {
            println!("❌ Cache has integrity issues that should be addressed");
            false
        } else {
            println!("✅ Cache is valid but has minor warnings");
            true
        }
    }
}

fn export_summary_to_tsv(
    cache: &PersistedCache,
    parsed: &ParsedEntries,
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(output_path)?;
    let meta = &cache.metadata;

    // Write header with cache metadata
    writeln!(file, "# selexboot cache summary")?;
    writeln!(file, "# Version: {}", meta.version)?;
    writeln!(file, "# Created: {}", meta.created)?;
    writeln!(file, "# Last modified: {}", meta.last_modified)?;
    writeln!(file, "# Depth: {}", meta.depth)?;
    match meta.seed {
        Some(seed) => writeln!(file, "# Seed: {}", seed)?,
        None => writeln!(file, "# Seed: none")?,
    }
    writeln!(file)?;

    writeln!(file, "total\tobserved\tlower\tupper\thalf_width")?;

    // Entries are sorted by (total, observed) for consistent output
    for (key, interval) in &parsed.entries {
        writeln!(
            file,
            "{}\t{}\t{:.2}\t{:.2}\t{:.3}",
            key.total,
            key.observed,
            interval.lower,
            interval.upper,
            interval.half_width()
        )?;
    }

    println!("✅ Summary exported to: {}", output_path);
    Ok(())
}

// ============================================================================
// MAIN FUNCTION
// ============================================================================

fn main() {
    let args: Args = argh::from_env();

    if !args.quiet {
        println!("🔍 selexboot Cache Inspector");
        println!("============================");
    }

    // Load cache
    let cache_path = Path::new(&args.cache);
    let cache = match load_cache(cache_path, args.quiet) {
        Ok(cache) => cache,
        Err(e) => {
            eprintln!("❌ ERROR loading cache: {}", e);
            std::process::exit(1);
        }
    };
    let parsed = parse_entries(&cache);

    // Main analysis
    analyze_cache_overview(&cache, &parsed, &args);
    analyze_totals_overview(&parsed, &args);

    if let Some(total) = args.show_total {
        analyze_specific_total(&parsed, total);
    }

    if let Some(params) = &args.check_compatibility {
        check_compatibility(&cache, params);
    }

    // Validation
    if args.validate && !validate_cache_integrity(&cache, &parsed) {
        std::process::exit(1);
    }

    // Export summary
    if let Some(export_path) = &args.export_summary {
        if let Err(e) = export_summary_to_tsv(&cache, &parsed, export_path) {
            eprintln!("❌ ERROR exporting summary: {}", e);
            std::process::exit(1);
        }
    }

    if !args.quiet {
        println!("\n✅ Cache inspection completed successfully");
        println!("\nUsage examples:");
        println!("  --check-compatibility 1000,42        Check compatibility with depth and seed");
        println!("  --check-compatibility 1000,none      Check against an unseeded run");
        println!("  --detailed                           Show all source totals");
        println!("  --show-total 250000                  Show entries for one source total");
        println!("  --validate                           Validate cache integrity");
        println!("  --export-summary out.tsv             Export all entries to TSV");
        println!("  --quiet                              Minimal output mode");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selexboot::core::{BootstrapConfig, BootstrapEngine};

    fn write_cache(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("bootstrap.lz4");
        let mut engine = BootstrapEngine::new(BootstrapConfig::default());
        engine.interval(10_000, 50);
        engine.interval(10_000, 500);
        engine.interval(2_000, 40);
        engine.save_cache(&path).unwrap();
        path
    }

    #[test]
    fn test_stats_by_total() {
        let dir = tempfile::tempdir().unwrap();
        let cache = load_cache(&write_cache(dir.path()), true).unwrap();
        let parsed = parse_entries(&cache);
        assert!(parsed.invalid_keys.is_empty());

        let stats = stats_by_total(&parsed);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[&10_000].entries, 2);
        assert_eq!(stats[&10_000].observed_sum, 550);
        assert_eq!(stats[&2_000].entries, 1);
    }

    #[test]
    fn test_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = load_cache(&write_cache(dir.path()), true).unwrap();
        assert!(validate_cache_integrity(&cache, &parse_entries(&cache)));

        cache.data.insert(
            "100:5".to_string(),
            BootstrapInterval { lower: 9.0, upper: 1.0 },
        );
        cache.data.insert("garbage".to_string(), BootstrapInterval::DEGENERATE);
        let parsed = parse_entries(&cache);
        assert_eq!(parsed.invalid_keys, vec!["garbage".to_string()]);
        assert!(!validate_cache_integrity(&cache, &parsed));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("1000,42"), Ok((1000, Some(42))));
        assert_eq!(parse_target("500, none"), Ok((500, None)));
        assert!(parse_target("1000").is_err());
        assert!(parse_target("x,42").is_err());
    }

    #[test]
    fn test_export_summary() {
        let dir = tempfile::tempdir().unwrap();
        let cache = load_cache(&write_cache(dir.path()), true).unwrap();
        let out = dir.path().join("summary.tsv");
        export_summary_to_tsv(&cache, &parse_entries(&cache), out.to_str().unwrap()).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("# Depth: 1000"));
        assert!(content.contains("# Seed: 42"));
        let rows: Vec<&str> = content
            .lines()
            .filter(|l| !l.starts_with('#') && !l.is_empty())
            .collect();
        assert_eq!(rows[0], "total\tobserved\tlower\tupper\thalf_width");
        assert_eq!(rows.len(), 4);
        assert!(rows[1].starts_with("2000\t40\t"));
        assert!(rows[2].starts_with("10000\t50\t"));
        assert!(rows[3].starts_with("10000\t500\t"));
    }
}
