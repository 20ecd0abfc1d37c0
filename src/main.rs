// main.rs - CLI entry point

use std::time::Instant;

use selexboot::cli::Config;
use selexboot::pipeline::{CountsTypeStatus, RunPlan};
use selexboot::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let mut args: Args = argh::from_env();

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    init_tracing(args.quiet);

    info!("🚀 selexboot v{}", selexboot::VERSION);
    info!("⚡ Strategy: Collect distinct counts → Batch bootstrap → Per-round enrichment");

    // Validate all arguments
    let validation_result = validate_args(&args)?;

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        info!("🧵 Threads: {}", n);
    } else {
        info!("🧵 Threads: {} (auto-detected)", rayon::current_num_threads());
    }

    let ValidationResult {
        settings,
        bootstrap,
        cache_file,
        names_file,
    } = validation_result;

    match bootstrap.seed {
        Some(seed) => info!("🎲 Bootstrap: depth {}, seed {}", bootstrap.depth, seed),
        None => info!("🎲 Bootstrap: depth {}, unseeded", bootstrap.depth),
    }

    let mut engine = BootstrapEngine::new(bootstrap).with_progress(settings.show_progress);
    if let Some(note) = &args.cache_note {
        engine.set_cache_note(note.clone());
    }

    // Try to load existing cache first
    if let Some(cache_path) = &cache_file {
        if cache_path.exists() && !args.force_recompute {
            // Compatibility already checked during validation
            engine.load_cache(cache_path).map_err(|e| {
                format!(
                    "{}\n💡 Use --force-recompute to ignore the existing cache",
                    e
                )
            })?;
        } else if args.force_recompute && cache_path.exists() {
            info!("🔄 Force recompute: ignoring existing cache {}", cache_path.display());
        } else {
            info!("📝 Cache file {} will be created", cache_path.display());
        }
    }

    let names = match &names_file {
        Some(path) if path.exists() => NameAssigner::load(path).map_err(|e| e.to_string())?,
        _ => NameAssigner::new(),
    };

    let mut pipeline = EnrichmentPipeline::new(settings, engine, names);

    if args.dry_run {
        let plan = pipeline.plan().map_err(|e| e.to_string())?;
        print_plan(&plan);
        println!("✅ Dry run completed successfully");
        return Ok(());
    }

    let total_start = Instant::now();
    let summary = pipeline.run().map_err(|e| e.to_string())?;
    summary.log();

    let (mut engine, mut names) = pipeline.into_parts();

    // Save cache if new entries were added
    if let Some(cache_path) = &cache_file {
        if engine.has_new_entries() {
            if let Err(e) = engine.save_cache(cache_path) {
                warn!("⚠️  Failed to save cache: {}", e);
            }
        } else {
            info!("💾 Cache unchanged, not saving");
        }
    }

    if let Some(path) = &names_file {
        if names.is_dirty() {
            names.save(path).map_err(|e| e.to_string())?;
        }
    }

    if summary.rounds_written() == 0 {
        warn!("⚠️  No round was written");
    }
    info!("⏱️  Total time: {:.2}s", total_start.elapsed().as_secs_f64());
    Ok(())
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

fn print_plan(plan: &RunPlan) {
    println!(
        "📋 {} rounds, pre-selection data: {}, negative control: {}",
        plan.max_round,
        if plan.schema.has_pre { "yes" } else { "no" },
        if plan.schema.has_negative { "yes" } else { "no" }
    );
    for counts_type in &plan.counts_types {
        match &counts_type.status {
            CountsTypeStatus::Ready(rounds) => {
                println!("📁 {} ({})", counts_type.counts_type, counts_type.counts_dir.display());
                for round in rounds {
                    println!("   {}", round);
                    match round.headers() {
                        Ok(headers) => {
                            for (role, header) in headers {
                                println!(
                                    "      {:<8} {} unique, {} molecules",
                                    role, header.unique_sequences, header.total_molecules
                                );
                            }
                        }
                        Err(e) => println!("      ⚠️  {}", e),
                    }
                }
            }
            CountsTypeStatus::Skipped(reason) => {
                println!("⏭️  {}: {}", counts_type.counts_type, reason);
            }
        }
    }
}
