// pipeline.rs - Multi-round enrichment driver

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::core::bootstrap::{BootstrapEngine, BootstrapKey};
use crate::core::enrichment::EnrichmentCalculator;
use crate::core::merge::RoundMerger;
use crate::data::sorting::DEFAULT_SORTING_TABLE;
use crate::data::{read_header, CountHeader, CountTable, RawCountTable, Role, RunSchema, SortingTable};
use crate::error::{EnrichError, Result};
use crate::naming::{NameAssigner, NamePrefix};
use crate::output::{write_pivots, write_round_file};

/// Counts subfolders processed when none are given
pub const DEFAULT_COUNTS_TYPES: [&str; 2] = ["counts", "counts.aa"];

pub const DEFAULT_PRECISION: usize = 6;

/// Everything a run needs besides the engine and the name dictionary
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Run directory holding the counts subfolders
    pub input_dir: PathBuf,
    /// Receives one `modified_<counts type>` folder per counts type
    pub output_dir: PathBuf,
    pub sorting_table: PathBuf,
    pub counts_types: Vec<String>,
    /// Decimal places of written frequencies and ratios
    pub precision: usize,
    pub show_progress: bool,
}

impl PipelineSettings {
    /// Defaults for a run directory: output next to the input, default sorting table
    pub fn for_dir(input_dir: impl Into<PathBuf>) -> Self {
        let input_dir = input_dir.into();
        Self {
            output_dir: input_dir.clone(),
            sorting_table: input_dir.join(DEFAULT_SORTING_TABLE),
            input_dir,
            counts_types: DEFAULT_COUNTS_TYPES.iter().map(|s| s.to_string()).collect(),
            precision: DEFAULT_PRECISION,
            show_progress: false,
        }
    }
}

/// Where the pre-selection baseline of a round comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreSource {
    File(PathBuf),
    /// Post-selection table of the given earlier round
    CarriedForward(u32),
    Missing,
}

/// Resolved input files of one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPlan {
    pub round: u32,
    pub pre: PreSource,
    pub post: Option<PathBuf>,
    pub neg: Option<PathBuf>,
}

impl RoundPlan {
    /// Header totals of the files this round reads itself, bodies untouched
    pub fn headers(&self) -> Result<Vec<(Role, CountHeader)>> {
        let pre = match &self.pre {
            PreSource::File(path) => Some(path),
            _ => None,
        };
        let sources = [(Role::Pre, pre), (Role::Post, self.post.as_ref()), (Role::Negative, self.neg.as_ref())];

        let mut headers = Vec::new();
        for (role, path) in sources {
            if let Some(path) = path {
                headers.push((role, read_header(path)?));
            }
        }
        Ok(headers)
    }
}

impl fmt::Display for RoundPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = |p: &Option<PathBuf>| {
            p.as_ref()
                .and_then(|p| p.file_name())
                .map_or_else(|| "-".to_string(), |n| n.to_string_lossy().into_owned())
        };
        let pre = match &self.pre {
            PreSource::File(p) => file(&Some(p.clone())),
            PreSource::CarriedForward(round) => format!("<post of round {}>", round),
            PreSource::Missing => "-".to_string(),
        };
        write!(
            f,
            "round {:>3}: pre={} post={} neg={}",
            self.round,
            pre,
            file(&self.post),
            file(&self.neg)
        )
    }
}

#[derive(Debug, Clone)]
pub enum CountsTypeStatus {
    Ready(Vec<RoundPlan>),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct CountsTypePlan {
    pub counts_type: String,
    pub counts_dir: PathBuf,
    pub status: CountsTypeStatus,
}

/// Resolved plan of a whole run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub schema: RunSchema,
    pub max_round: u32,
    pub counts_types: Vec<CountsTypePlan>,
}

/// Outcome for one counts subfolder
#[derive(Debug, Clone, Default)]
pub struct CountsTypeSummary {
    pub counts_type: String,
    pub output_dir: PathBuf,
    pub rounds_written: Vec<PathBuf>,
    pub rounds_skipped: Vec<(u32, String)>,
    pub pivot_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub processed: Vec<CountsTypeSummary>,
    /// Counts types that were not processed, with the reason
    pub skipped: Vec<(String, String)>,
    /// Intervals resampled during this run
    pub resampled: usize,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn rounds_written(&self) -> usize {
        self.processed.iter().map(|s| s.rounds_written.len()).sum()
    }

    pub fn rounds_skipped(&self) -> usize {
        self.processed.iter().map(|s| s.rounds_skipped.len()).sum()
    }

    pub fn log(&self) {
        for summary in &self.processed {
            info!(
                "📁 {}: {} rounds written, {} skipped, {} pivot tables → {}",
                summary.counts_type,
                summary.rounds_written.len(),
                summary.rounds_skipped.len(),
                summary.pivot_files.len(),
                summary.output_dir.display()
            );
            for (round, reason) in &summary.rounds_skipped {
                warn!("   ⏭️  round {} skipped: {}", round, reason);
            }
        }
        for (counts_type, reason) in &self.skipped {
            info!("⏭️  {} not processed: {}", counts_type, reason);
        }
        info!(
            "🎉 Done in {:.2}s: {} rounds written, {} intervals resampled",
            self.elapsed_secs,
            self.rounds_written(),
            self.resampled
        );
    }
}

/// Tables of one round, bounds attached
struct LoadedRound {
    pre: Option<CountTable>,
    post: CountTable,
    neg: Option<CountTable>,
}

/// Runs every counts type of a directory through load → merge → name → enrich → write,
/// then aggregates the written rounds.
///
/// Owns the bootstrap engine and the name dictionary for the duration of the run;
/// [`EnrichmentPipeline::into_parts`] hands them back for persistence.
pub struct EnrichmentPipeline {
    settings: PipelineSettings,
    engine: BootstrapEngine,
    names: NameAssigner,
}

impl EnrichmentPipeline {
    pub fn new(settings: PipelineSettings, engine: BootstrapEngine, names: NameAssigner) -> Self {
        Self {
            settings,
            engine,
            names,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn engine(&self) -> &BootstrapEngine {
        &self.engine
    }

    pub fn names(&self) -> &NameAssigner {
        &self.names
    }

    pub fn into_parts(self) -> (BootstrapEngine, NameAssigner) {
        (self.engine, self.names)
    }

    /// Resolve every round of every counts type without reading any count file.
    ///
    /// A missing run directory or sorting table is fatal; a missing or
    /// inconsistent counts subfolder only marks that counts type as skipped.
    pub fn plan(&self) -> Result<RunPlan> {
        let input_dir = &self.settings.input_dir;
        if !input_dir.is_dir() {
            return Err(EnrichError::MissingDirectory(input_dir.clone()));
        }
        let table = SortingTable::from_file(&self.settings.sorting_table)?;
        let max_round = table.max_round();

        let mut counts_types = Vec::with_capacity(self.settings.counts_types.len());
        for counts_type in &self.settings.counts_types {
            let counts_dir = input_dir.join(counts_type);
            let status = if !counts_dir.is_dir() {
                CountsTypeStatus::Skipped(format!("no {} folder", counts_type))
            } else {
                match plan_rounds(&table, &counts_dir) {
                    Ok(rounds) => CountsTypeStatus::Ready(rounds),
                    Err(e) => CountsTypeStatus::Skipped(e.to_string()),
                }
            };
            counts_types.push(CountsTypePlan {
                counts_type: counts_type.clone(),
                counts_dir,
                status,
            });
        }

        Ok(RunPlan {
            schema: table.schema(),
            max_round,
            counts_types,
        })
    }

    /// Process every counts type. Only a missing directory or sorting table is an error;
    /// failed rounds and counts types are recorded in the summary.
    pub fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        let resampled_before = self.engine.resample_count();
        let plan = self.plan()?;

        info!(
            "🧪 {} rounds, pre-selection data: {}, negative control: {}",
            plan.max_round,
            if plan.schema.has_pre { "yes" } else { "no" },
            if plan.schema.has_negative { "yes" } else { "no" }
        );

        let mut summary = RunSummary::default();
        for counts_plan in plan.counts_types {
            match counts_plan.status {
                CountsTypeStatus::Skipped(reason) => {
                    if counts_plan.counts_dir.is_dir() {
                        error!("❌ Skipping {}: {}", counts_plan.counts_type, reason);
                    } else {
                        info!("⏭️  Skipping {}: {}", counts_plan.counts_type, reason);
                    }
                    summary.skipped.push((counts_plan.counts_type, reason));
                }
                CountsTypeStatus::Ready(rounds) => {
                    let processed =
                        self.process_counts_type(&counts_plan.counts_type, &rounds, plan.schema);
                    summary.processed.push(processed);
                }
            }
        }

        summary.resampled = self.engine.resample_count() - resampled_before;
        summary.elapsed_secs = start.elapsed().as_secs_f64();
        Ok(summary)
    }

    fn process_counts_type(
        &mut self,
        counts_type: &str,
        rounds: &[RoundPlan],
        schema: RunSchema,
    ) -> CountsTypeSummary {
        let output_dir = self.settings.output_dir.join(format!("modified_{}", counts_type));
        let prefix = NamePrefix::for_counts_type(counts_type);
        info!("🔬 Processing {} → {}", counts_type, output_dir.display());

        let mut summary = CountsTypeSummary {
            counts_type: counts_type.to_string(),
            output_dir: output_dir.clone(),
            ..Default::default()
        };

        let pb = if self.settings.show_progress {
            let pb = ProgressBar::new(rounds.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rounds {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        // Rounds run in order: the post table of one round may be the next round's baseline
        let mut previous_post: Option<CountTable> = None;
        for plan in rounds {
            pb.set_message(format!("{} round {}", counts_type, plan.round));

            let carried = match plan.pre {
                PreSource::CarriedForward(_) => previous_post.take(),
                _ => None,
            };
            let loaded = match self.load_round(plan, carried) {
                Ok(loaded) => loaded,
                Err(e) => {
                    error!("❌ Round {} of {} skipped: {}", plan.round, counts_type, e);
                    summary.rounds_skipped.push((plan.round, e.to_string()));
                    previous_post = None;
                    pb.inc(1);
                    continue;
                }
            };

            let mut merged = RoundMerger::merge(&loaded.post, loaded.pre.as_ref(), loaded.neg.as_ref());
            self.names.stamp(prefix, &mut merged.rows);
            let enriched = EnrichmentCalculator::enrich(merged);

            match write_round_file(&output_dir, &enriched, schema, self.settings.precision) {
                Ok(path) => summary.rounds_written.push(path),
                Err(e) => {
                    error!("❌ Round {} of {} not written: {}", plan.round, counts_type, e);
                    summary.rounds_skipped.push((plan.round, e.to_string()));
                }
            }

            previous_post = Some(loaded.post);
            pb.inc(1);
        }
        pb.finish_and_clear();

        if !summary.rounds_written.is_empty() {
            match write_pivots(&output_dir, schema, Some(summary.rounds_written.as_slice())) {
                Ok(files) => summary.pivot_files = files,
                Err(e) => error!("❌ Cross-round tables for {} not written: {}", counts_type, e),
            }
        }
        summary
    }

    /// Load the tables of one round and attach bootstrap bounds.
    ///
    /// The distinct keys of all sources are resampled together before any
    /// table is converted. A failing pre or negative file is treated as absent.
    fn load_round(&mut self, plan: &RoundPlan, carried: Option<CountTable>) -> Result<LoadedRound> {
        let post_path = plan
            .post
            .as_ref()
            .ok_or(EnrichError::MissingMandatorySource { round: plan.round })?;
        let post = RawCountTable::load(post_path, plan.round, Role::Post)?;

        let pre = match &plan.pre {
            PreSource::File(path) => load_optional(path, plan.round, Role::Pre),
            _ => None,
        };
        let neg = plan
            .neg
            .as_ref()
            .and_then(|path| load_optional(path, plan.round, Role::Negative));

        let mut keys: HashSet<BootstrapKey> = post.bootstrap_keys();
        for raw in pre.iter().chain(neg.iter()) {
            keys.extend(raw.bootstrap_keys());
        }
        self.engine.precompute(&keys);

        let post = post.into_table(&mut self.engine);
        let pre = match pre {
            Some(raw) => Some(raw.into_table(&mut self.engine)),
            None => {
                if let (PreSource::CarriedForward(from), Some(table)) = (&plan.pre, &carried) {
                    info!(
                        "↪️  Round {}: using round {} post-selection as baseline ({} sequences)",
                        plan.round,
                        from,
                        table.records.len()
                    );
                }
                carried
            }
        };
        let neg = neg.map(|raw| raw.into_table(&mut self.engine));

        Ok(LoadedRound { pre, post, neg })
    }
}

/// Load an optional source, logging and dropping it on failure
fn load_optional(path: &Path, round: u32, role: Role) -> Option<RawCountTable> {
    match RawCountTable::load(path, round, role) {
        Ok(table) => Some(table),
        Err(e) => {
            warn!("⚠️  Round {} {} treated as missing: {}", round, role, e);
            None
        }
    }
}

/// Resolve the files of every round listed in the sorting table
pub fn plan_rounds(table: &SortingTable, counts_dir: &Path) -> Result<Vec<RoundPlan>> {
    table.check_against_dir(counts_dir)?;

    let mut plans = Vec::with_capacity(table.max_round() as usize);
    for round in 1..=table.max_round() {
        let post = table.resolve(counts_dir, Role::Post, round)?;
        let neg = table.resolve(counts_dir, Role::Negative, round)?;
        let pre = match table.resolve(counts_dir, Role::Pre, round)? {
            Some(path) => PreSource::File(path),
            None if round > 1 => PreSource::CarriedForward(round - 1),
            None => PreSource::Missing,
        };
        plans.push(RoundPlan {
            round,
            pre,
            post,
            neg,
        });
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bootstrap::BootstrapConfig;
    use crate::output::read_round_table;
    use std::fs;

    fn count_file(dir: &Path, name: &str, total: u64, rows: &[(&str, u64)]) {
        let mut content = format!(
            "number of unique sequences = {}\ntotal number of molecules = {}\n\n",
            rows.len(),
            total
        );
        for (seq, count) in rows {
            content.push_str(&format!("{}    {}\n", seq, count));
        }
        fs::write(dir.join(name), content).unwrap();
    }

    fn run_dir(sorting: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("counts")).unwrap();
        fs::write(dir.path().join(DEFAULT_SORTING_TABLE), sorting).unwrap();
        dir
    }

    fn pipeline(dir: &Path) -> EnrichmentPipeline {
        EnrichmentPipeline::new(
            PipelineSettings::for_dir(dir),
            BootstrapEngine::new(BootstrapConfig {
                depth: 200,
                seed: Some(42),
            }),
            NameAssigner::new(),
        )
    }

    #[test]
    fn test_carry_forward_baseline() {
        let dir = run_dir("filename,round_number,file_type\nr1post,1,post\nr2post,2,post\n");
        let counts = dir.path().join("counts");
        count_file(&counts, "r1post_counts.txt", 10_000, &[("ACGT", 100), ("TTTT", 50)]);
        count_file(&counts, "r2post_counts.txt", 10_000, &[("ACGT", 400), ("GGGG", 20)]);

        let mut pipeline = pipeline(dir.path());
        let summary = pipeline.run().unwrap();
        assert_eq!(summary.rounds_written(), 2);
        assert_eq!(summary.skipped.len(), 1); // no counts.aa folder

        let out = dir.path().join("modified_counts");
        let r1 = read_round_table(&out.join("round_001_enrichment_analysis.csv")).unwrap();
        let r2 = read_round_table(&out.join("round_002_enrichment_analysis.csv")).unwrap();

        let find = |table: &crate::output::RoundTable, seq: &str| {
            table
                .records
                .iter()
                .find(|r| table.cell(r, "Sequence") == Some(seq))
                .cloned()
                .unwrap()
        };

        let acgt_1 = find(&r1, "ACGT");
        let acgt_2 = find(&r2, "ACGT");
        assert_eq!(r2.cell(&acgt_2, "Count_pre"), r1.cell(&acgt_1, "Count_post"));
        assert_eq!(r2.cell(&acgt_2, "Count_pre"), Some("100"));
        assert_eq!(r2.cell(&acgt_2, "Count_Lower_pre"), r1.cell(&acgt_1, "Count_Lower_post"));
        assert_eq!(r1.cell(&acgt_1, "Enr_post"), Some(""));
        assert_eq!(r2.cell(&acgt_2, "Enr_post"), Some("4.000000"));

        // same name in both rounds
        assert_eq!(r1.cell(&acgt_1, "Unique_Sequence_Name"), Some("nt_2"));
        assert_eq!(r2.cell(&acgt_2, "Unique_Sequence_Name"), Some("nt_2"));
        assert_eq!(r2.cell(&find(&r2, "GGGG"), "Unique_Sequence_Name"), Some("nt_4"));

        // new in round 2: no baseline
        assert_eq!(r2.cell(&find(&r2, "GGGG"), "Count_pre"), Some("0"));

        assert!(out.join("all_rounds_enrichment_post_results.csv").exists());
        assert!(out.join("all_rounds_frequency_post_results.csv").exists());
    }

    #[test]
    fn test_missing_post_round_is_skipped() {
        let dir = run_dir(
            "filename,round_number,file_type\nr1post,1,post\nr2pre,2,pre\nr3post,3,post\n",
        );
        let counts = dir.path().join("counts");
        count_file(&counts, "r1post_counts.txt", 1_000, &[("ACGT", 10)]);
        count_file(&counts, "r2pre_counts.txt", 1_000, &[("ACGT", 10)]);
        count_file(&counts, "r3post_counts.txt", 1_000, &[("ACGT", 30)]);

        let summary = pipeline(dir.path()).run().unwrap();
        let processed = &summary.processed[0];
        assert_eq!(processed.rounds_written.len(), 2);
        assert_eq!(processed.rounds_skipped.len(), 1);
        assert_eq!(processed.rounds_skipped[0].0, 2);

        let out = dir.path().join("modified_counts");
        assert!(out.join("round_001_enrichment_analysis.csv").exists());
        assert!(!out.join("round_002_enrichment_analysis.csv").exists());

        // round 2 produced no post table to carry into round 3
        let r3 = read_round_table(&out.join("round_003_enrichment_analysis.csv")).unwrap();
        assert_eq!(r3.cell(&r3.records[0], "Count_pre"), Some("0"));

        let pivot = fs::read_to_string(out.join("all_rounds_enrichment_post_results.csv")).unwrap();
        assert!(pivot.starts_with("Unique_Sequence_Name,Sequence,001_Enr_post,003_Enr_post"));
    }

    #[test]
    fn test_plan_reads_headers_only() {
        let dir = run_dir("filename,round_number,file_type\nr1in,1,pre\nr1out,1,post\nr2out,2,post\n");
        let counts = dir.path().join("counts");
        count_file(&counts, "r1in_counts.txt", 500, &[("ACGT", 5), ("TTTT", 3)]);
        count_file(&counts, "r1out_counts.txt", 800, &[("ACGT", 40)]);
        fs::write(counts.join("r2out_counts.txt"), "number of unique sequences = 1\n").unwrap();

        let table = SortingTable::from_file(&dir.path().join(DEFAULT_SORTING_TABLE)).unwrap();
        let rounds = plan_rounds(&table, &counts).unwrap();

        let headers = rounds[0].headers().unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, Role::Pre);
        assert_eq!(headers[0].1.unique_sequences, 2);
        assert_eq!(headers[1].0, Role::Post);
        assert_eq!(headers[1].1.total_molecules, 800);

        // round 2 carries round 1 forward and has a truncated post header
        assert_eq!(rounds[1].pre, PreSource::CarriedForward(1));
        assert!(matches!(rounds[1].headers(), Err(EnrichError::MalformedHeader { .. })));
    }

    #[test]
    fn test_stale_round_file_not_aggregated() {
        let dir = run_dir("filename,round_number,file_type\nr1post,1,post\nr2post,2,post\n");
        let counts = dir.path().join("counts");
        count_file(&counts, "r1post_counts.txt", 1_000, &[("ACGT", 10)]);
        fs::write(counts.join("r2post_counts.txt"), "not a header\n").unwrap();

        // left over from an earlier run in which round 2 succeeded
        let out = dir.path().join("modified_counts");
        fs::create_dir_all(&out).unwrap();
        fs::write(
            out.join("round_002_enrichment_analysis.csv"),
            "Number of Unique Sequences (Post),1\n\nUnique_Sequence_Name,Sequence,Freq_post,Enr_post\nnt_9,TTTT,1.0%,5.0\n",
        )
        .unwrap();

        let summary = pipeline(dir.path()).run().unwrap();
        assert_eq!(summary.processed[0].rounds_written.len(), 1);
        assert_eq!(summary.processed[0].rounds_skipped[0].0, 2);

        let pivot = fs::read_to_string(out.join("all_rounds_enrichment_post_results.csv")).unwrap();
        assert!(pivot.starts_with("Unique_Sequence_Name,Sequence,001_Enr_post\n"));
        assert!(!pivot.contains("TTTT"));
    }

    #[test]
    fn test_negative_control_columns() {
        let dir = run_dir(
            "filename,round_number,file_type\nr1in,1,in\nr1out,1,out\nr1neg,1,neg\n",
        );
        let counts = dir.path().join("counts");
        count_file(&counts, "r1in_counts.txt", 10_000, &[("ACGT", 50), ("TTTT", 200)]);
        count_file(&counts, "r1out_counts.txt", 10_000, &[("ACGT", 400), ("TTTT", 100)]);
        count_file(&counts, "r1neg_counts.txt", 10_000, &[("TTTT", 150)]);

        let summary = pipeline(dir.path()).run().unwrap();
        assert_eq!(summary.rounds_written(), 1);
        assert!(summary.resampled > 0);

        let out = dir.path().join("modified_counts");
        let r1 = read_round_table(&out.join("round_001_enrichment_analysis.csv")).unwrap();
        assert!(r1.has_column("Count_neg"));
        assert!(r1.has_column("Enr_ratio_upper"));

        let acgt = &r1.records[0];
        assert_eq!(r1.cell(acgt, "Sequence"), Some("ACGT"));
        assert_eq!(r1.cell(acgt, "Count_neg"), Some("0"));
        assert_eq!(r1.cell(acgt, "Enr_neg"), Some(""));
        assert_eq!(r1.cell(acgt, "Enr_ratio"), Some(""));
        assert_eq!(r1.cell(acgt, "Enr_post"), Some("8.000000"));

        let tttt = &r1.records[1];
        assert_eq!(r1.cell(tttt, "Count_neg"), Some("150"));
        assert_eq!(r1.cell(tttt, "Enr_neg"), Some("0.750000"));
        assert_eq!(r1.cell(tttt, "Enr_ratio"), Some("0.666667"));

        assert_eq!(summary.processed[0].pivot_files.len(), 6);
        assert!(out.join("all_rounds_enrichment_ratio_results.csv").exists());
        assert!(out.join("all_rounds_frequency_pre_results.csv").exists());
    }

    #[test]
    fn test_fatal_and_skipped_inputs() {
        let missing = pipeline(Path::new("/nonexistent/run")).run();
        assert!(matches!(missing, Err(EnrichError::MissingDirectory(_))));

        let dir = tempfile::tempdir().unwrap();
        let no_table = pipeline(dir.path()).run();
        assert!(matches!(no_table, Err(EnrichError::SortingTable { .. })));

        // stray file in counts/: that counts type is skipped, the run is not
        let dir = run_dir("filename,round_number,file_type\nr1post,1,post\n");
        let counts = dir.path().join("counts");
        count_file(&counts, "r1post_counts.txt", 100, &[("ACGT", 10)]);
        count_file(&counts, "stray_counts.txt", 100, &[("ACGT", 10)]);
        let summary = pipeline(dir.path()).run().unwrap();
        assert!(summary.processed.is_empty());
        assert_eq!(summary.skipped.len(), 2);
        assert!(!dir.path().join("modified_counts").exists());
    }

    #[test]
    fn test_amino_acid_folder_uses_own_prefix() {
        let dir = run_dir("filename,round_number,file_type\nr1post,1,post\n");
        let aa = dir.path().join("counts.aa");
        fs::create_dir(&aa).unwrap();
        count_file(&dir.path().join("counts"), "r1post_counts.txt", 100, &[("ACGT", 10)]);
        count_file(&aa, "r1post_counts.txt", 100, &[("MKV", 10)]);

        let mut pipeline = pipeline(dir.path());
        let summary = pipeline.run().unwrap();
        assert_eq!(summary.processed.len(), 2);
        assert_eq!(pipeline.names().get(NamePrefix::Nt, "ACGT"), Some("nt_2"));
        assert_eq!(pipeline.names().get(NamePrefix::Aa, "MKV"), Some("aa_2"));
    }

    #[test]
    fn test_plan_resolves_rounds() {
        let dir = run_dir("filename,round_number,file_type\nr1pre,1,pre\nr1post,1,post\nr2post,2,post\n");
        let counts = dir.path().join("counts");
        for name in ["r1pre_counts.txt", "r1post_counts.txt", "r2post_counts.txt"] {
            count_file(&counts, name, 100, &[("ACGT", 10)]);
        }

        let plan = pipeline(dir.path()).plan().unwrap();
        assert_eq!(plan.max_round, 2);
        assert!(plan.schema.has_pre);
        let CountsTypeStatus::Ready(rounds) = &plan.counts_types[0].status else {
            panic!("counts should be ready");
        };
        assert_eq!(rounds[0].pre, PreSource::File(counts.join("r1pre_counts.txt")));
        assert_eq!(rounds[1].pre, PreSource::CarriedForward(1));
        assert!(rounds[1].neg.is_none());
        assert!(matches!(plan.counts_types[1].status, CountsTypeStatus::Skipped(_)));
    }
}
