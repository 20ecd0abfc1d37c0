// bootstrap.rs - Binomial bootstrap engine with memoized intervals

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Binomial, Distribution};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EnrichError, Result};
use crate::output::atomic_write;

pub const DEFAULT_DEPTH: usize = 1000;
pub const DEFAULT_SEED: u64 = 42;
const CACHE_FORMAT_VERSION: u32 = 1;

/// Resampling parameters shared by every interval of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of binomial draws per interval
    pub depth: usize,
    /// RNG seed reset before every resampling call; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            seed: Some(DEFAULT_SEED),
        }
    }
}

/// Cache key: total molecules of the source and the observed count of one sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BootstrapKey {
    pub total: u64,
    pub observed: u64,
}

impl BootstrapKey {
    pub fn new(total: u64, observed: u64) -> Self {
        Self { total, observed }
    }

    /// Zero observations need no resampling: every draw is zero.
    /// This also covers `total == 0`, where the binomial parameter is undefined.
    pub fn is_degenerate(&self) -> bool {
        self.observed == 0 || self.total == 0
    }

    fn to_cache_string(self) -> String {
        format!("{}:{}", self.total, self.observed)
    }

    /// Parse a persisted `total:observed` key
    pub fn parse(s: &str) -> Option<Self> {
        let (total, observed) = s.split_once(':')?;
        Some(Self {
            total: total.parse().ok()?,
            observed: observed.parse().ok()?,
        })
    }
}

/// 95% bootstrap interval on a count, as absolute bounds `[p2.5, p97.5]`.
///
/// The absolute bounds are authoritative; the symmetric half-width is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapInterval {
    pub lower: f64,
    pub upper: f64,
}

impl BootstrapInterval {
    pub const DEGENERATE: BootstrapInterval = BootstrapInterval {
        lower: 0.0,
        upper: 0.0,
    };

    /// Symmetric margin `(upper - lower) / 2`
    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

/// Linear-interpolated percentile over sorted samples (`q` in 0..=100)
pub(crate) fn percentile(sorted: &[u64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Draw `depth` Binomial(total, observed/total) samples and take the 2.5th/97.5th percentiles.
///
/// The RNG is re-seeded on every call, so identical `(key, config)` always gives
/// the identical interval when a seed is set.
pub fn resample_interval(key: BootstrapKey, config: &BootstrapConfig) -> BootstrapInterval {
    if key.is_degenerate() || config.depth == 0 {
        return BootstrapInterval::DEGENERATE;
    }

    // observed > total only happens with inconsistent headers; saturate at p = 1
    let p = (key.observed as f64 / key.total as f64).min(1.0);
    let binomial = match Binomial::new(key.total, p) {
        Ok(b) => b,
        Err(_) => return BootstrapInterval::DEGENERATE,
    };

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut samples: Vec<u64> = (0..config.depth).map(|_| binomial.sample(&mut rng)).collect();
    samples.sort_unstable();

    BootstrapInterval {
        lower: round2(percentile(&samples, 2.5)),
        upper: round2(percentile(&samples, 97.5)),
    }
}

/// Persisted cache layout (LZ4-compressed JSON)
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedCache {
    pub data: HashMap<String, BootstrapInterval>, // "total:observed" keys for JSON compatibility
    pub metadata: CacheMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: String,
    pub created: String,
    pub last_modified: String,
    pub depth: usize,
    pub seed: Option<u64>,
    pub user_note: Option<String>,
    pub total_entries: usize,
    pub format_version: u32,
}

impl PersistedCache {
    /// Read and decompress a cache file without validating it against any engine
    pub fn read(path: &Path) -> Result<Self> {
        let compressed = std::fs::read(path)
            .map_err(|e| EnrichError::Cache(format!("failed to read {}: {}", path.display(), e)))?;
        let decompressed = lz4_flex::decompress_size_prepended(&compressed)
            .map_err(|e| EnrichError::Cache(format!("failed to decompress {}: {}", path.display(), e)))?;
        serde_json::from_slice(&decompressed)
            .map_err(|e| EnrichError::Cache(format!("failed to parse {}: {}", path.display(), e)))
    }
}

/// Bootstrap interval engine.
///
/// Owns the memoization cache for one run. Work is partitioned before it is
/// parallelized: [`BootstrapEngine::precompute`] filters the distinct keys that
/// are not cached yet and resamples only those, so no key is drawn twice.
pub struct BootstrapEngine {
    cache: HashMap<BootstrapKey, BootstrapInterval>,
    config: BootstrapConfig,
    cache_note: Option<String>,
    created: Option<String>,
    has_new_entries: bool,
    resample_count: usize,
    show_progress: bool,
}

impl BootstrapEngine {
    pub fn new(config: BootstrapConfig) -> Self {
        Self {
            cache: HashMap::new(),
            config,
            cache_note: None,
            created: None,
            has_new_entries: false,
            resample_count: 0,
            show_progress: false,
        }
    }

    /// Enable the precompute progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Set a user note for the cache
    pub fn set_cache_note(&mut self, note: String) {
        self.cache_note = Some(note);
    }

    /// Number of cached intervals
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of resampling calls performed by this engine
    pub fn resample_count(&self) -> usize {
        self.resample_count
    }

    /// Check if cache has new entries since last save/load
    pub fn has_new_entries(&self) -> bool {
        self.has_new_entries
    }

    pub fn cached(&self, key: BootstrapKey) -> Option<BootstrapInterval> {
        self.cache.get(&key).copied()
    }

    /// Interval for one `(total, observed)` pair, resampling only on a cache miss
    pub fn interval(&mut self, total: u64, observed: u64) -> BootstrapInterval {
        let key = BootstrapKey::new(total, observed);
        if key.is_degenerate() {
            return BootstrapInterval::DEGENERATE;
        }
        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }

        let interval = resample_interval(key, &self.config);
        self.resample_count += 1;
        self.cache.insert(key, interval);
        self.has_new_entries = true;
        interval
    }

    /// Resample every distinct key not in the cache yet, in parallel.
    /// Returns the number of keys that were resampled.
    pub fn precompute(&mut self, keys: &HashSet<BootstrapKey>) -> usize {
        let missing: Vec<BootstrapKey> = keys
            .iter()
            .filter(|k| !k.is_degenerate() && !self.cache.contains_key(k))
            .copied()
            .collect();

        let cached = keys.len() - missing.len();
        debug!(
            "Bootstrap keys: {} requested, {} cached or degenerate, {} to resample",
            keys.len(),
            cached,
            missing.len()
        );

        if missing.is_empty() {
            return 0;
        }

        let pb = if self.show_progress {
            let pb = ProgressBar::new(missing.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA: {eta}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();
        let completed = Arc::new(AtomicUsize::new(0));
        let update_frequency = 100;
        let config = self.config;

        let results: Vec<(BootstrapKey, BootstrapInterval)> = missing
            .par_iter()
            .map(|&key| {
                let interval = resample_interval(key, &config);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % update_frequency == 0 {
                    pb.set_position(done as u64);
                }
                (key, interval)
            })
            .collect();

        pb.finish_and_clear();

        let computed = results.len();
        self.cache.extend(results);
        self.resample_count += computed;
        self.has_new_entries = true;

        info!(
            "🎲 Resampled {} bootstrap intervals in {:.2}s ({} cached)",
            computed,
            start.elapsed().as_secs_f64(),
            self.cache.len()
        );
        computed
    }

    /// Save cache to an LZ4-compressed file via a temporary sibling and rename
    pub fn save_cache(&mut self, cache_path: &Path) -> Result<()> {
        let start = Instant::now();
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

        let data: HashMap<String, BootstrapInterval> = self
            .cache
            .iter()
            .map(|(key, interval)| (key.to_cache_string(), *interval))
            .collect();

        let metadata = CacheMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created: self.created.clone().unwrap_or_else(|| now.clone()),
            last_modified: now,
            depth: self.config.depth,
            seed: self.config.seed,
            user_note: self.cache_note.clone(),
            total_entries: self.cache.len(),
            format_version: CACHE_FORMAT_VERSION,
        };

        let persisted = PersistedCache { data, metadata };
        let json = serde_json::to_vec(&persisted)
            .map_err(|e| EnrichError::Cache(format!("failed to serialize cache: {}", e)))?;
        let compressed = lz4_flex::compress_prepend_size(&json);

        atomic_write(cache_path, &compressed)?;

        info!(
            "💾 Bootstrap cache saved to {} in {:.2}s ({} entries, {} KB)",
            cache_path.display(),
            start.elapsed().as_secs_f64(),
            self.cache.len(),
            compressed.len() / 1024
        );

        self.has_new_entries = false;
        Ok(())
    }

    fn check_metadata(&self, meta: &CacheMetadata) -> Result<()> {
        if meta.depth != self.config.depth || meta.seed != self.config.seed {
            return Err(EnrichError::Cache(format!(
                "config mismatch: cache has depth={} seed={:?}, engine has depth={} seed={:?}",
                meta.depth, meta.seed, self.config.depth, self.config.seed
            )));
        }
        Ok(())
    }

    /// Check that a cache file was built with this engine's depth and seed, without loading it
    pub fn check_cache_compatibility(&self, cache_path: &Path) -> Result<()> {
        let persisted = PersistedCache::read(cache_path)?;
        self.check_metadata(&persisted.metadata)
    }

    /// Load cache entries from disk; the file must match this engine's depth and seed
    pub fn load_cache(&mut self, cache_path: &Path) -> Result<()> {
        let start = Instant::now();
        let persisted = PersistedCache::read(cache_path)?;
        let meta = &persisted.metadata;
        self.check_metadata(meta)?;

        let mut loaded = HashMap::with_capacity(persisted.data.len());
        for (raw_key, interval) in &persisted.data {
            let key = BootstrapKey::parse(raw_key)
                .ok_or_else(|| EnrichError::Cache(format!("invalid cache key '{}'", raw_key)))?;
            loaded.insert(key, *interval);
        }

        self.cache.extend(loaded);
        self.created = Some(meta.created.clone());
        if self.cache_note.is_none() {
            self.cache_note = meta.user_note.clone();
        }
        if let Some(note) = &meta.user_note {
            info!("📝 Cache note: {}", note);
        }

        info!(
            "📂 Bootstrap cache loaded from {} in {:.2}s ({} entries)",
            cache_path.display(),
            start.elapsed().as_secs_f64(),
            self.cache.len()
        );

        self.has_new_entries = false;
        Ok(())
    }
}
