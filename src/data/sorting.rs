// sorting.rs - Sorting table mapping raw count files to rounds and roles

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::{Role, RunSchema};
use crate::error::{EnrichError, Result};

/// Default name of the sorting table inside a run directory
pub const DEFAULT_SORTING_TABLE: &str = "enrichment_analysis_file_sorting_logic.csv";

/// Extensions a count file may carry
const COUNT_EXTENSIONS: [&str; 2] = [".txt", ".csv"];

#[derive(Debug, Deserialize)]
struct SortingRow {
    filename: String,
    round_number: u32,
    file_type: String,
}

/// One row of the sorting table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortingEntry {
    /// Filename prefix of the raw count file
    pub filename: String,
    pub round: u32,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct SortingTable {
    pub path: PathBuf,
    pub entries: Vec<SortingEntry>,
}

impl SortingTable {
    /// Load the sorting table; a missing table is fatal for the run
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| EnrichError::SortingTable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_reader(path, file)
    }

    pub fn from_reader<R: Read>(path: &Path, reader: R) -> Result<Self> {
        let invalid = |reason: String| EnrichError::SortingTable {
            path: path.to_path_buf(),
            reason,
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (idx, row) in csv_reader.deserialize::<SortingRow>().enumerate() {
            let row = row.map_err(|e| invalid(format!("row {}: {}", idx + 2, e)))?;
            let role = row
                .file_type
                .parse::<Role>()
                .map_err(|e| invalid(format!("row {}: {}", idx + 2, e)))?;
            if row.round_number == 0 {
                return Err(invalid(format!("row {}: rounds are numbered from 1", idx + 2)));
            }
            entries.push(SortingEntry {
                filename: row.filename,
                round: row.round_number,
                role,
            });
        }

        if entries.is_empty() {
            return Err(invalid("no entries".to_string()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Highest round number listed
    pub fn max_round(&self) -> u32 {
        self.entries.iter().map(|e| e.round).max().unwrap_or(0)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.entries.iter().any(|e| e.role == role)
    }

    /// Column presence for the whole run
    pub fn schema(&self) -> RunSchema {
        RunSchema {
            has_pre: self.has_role(Role::Pre),
            has_negative: self.has_role(Role::Negative),
        }
    }

    /// First filename prefix listed for a role in a round
    pub fn filename_for(&self, role: Role, round: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.role == role && e.round == round)
            .map(|e| e.filename.as_str())
    }

    /// Resolve a role/round to its count file in `counts_dir`.
    ///
    /// A file whose stem equals the listed filename wins; otherwise the first
    /// prefix match in name order is used.
    pub fn resolve(&self, counts_dir: &Path, role: Role, round: u32) -> Result<Option<PathBuf>> {
        let Some(prefix) = self.filename_for(role, round) else {
            return Ok(None);
        };

        let mut matches: Vec<String> = list_visible_files(counts_dir)?
            .into_iter()
            .filter(|name| {
                name.starts_with(prefix) && COUNT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
            })
            .collect();
        matches.sort();

        let exact = matches.iter().position(|name| file_stem(name) == prefix);
        Ok(matches
            .get(exact.unwrap_or(0))
            .map(|name| counts_dir.join(name)))
    }

    /// Check the listed filenames against the files present in `counts_dir`.
    ///
    /// Directory names are compared up to their `_counts` suffix, as a multiset.
    pub fn check_against_dir(&self, counts_dir: &Path) -> Result<()> {
        let mut listed: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &self.entries {
            *listed.entry(entry.filename.clone()).or_default() += 1;
        }

        let mut present: BTreeMap<String, usize> = BTreeMap::new();
        for name in list_visible_files(counts_dir)? {
            *present.entry(file_stem(&name).to_string()).or_default() += 1;
        }

        if listed == present {
            return Ok(());
        }

        let only_listed: Vec<&str> = listed
            .keys()
            .filter(|k| !present.contains_key(*k))
            .map(|k| k.as_str())
            .collect();
        let only_present: Vec<&str> = present
            .keys()
            .filter(|k| !listed.contains_key(*k))
            .map(|k| k.as_str())
            .collect();

        Err(EnrichError::InconsistentSortingTable {
            dir: counts_dir.to_path_buf(),
            detail: format!(
                "missing from directory: {:?}, not in sorting table: {:?}",
                only_listed, only_present
            ),
        })
    }
}

/// Count file name up to its `_counts` suffix
fn file_stem(name: &str) -> &str {
    name.split("_counts").next().unwrap_or(name)
}

/// Non-hidden regular files in a directory
fn list_visible_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    Ok(names)
}
