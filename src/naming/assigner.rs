// assigner.rs - Deterministic sequence → short-name assignment

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use super::base58;
use crate::core::merge::MergedRow;
use crate::error::{EnrichError, Result};
use crate::output::atomic_write;

/// Tag in front of every generated name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamePrefix {
    Seq,
    /// Nucleotide sequences (`counts/`)
    Nt,
    /// Amino-acid sequences (`counts.aa/`)
    Aa,
}

impl NamePrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamePrefix::Seq => "seq",
            NamePrefix::Nt => "nt",
            NamePrefix::Aa => "aa",
        }
    }

    /// Prefix for a counts-type subfolder name
    pub fn for_counts_type(counts_type: &str) -> Self {
        match counts_type {
            "counts" => NamePrefix::Nt,
            "counts.aa" => NamePrefix::Aa,
            _ => NamePrefix::Seq,
        }
    }
}

impl fmt::Display for NamePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamePrefix {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seq" => Ok(NamePrefix::Seq),
            "nt" => Ok(NamePrefix::Nt),
            "aa" => Ok(NamePrefix::Aa),
            other => Err(format!("Unknown name prefix '{}'. Use: seq, nt, aa", other)),
        }
    }
}

#[derive(Debug, Default)]
struct PrefixNames {
    names: HashMap<String, String>,
    /// Index of the next new name
    next: u64,
}

/// Sequence-name dictionary owned by one run.
///
/// The n-th distinct sequence of a prefix (counting from 1) is named
/// `<prefix>_<base58(n)>`, so the first nucleotide sequence is `nt_2`.
/// A loaded dictionary resumes after the highest index it contains.
#[derive(Debug, Default)]
pub struct NameAssigner {
    tables: HashMap<NamePrefix, PrefixNames>,
    dirty: bool,
}

impl NameAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for `sequence`, creating one on first encounter
    pub fn assign(&mut self, prefix: NamePrefix, sequence: &str) -> String {
        let table = self.tables.entry(prefix).or_default();
        if let Some(name) = table.names.get(sequence) {
            return name.clone();
        }

        table.next = table.next.max(1);
        let name = format!("{}_{}", prefix, base58::encode(table.next));
        table.next += 1;
        table.names.insert(sequence.to_string(), name.clone());
        self.dirty = true;
        name
    }

    /// Stamp every row, in row order
    pub fn stamp(&mut self, prefix: NamePrefix, rows: &mut [MergedRow]) {
        for row in rows.iter_mut() {
            row.unique_sequence_name = self.assign(prefix, &row.sequence);
        }
    }

    pub fn get(&self, prefix: NamePrefix, sequence: &str) -> Option<&str> {
        self.tables
            .get(&prefix)
            .and_then(|t| t.names.get(sequence))
            .map(|s| s.as_str())
    }

    /// Number of names held under one prefix
    pub fn len(&self, prefix: NamePrefix) -> usize {
        self.tables.get(&prefix).map_or(0, |t| t.names.len())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.names.is_empty())
    }

    /// Names were created since the last load/save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load a dictionary written by [`NameAssigner::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            EnrichError::NameDictionary(format!("failed to read {}: {}", path.display(), e))
        })?;
        let persisted: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_slice(&bytes)
            .map_err(|e| {
                EnrichError::NameDictionary(format!("failed to parse {}: {}", path.display(), e))
            })?;

        let mut assigner = Self::new();
        for (prefix_str, names) in persisted {
            let prefix = prefix_str
                .parse::<NamePrefix>()
                .map_err(EnrichError::NameDictionary)?;
            let table = assigner.tables.entry(prefix).or_default();

            let mut seen: HashMap<&str, &str> = HashMap::with_capacity(names.len());
            let mut highest = 0;
            for (sequence, name) in &names {
                if let Some(other) = seen.insert(name.as_str(), sequence.as_str()) {
                    return Err(EnrichError::NameDictionary(format!(
                        "name '{}' is assigned to both '{}' and '{}'",
                        name, other, sequence
                    )));
                }
                let index = name
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                    .and_then(base58::decode)
                    .ok_or_else(|| {
                        EnrichError::NameDictionary(format!(
                            "'{}' is not a valid {} name",
                            name, prefix
                        ))
                    })?;
                highest = highest.max(index);
            }

            table.next = highest + 1;
            table.names = names.into_iter().collect();
        }

        info!(
            "📂 Loaded {} sequence names from {}",
            assigner.tables.values().map(|t| t.names.len()).sum::<usize>(),
            path.display()
        );
        Ok(assigner)
    }

    /// Persist as `{prefix: {sequence: name}}` JSON via temp file and rename
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let persisted: BTreeMap<&str, BTreeMap<&str, &str>> = self
            .tables
            .iter()
            .map(|(prefix, table)| {
                let names = table
                    .names
                    .iter()
                    .map(|(seq, name)| (seq.as_str(), name.as_str()))
                    .collect();
                (prefix.as_str(), names)
            })
            .collect();

        let json = serde_json::to_vec_pretty(&persisted)
            .map_err(|e| EnrichError::NameDictionary(format!("failed to serialize: {}", e)))?;
        atomic_write(path, &json)?;

        debug!("Name dictionary written to {}", path.display());
        self.dirty = false;
        Ok(())
    }
}
