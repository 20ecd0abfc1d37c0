// pivot.rs - Cross-round wide tables, one per metric family

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};

use super::round::{read_round_table, RoundTable, ROUND_FILE_SUFFIX};
use super::{atomic_write, parse_cell};
use crate::data::RunSchema;
use crate::error::{EnrichError, Result};

/// Metric pivoted across rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    EnrPost,
    FreqPost,
    EnrRatio,
    EnrNeg,
    FreqNeg,
    FreqPre,
}

impl MetricFamily {
    /// Source column in the round files
    pub fn column(&self) -> &'static str {
        match self {
            MetricFamily::EnrPost => "Enr_post",
            MetricFamily::FreqPost => "Freq_post",
            MetricFamily::EnrRatio => "Enr_ratio",
            MetricFamily::EnrNeg => "Enr_neg",
            MetricFamily::FreqNeg => "Freq_neg",
            MetricFamily::FreqPre => "Freq_pre",
        }
    }

    /// Families worth pivoting for a run
    pub fn for_schema(schema: RunSchema) -> Vec<MetricFamily> {
        let mut families = vec![MetricFamily::EnrPost, MetricFamily::FreqPost];
        if schema.has_negative {
            families.extend([MetricFamily::EnrRatio, MetricFamily::EnrNeg, MetricFamily::FreqNeg]);
        }
        if schema.has_pre {
            families.push(MetricFamily::FreqPre);
        }
        families
    }

    pub fn file_name(&self) -> String {
        pivot_file_name(self.column())
    }
}

/// `Enr_post` → `all_rounds_enrichment_post_results.csv`
pub fn pivot_file_name(column: &str) -> String {
    let expanded = column
        .to_lowercase()
        .replace("enr", "enrichment")
        .replace("neg", "negative")
        .replace("freq", "frequency");
    format!("all_rounds_{}_results.csv", expanded)
}

/// Round result files in `dir` with their round label (`001`), sorted by name
fn round_files(dir: &Path) -> Result<Vec<(String, String, PathBuf)>> {
    let pattern = format!(r"^round_([^_]+){}$", regex::escape(ROUND_FILE_SUFFIX));
    let round_file = Regex::new(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(label) = round_file.captures(&name).and_then(|c| c.get(1)) else {
            continue;
        };
        let label = label.as_str().to_string();
        files.push((name, label, entry.path()));
    }
    files.sort();
    Ok(files)
}

struct PivotRow {
    name: String,
    sequence: String,
    /// `[family][round]`
    cells: Vec<Vec<Option<String>>>,
}

/// Outer join of every round on `(Unique_Sequence_Name, Sequence)`, in order of first appearance
fn join_rounds(tables: &[RoundTable], families: &[MetricFamily]) -> Vec<PivotRow> {
    let mut rows: Vec<PivotRow> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for (round_idx, table) in tables.iter().enumerate() {
        let (Some(name_col), Some(seq_col)) =
            (table.column("Unique_Sequence_Name"), table.column("Sequence"))
        else {
            warn!("⚠️  {} has no sequence columns, skipped", table.path.display());
            continue;
        };
        let metric_cols: Vec<Option<usize>> = families.iter().map(|f| table.column(f.column())).collect();

        for record in &table.records {
            let key = (
                record.get(name_col).unwrap_or("").to_string(),
                record.get(seq_col).unwrap_or("").to_string(),
            );
            let row_idx = *index.entry(key.clone()).or_insert_with(|| {
                rows.push(PivotRow {
                    name: key.0,
                    sequence: key.1,
                    cells: vec![vec![None; tables.len()]; families.len()],
                });
                rows.len() - 1
            });

            let row = &mut rows[row_idx];
            for (family_idx, col) in metric_cols.iter().enumerate() {
                let slot = &mut row.cells[family_idx][round_idx];
                // first occurrence within a round wins
                if slot.is_none() {
                    *slot = col.and_then(|c| record.get(c)).map(str::to_string);
                }
            }
        }
    }
    rows
}

/// Build the `all_rounds_*` tables from the round files in `dir`.
///
/// With `only`, round files not listed there are left out of the join. Each
/// table has one column per round and is sorted descending by the last
/// round's value, missing values last. Returns the paths written.
pub fn write_pivots(dir: &Path, schema: RunSchema, only: Option<&[PathBuf]>) -> Result<Vec<PathBuf>> {
    let mut files = round_files(dir)?;
    if let Some(only) = only {
        files.retain(|(name, _, _)| {
            only.iter()
                .any(|p| p.file_name().map_or(false, |n| n.to_string_lossy() == name.as_str()))
        });
    }
    if files.is_empty() {
        warn!("⚠️  No round result files in {}, nothing to aggregate", dir.display());
        return Ok(Vec::new());
    }

    let mut labels = Vec::with_capacity(files.len());
    let mut tables = Vec::with_capacity(files.len());
    for (_, label, path) in &files {
        labels.push(label.clone());
        tables.push(read_round_table(path)?);
    }

    let families = MetricFamily::for_schema(schema);
    let rows = join_rounds(&tables, &families);
    let last_round = tables.len() - 1;

    let mut written = Vec::with_capacity(families.len());
    for (family_idx, family) in families.iter().enumerate() {
        let mut order: Vec<(usize, Option<f64>)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let key = row.cells[family_idx][last_round].as_deref().and_then(parse_cell);
                (i, key)
            })
            .collect();
        // stable; None sorts after every value
        order.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let path = dir.join(family.file_name());
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec!["Unique_Sequence_Name".to_string(), "Sequence".to_string()];
        header.extend(labels.iter().map(|label| format!("{}_{}", label, family.column())));
        writer.write_record(&header)?;

        for (row_idx, _) in &order {
            let row = &rows[*row_idx];
            let mut record = vec![row.name.as_str(), row.sequence.as_str()];
            record.extend(row.cells[family_idx].iter().map(|c| c.as_deref().unwrap_or("")));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EnrichError::write_failure(&path, e.into_error()))?;
        atomic_write(&path, &bytes)?;
        written.push(path);
    }

    info!(
        "📊 Aggregated {} rounds into {} tables in {}",
        tables.len(),
        written.len(),
        dir.display()
    );
    Ok(written)
}
