// round.rs - Per-round enrichment result files

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{info, warn};

use super::{atomic_write, ensure_parent_dir, format_count, format_percent, format_ratio};
use crate::core::enrichment::{EnrichedRound, EnrichedRow};
use crate::core::merge::SourceMeasures;
use crate::data::{Role, RunSchema};
use crate::error::{EnrichError, Result};

/// Every round result file ends with this
pub const ROUND_FILE_SUFFIX: &str = "_enrichment_analysis.csv";

/// Metadata lines above the blank separator
const METADATA_LINES: usize = 6;

/// Metadata block plus the blank separator line
pub const PREAMBLE_LINES: usize = METADATA_LINES + 1;

const MEASURE_COLUMNS: [&str; 6] = [
    "Count",
    "Count_Lower",
    "Count_Upper",
    "Freq",
    "Freq_Lower",
    "Freq_Upper",
];

/// `round_001_enrichment_analysis.csv`
pub fn round_file_name(round: u32) -> String {
    format!("round_{:03}{}", round, ROUND_FILE_SUFFIX)
}

/// Column header row of a round file
pub fn column_names(schema: RunSchema) -> Vec<String> {
    let mut columns = vec!["Unique_Sequence_Name".to_string(), "Sequence".to_string()];

    for role in written_roles(schema) {
        columns.extend(MEASURE_COLUMNS.iter().map(|c| format!("{}_{}", c, role.suffix())));
    }

    let families: &[&str] = if schema.has_negative {
        &["Enr_post", "Enr_neg", "Enr_ratio"]
    } else {
        &["Enr_post"]
    };
    for family in families {
        columns.push(family.to_string());
        columns.push(format!("{}_lower", family));
        columns.push(format!("{}_upper", family));
    }
    columns
}

/// Pre and post columns are always written; negative columns only when the run has any
fn written_roles(schema: RunSchema) -> Vec<Role> {
    if schema.has_negative {
        vec![Role::Pre, Role::Post, Role::Negative]
    } else {
        vec![Role::Pre, Role::Post]
    }
}

fn measure_cells(measures: Option<&SourceMeasures>, precision: usize) -> [String; 6] {
    [
        format_count(measures.map(|m| m.count)),
        format_count(measures.map(|m| m.count_lower)),
        format_count(measures.map(|m| m.count_upper)),
        format_percent(measures.map(|m| m.freq), precision),
        format_percent(measures.map(|m| m.freq_lower), precision),
        format_percent(measures.map(|m| m.freq_upper), precision),
    ]
}

fn row_cells(enriched: &EnrichedRow, schema: RunSchema, precision: usize) -> Vec<String> {
    let row = &enriched.row;
    let enr = &enriched.enrichment;

    let mut cells = Vec::with_capacity(2 + 6 * 3 + 9);
    cells.push(row.unique_sequence_name.clone());
    cells.push(row.sequence.clone());
    for role in written_roles(schema) {
        cells.extend(measure_cells(row.measures(role), precision));
    }

    let mut ratios = vec![enr.enr_post, enr.enr_post_lower, enr.enr_post_upper];
    if schema.has_negative {
        ratios.extend([
            enr.enr_neg,
            enr.enr_neg_lower,
            enr.enr_neg_upper,
            enr.enr_ratio,
            enr.enr_ratio_lower,
            enr.enr_ratio_upper,
        ]);
    }
    cells.extend(ratios.into_iter().map(|v| format_ratio(v, precision)));
    cells
}

/// Six `<label>,<value>` lines and the blank separator
fn metadata_block(round: &EnrichedRound) -> String {
    let mut block = String::new();
    for role in Role::ALL {
        let header = round.totals.for_role(role);
        block.push_str(&format!(
            "Number of Unique Sequences ({}),{}\n",
            role.header_label(),
            header.map_or(0, |h| h.unique_sequences)
        ));
        block.push_str(&format!(
            "Total Number of Molecules ({}),{}\n",
            role.header_label(),
            header.map_or(0, |h| h.total_molecules)
        ));
    }
    block.push('\n');
    block
}

/// Write one round's enriched table into `dir`.
///
/// The body goes to a temporary CSV first; the metadata block and body are then
/// composed into the destination through a rename, and the temporary CSV is removed.
/// No partially written destination is ever left behind.
pub fn write_round_file(
    dir: &Path,
    round: &EnrichedRound,
    schema: RunSchema,
    precision: usize,
) -> Result<PathBuf> {
    let dest = dir.join(round_file_name(round.round));
    ensure_parent_dir(&dest)?;
    let body_path = dir.join(format!("round_{:03}_enrichment_analysistemp.csv", round.round));

    let result = write_body(&body_path, round, schema, precision).and_then(|()| {
        let body = std::fs::read_to_string(&body_path)
            .map_err(|e| EnrichError::write_failure(&body_path, e))?;
        let mut content = metadata_block(round);
        content.push_str(&body);
        atomic_write(&dest, content.as_bytes())
    });

    if body_path.exists() {
        if let Err(e) = std::fs::remove_file(&body_path) {
            warn!("⚠️  Failed to remove temporary file {}: {}", body_path.display(), e);
            if result.is_ok() {
                return Err(EnrichError::write_failure(&body_path, e));
            }
        }
    }
    result?;

    info!(
        "✅ Round {} written to {} ({} sequences)",
        round.round,
        dest.display(),
        round.rows.len()
    );
    Ok(dest)
}

fn write_body(path: &Path, round: &EnrichedRound, schema: RunSchema, precision: usize) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(column_names(schema))?;
    for row in &round.rows {
        writer.write_record(row_cells(row, schema, precision))?;
    }
    writer.flush().map_err(|e| EnrichError::write_failure(path, e))?;
    Ok(())
}

/// A round result file read back as text cells
#[derive(Debug, Clone)]
pub struct RoundTable {
    pub path: PathBuf,
    /// Metadata block as `(label, value)` pairs
    pub metadata: Vec<(String, u64)>,
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
    columns: HashMap<String, usize>,
}

impl RoundTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Cell of `record` under column `name`
    pub fn cell<'a>(&self, record: &'a StringRecord, name: &str) -> Option<&'a str> {
        self.column(name).and_then(|idx| record.get(idx))
    }
}

/// Read a file written by [`write_round_file`]
pub fn read_round_table(path: &Path) -> Result<RoundTable> {
    let content = std::fs::read_to_string(path)?;
    let mut parts = content.splitn(PREAMBLE_LINES + 1, '\n');

    let mut metadata = Vec::with_capacity(METADATA_LINES);
    for line_num in 1..=METADATA_LINES {
        let line = parts.next().unwrap_or("").trim_end_matches('\r');
        let malformed = |reason: String| EnrichError::MalformedHeader {
            path: path.to_path_buf(),
            line: line_num,
            reason,
        };
        let (label, value) = line
            .rsplit_once(',')
            .ok_or_else(|| malformed(format!("'{}' is not of the form '<label>,<value>'", line)))?;
        let value = value
            .trim()
            .parse::<u64>()
            .map_err(|_| malformed(format!("'{}' is not an integer", value.trim())))?;
        metadata.push((label.to_string(), value));
    }

    // blank separator
    parts.next();
    let body = parts.next().unwrap_or("");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();
    let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.to_string(), idx))
        .collect();

    Ok(RoundTable {
        path: path.to_path_buf(),
        metadata,
        headers,
        records,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enrichment::EnrichmentCalculator;
    use crate::core::merge::tests::table;
    use crate::core::merge::RoundMerger;

    fn enriched_round(with_neg: bool) -> EnrichedRound {
        let post = table(Role::Post, 1, 10_000, &[("ACGT", 100), ("TTTT", 300)]);
        let pre = table(Role::Pre, 1, 10_000, &[("ACGT", 50), ("TTTT", 40)]);
        let neg = table(Role::Negative, 1, 5_000, &[("TTTT", 20)]);
        let mut merged = RoundMerger::merge(&post, Some(&pre), with_neg.then_some(&neg));
        for (i, row) in merged.rows.iter_mut().enumerate() {
            row.unique_sequence_name = format!("nt_{}", i + 2);
        }
        EnrichmentCalculator::enrich(merged)
    }

    #[test]
    fn test_column_order() {
        let columns = column_names(RunSchema {
            has_pre: true,
            has_negative: false,
        });
        assert_eq!(columns.len(), 2 + 12 + 3);
        assert_eq!(columns[2], "Count_pre");
        assert_eq!(columns[7], "Freq_Upper_pre");
        assert_eq!(columns[8], "Count_post");
        assert_eq!(columns[14], "Enr_post");
        assert_eq!(columns[16], "Enr_post_upper");

        let with_neg = column_names(RunSchema {
            has_pre: true,
            has_negative: true,
        });
        assert_eq!(with_neg.len(), 2 + 18 + 9);
        assert_eq!(with_neg[14], "Count_neg");
        assert_eq!(with_neg.last().map(String::as_str), Some("Enr_ratio_upper"));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let schema = RunSchema {
            has_pre: true,
            has_negative: true,
        };
        let round = enriched_round(true);
        let path = write_round_file(dir.path(), &round, schema, 6).unwrap();
        assert_eq!(path.file_name().unwrap(), "round_001_enrichment_analysis.csv");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Number of Unique Sequences (Input),2");
        assert_eq!(lines[1], "Total Number of Molecules (Input),10000");
        assert_eq!(lines[3], "Total Number of Molecules (Post),10000");
        assert_eq!(lines[5], "Total Number of Molecules (Neg Control),5000");
        assert_eq!(lines[6], "");
        assert!(lines[7].starts_with("Unique_Sequence_Name,Sequence,Count_pre"));

        let read = read_round_table(&path).unwrap();
        assert_eq!(read.metadata.len(), 6);
        assert_eq!(read.records.len(), 2);

        let first = &read.records[0];
        assert_eq!(read.cell(first, "Unique_Sequence_Name"), Some("nt_2"));
        assert_eq!(read.cell(first, "Sequence"), Some("TTTT"));
        assert_eq!(read.cell(first, "Count_post"), Some("300"));
        assert_eq!(read.cell(first, "Freq_post"), Some("3.000000%"));
        assert_eq!(read.cell(first, "Count_neg"), Some("20"));

        let second = &read.records[1];
        assert_eq!(read.cell(second, "Sequence"), Some("ACGT"));
        // missing negative: zero counts, empty ratios
        assert_eq!(read.cell(second, "Count_neg"), Some("0"));
        assert_eq!(read.cell(second, "Enr_neg"), Some(""));
        assert_eq!(read.cell(second, "Enr_ratio_lower"), Some(""));
        assert_eq!(read.cell(second, "Enr_post"), Some("2.000000"));
    }

    #[test]
    fn test_no_negative_columns_without_negative_data() {
        let dir = tempfile::tempdir().unwrap();
        let schema = RunSchema {
            has_pre: true,
            has_negative: false,
        };
        let path = write_round_file(dir.path(), &enriched_round(false), schema, 2).unwrap();
        let read = read_round_table(&path).unwrap();
        assert!(!read.has_column("Count_neg"));
        assert!(!read.has_column("Enr_ratio"));
        assert_eq!(read.metadata[5].1, 0);
        assert_eq!(read.cell(&read.records[1], "Freq_pre"), Some("0.50%"));
    }

    #[test]
    fn test_no_temporary_files_left() {
        let dir = tempfile::tempdir().unwrap();
        let schema = RunSchema::default();
        write_round_file(dir.path(), &enriched_round(false), schema, 6).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["round_001_enrichment_analysis.csv".to_string()]);
    }

    #[test]
    fn test_reject_malformed_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(round_file_name(1));
        std::fs::write(&path, "not metadata\n").unwrap();
        assert!(matches!(
            read_round_table(&path),
            Err(EnrichError::MalformedHeader { line: 1, .. })
        ));
    }
}
