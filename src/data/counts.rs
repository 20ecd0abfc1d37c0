// counts.rs - Count table loading with bootstrap-derived bounds

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::bootstrap::{BootstrapEngine, BootstrapInterval, BootstrapKey};
use crate::data::header::{parse_header_lines, CountHeader, HEADER_LINES};
use crate::data::Role;
use crate::error::{EnrichError, Result};

/// One sequence observed in one source of one round
#[derive(Debug, Clone, PartialEq)]
pub struct CountRecord {
    pub sequence: String,
    pub count: u64,
    pub frequency: f64,
    pub count_lower: u64,
    pub count_upper: u64,
    pub freq_lower: f64,
    pub freq_upper: f64,
    pub total_unique_sequences: u64,
    pub total_molecules: u64,
    pub round: u32,
    pub role: Role,
}

impl CountRecord {
    /// Build a record from a parsed row and its bootstrap interval.
    ///
    /// A nonzero count never reports a lower bound below 1. Reported counts are
    /// floored; frequency bounds use the unfloored percentiles.
    pub fn from_raw(
        raw: RawCount,
        interval: BootstrapInterval,
        header: CountHeader,
        round: u32,
        role: Role,
    ) -> Self {
        let upper = interval.upper.max(0.0);
        let mut lower = interval.lower.max(0.0);
        if raw.count > 0 {
            lower = lower.max(1.0);
        }

        let total = header.total_molecules;
        Self {
            sequence: raw.sequence,
            count: raw.count,
            frequency: raw.frequency,
            count_lower: lower.floor() as u64,
            count_upper: upper.floor() as u64,
            freq_lower: fraction(lower, total),
            freq_upper: fraction(upper, total),
            total_unique_sequences: header.unique_sequences,
            total_molecules: total,
            round,
            role,
        }
    }
}

fn fraction(count: f64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count / total as f64
    }
}

/// A body row before bootstrap bounds are attached
#[derive(Debug, Clone, PartialEq)]
pub struct RawCount {
    pub sequence: String,
    pub count: u64,
    /// Fraction of total molecules (not percent)
    pub frequency: f64,
}

/// Column positions of the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyLayout {
    /// `sequence count [frequency]`
    Positional,
    /// Located through a column-header line
    Named {
        sequence: usize,
        count: usize,
        frequency: Option<usize>,
    },
}

impl BodyLayout {
    fn columns(&self) -> (usize, usize, Option<usize>) {
        match *self {
            BodyLayout::Positional => (0, 1, Some(2)),
            BodyLayout::Named {
                sequence,
                count,
                frequency,
            } => (sequence, count, frequency),
        }
    }

    /// Recognize a column-header line such as `Unique_Sequence_Name,Sequence,Count,...`
    fn from_column_header(fields: &[&str]) -> Option<Self> {
        let find = |name: &str| fields.iter().position(|f| f.eq_ignore_ascii_case(name));
        let sequence = find("sequence")?;
        let count = find("count")?;
        Some(BodyLayout::Named {
            sequence,
            count,
            frequency: find("freq").or_else(|| find("frequency")),
        })
    }
}

/// Split on commas when present, otherwise on runs of whitespace
fn split_fields(line: &str) -> Vec<&str> {
    if line.contains(',') {
        line.split(',').map(|f| f.trim().trim_matches('"')).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Parsed count file prior to resampling
#[derive(Debug, Clone)]
pub struct RawCountTable {
    pub path: PathBuf,
    pub round: u32,
    pub role: Role,
    pub header: CountHeader,
    pub rows: Vec<RawCount>,
}

impl RawCountTable {
    /// Load and parse a count file
    pub fn load(path: &Path, round: u32, role: Role) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EnrichError::CountFileNotFound(path.to_path_buf()),
            _ => EnrichError::Io(e),
        })?;
        Self::parse(path, &content, round, role)
    }

    /// Parse count file content; `path` is only used for error reporting
    pub fn parse(path: &Path, content: &str, round: u32, role: Role) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();
        let header_end = HEADER_LINES.min(lines.len());
        let header = parse_header_lines(path, &lines[..header_end])?;

        let mut layout: Option<BodyLayout> = None;
        let mut rows = Vec::new();

        for (idx, line) in lines.iter().enumerate().skip(HEADER_LINES) {
            let line_num = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_fields(line);

            let active = match layout {
                Some(l) => l,
                None => {
                    // First body line decides the layout
                    let looks_numeric = fields.get(1).map_or(false, |f| f.parse::<u64>().is_ok());
                    if !looks_numeric {
                        if let Some(named) = BodyLayout::from_column_header(&fields) {
                            layout = Some(named);
                            continue;
                        }
                    }
                    layout = Some(BodyLayout::Positional);
                    BodyLayout::Positional
                }
            };

            rows.push(parse_row(path, line_num, &fields, active, header.total_molecules)?);
        }

        if rows.is_empty() {
            return Err(EnrichError::EmptyTable(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            round,
            role,
            header,
            rows,
        })
    }

    /// Distinct bootstrap keys needed by this table
    pub fn bootstrap_keys(&self) -> HashSet<BootstrapKey> {
        self.rows
            .iter()
            .map(|row| BootstrapKey::new(self.header.total_molecules, row.count))
            .collect()
    }

    /// Attach bootstrap bounds to every row.
    /// Keys already precomputed are served from the engine's cache.
    pub fn into_table(self, engine: &mut BootstrapEngine) -> CountTable {
        let header = self.header;
        let (round, role) = (self.round, self.role);
        let records: Vec<CountRecord> = self
            .rows
            .into_iter()
            .map(|row| {
                let interval = engine.interval(header.total_molecules, row.count);
                CountRecord::from_raw(row, interval, header, round, role)
            })
            .collect();

        info!(
            "📄 Round {} {}: {} sequences, {} molecules ({})",
            round,
            role,
            records.len(),
            header.total_molecules,
            self.path.display()
        );

        CountTable {
            path: self.path,
            round,
            role,
            header,
            records,
        }
    }
}

fn parse_row(
    path: &Path,
    line_num: usize,
    fields: &[&str],
    layout: BodyLayout,
    total_molecules: u64,
) -> Result<RawCount> {
    let malformed = |reason: String| EnrichError::MalformedRow {
        path: path.to_path_buf(),
        line: line_num,
        reason,
    };
    let (seq_col, count_col, freq_col) = layout.columns();

    let sequence = fields
        .get(seq_col)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing sequence column".to_string()))?;
    let count_str = fields
        .get(count_col)
        .ok_or_else(|| malformed("missing count column".to_string()))?;
    let count = count_str
        .parse::<u64>()
        .map_err(|_| malformed(format!("count '{}' is not an integer", count_str)))?;

    // Percent-formatted frequencies are taken as given; anything else is recomputed
    let frequency = match freq_col.and_then(|c| fields.get(c)) {
        Some(freq) if freq.ends_with('%') => {
            let value = freq.trim_end_matches('%').trim();
            value
                .parse::<f64>()
                .map_err(|_| malformed(format!("frequency '{}' is not a number", freq)))?
                / 100.0
        }
        _ => fraction(count as f64, total_molecules),
    };

    Ok(RawCount {
        sequence: sequence.to_string(),
        count,
        frequency,
    })
}

/// Count table for one source of one round, with bootstrap bounds
#[derive(Debug, Clone)]
pub struct CountTable {
    pub path: PathBuf,
    pub round: u32,
    pub role: Role,
    pub header: CountHeader,
    pub records: Vec<CountRecord>,
}

impl CountTable {
    /// Load a count file and derive its bounds, resampling distinct keys in parallel
    pub fn load(path: &Path, round: u32, role: Role, engine: &mut BootstrapEngine) -> Result<Self> {
        let raw = RawCountTable::load(path, round, role)?;
        engine.precompute(&raw.bootstrap_keys());
        Ok(raw.into_table(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bootstrap::BootstrapConfig;

    const WHITESPACE_FILE: &str = "number of unique sequences = 3
total number of molecules = 10000

ACGTACGT    100    1.0%
TTGCA       50     0.5%
GGGCC       7      0.07%
";

    #[test]
    fn test_parse_whitespace_body() {
        let table =
            RawCountTable::parse(Path::new("r1_counts.txt"), WHITESPACE_FILE, 1, Role::Post).unwrap();
        assert_eq!(table.header.total_molecules, 10000);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].sequence, "ACGTACGT");
        assert_eq!(table.rows[0].count, 100);
        assert!((table.rows[1].frequency - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_frequency_computed_without_percent_column() {
        let content = "unique,2\ntotal,400\nAAA,100\nCCC,300,0.75\n";
        let table = RawCountTable::parse(Path::new("r1.csv"), content, 1, Role::Pre).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!((table.rows[0].frequency - 0.25).abs() < 1e-12);
        assert!((table.rows[1].frequency - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_parse_column_headed_body() {
        let content = "number of unique sequences,2
total number of molecules,200

Unique_Sequence_Name,Sequence,Count,Count_Lower,Count_Upper,Freq,Freq_Lower,Freq_Upper
nt_2,ACGT,150,130,170,75.0%,65.0%,85.0%
nt_3,TTTT,50,38,62,25.0%,19.0%,31.0%
";
        let table = RawCountTable::parse(Path::new("r1.csv"), content, 1, Role::Post).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].sequence, "ACGT");
        assert_eq!(table.rows[1].count, 50);
        assert!((table.rows[0].frequency - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_empty_body() {
        let content = "unique=0\ntotal=0\n\n";
        let result = RawCountTable::parse(Path::new("empty.txt"), content, 1, Role::Pre);
        assert!(matches!(result, Err(EnrichError::EmptyTable(_))));
    }

    #[test]
    fn test_malformed_count() {
        let content = "unique=1\ntotal=10\nACGT lots\n";
        match RawCountTable::parse(Path::new("bad.txt"), content, 1, Role::Pre) {
            Err(EnrichError::MalformedRow { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = RawCountTable::load(Path::new("/nonexistent/r9_counts.txt"), 9, Role::Post);
        assert!(matches!(result, Err(EnrichError::CountFileNotFound(_))));
    }

    #[test]
    fn test_records_carry_bounds() {
        let raw =
            RawCountTable::parse(Path::new("r1_counts.txt"), WHITESPACE_FILE, 2, Role::Post).unwrap();
        let mut engine = BootstrapEngine::new(BootstrapConfig::default());
        engine.precompute(&raw.bootstrap_keys());
        let table = raw.into_table(&mut engine);

        for record in &table.records {
            assert!(record.count_lower >= 1);
            assert!(record.count_lower <= record.count);
            assert!(record.count_upper >= record.count);
            assert!((record.frequency - record.count as f64 / 10000.0).abs() < 1e-9);
            let lower = record.freq_lower * 10000.0;
            assert!(lower >= record.count_lower as f64 - 1e-9 && lower < (record.count_lower + 1) as f64);
            assert_eq!(record.total_unique_sequences, 3);
            assert_eq!(record.round, 2);
            assert_eq!(record.role, Role::Post);
        }
        assert_eq!(engine.resample_count(), 3);
    }

    #[test]
    fn test_lower_bound_clamped_to_one() {
        let raw = RawCount {
            sequence: "A".to_string(),
            count: 1,
            frequency: 0.001,
        };
        let header = CountHeader {
            unique_sequences: 1,
            total_molecules: 1000,
        };
        let interval = BootstrapInterval {
            lower: 0.0,
            upper: 3.0,
        };
        let record = CountRecord::from_raw(raw, interval, header, 1, Role::Pre);
        assert_eq!(record.count_lower, 1);
        assert_eq!(record.count_upper, 3);
        assert!((record.freq_lower - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_frequency_bounds_use_unfloored_percentiles() {
        let raw = RawCount {
            sequence: "ACGT".to_string(),
            count: 50,
            frequency: 0.05,
        };
        let header = CountHeader {
            unique_sequences: 1,
            total_molecules: 1000,
        };
        let interval = BootstrapInterval {
            lower: 36.5,
            upper: 64.9,
        };
        let record = CountRecord::from_raw(raw, interval, header, 1, Role::Post);
        assert_eq!(record.count_lower, 36);
        assert_eq!(record.count_upper, 64);
        assert!((record.freq_lower - 0.0365).abs() < 1e-12);
        assert!((record.freq_upper - 0.0649).abs() < 1e-12);
    }

    #[test]
    fn test_load_count_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, WHITESPACE_FILE.as_bytes()).unwrap();

        let mut engine = BootstrapEngine::new(BootstrapConfig::default());
        let table = CountTable::load(file.path(), 1, Role::Negative, &mut engine).unwrap();
        assert_eq!(table.records.len(), 3);
        assert_eq!(table.header.unique_sequences, 3);
        assert_eq!(table.role, Role::Negative);
        assert_eq!(engine.cache_len(), 3);
    }

    #[test]
    fn test_shared_counts_resampled_once() {
        let content = "unique=2\ntotal=500\nACGT 7\nTTTT 7\n";
        let raw = RawCountTable::parse(Path::new("r1.txt"), content, 1, Role::Post).unwrap();
        let mut engine = BootstrapEngine::new(BootstrapConfig::default());
        engine.precompute(&raw.bootstrap_keys());
        let table = raw.into_table(&mut engine);

        assert_eq!(engine.resample_count(), 1);
        assert_eq!(table.records[0].count_lower, table.records[1].count_lower);
        assert_eq!(table.records[0].count_upper, table.records[1].count_upper);
    }
}
