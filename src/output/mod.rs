// mod.rs - Output writers and shared cell formatting

pub mod pivot;
pub mod round;

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use crate::error::{EnrichError, Result};

pub use pivot::{pivot_file_name, write_pivots, MetricFamily};
pub use round::{read_round_table, round_file_name, write_round_file, RoundTable, ROUND_FILE_SUFFIX};

/// Ensure parent directory exists before creating file
pub(crate) fn ensure_parent_dir(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|e| EnrichError::write_failure(parent, e))?;
        }
    }
    Ok(())
}

/// `<path>.tmp` next to the destination, so the final rename stays on one filesystem
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to a temporary sibling, then rename it over `path`.
/// Readers see either the old file or the complete new one.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;
    let tmp_path = temp_sibling(path);
    if let Err(e) = std::fs::write(&tmp_path, bytes) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(EnrichError::write_failure(&tmp_path, e));
    }
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        EnrichError::write_failure(path, e)
    })
}

/// Integer count cell; missing is written as 0
pub fn format_count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_string()
}

/// Fraction rendered as a percentage string; missing is written as 0
pub fn format_percent(fraction: Option<f64>, precision: usize) -> String {
    format!("{:.*}%", precision, fraction.unwrap_or(0.0) * 100.0)
}

/// Ratio cell; null stays empty
pub fn format_ratio(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => String::new(),
    }
}

/// Numeric value of a written cell: `"12.5%"` → 12.5, `""` → None
pub fn parse_cell(cell: &str) -> Option<f64> {
    let trimmed = cell.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_formatting() {
        assert_eq!(format_count(Some(42)), "42");
        assert_eq!(format_count(None), "0");
        assert_eq!(format_percent(Some(0.0125), 6), "1.250000%");
        assert_eq!(format_percent(None, 2), "0.00%");
        assert_eq!(format_ratio(Some(2.0), 3), "2.000");
        assert_eq!(format_ratio(None, 3), "");
        assert_eq!(format_ratio(Some(1.0 / 3.0), 0), "0");
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("1.250000%"), Some(1.25));
        assert_eq!(parse_cell(" 2.5 "), Some(2.5));
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("n/a"), None);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!temp_sibling(&path).exists());

        atomic_write(&path, b"[1]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1]");
    }
}
