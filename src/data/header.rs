// header.rs - Count file header parsing

use crate::error::{EnrichError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of `<label>=<value>` lines at the top of every count file
pub const HEADER_LINES: usize = 2;

/// Totals carried in the header block of a count file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountHeader {
    pub unique_sequences: u64,
    pub total_molecules: u64,
}

/// Read the header block of a count file without touching its body
pub fn read_header(path: &Path) -> Result<CountHeader> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EnrichError::CountFileNotFound(path.to_path_buf()),
        _ => EnrichError::Io(e),
    })?;

    let lines = BufReader::new(file)
        .lines()
        .take(HEADER_LINES)
        .collect::<std::io::Result<Vec<String>>>()?;

    parse_header_lines(path, &lines)
}

/// Parse the header from already-read lines (first two lines of the file)
pub(crate) fn parse_header_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<CountHeader> {
    if lines.len() < HEADER_LINES {
        return Err(EnrichError::MalformedHeader {
            path: path.to_path_buf(),
            line: lines.len() + 1,
            reason: format!("expected {} header lines, found {}", HEADER_LINES, lines.len()),
        });
    }

    Ok(CountHeader {
        unique_sequences: parse_header_value(path, 1, lines[0].as_ref())?,
        total_molecules: parse_header_value(path, 2, lines[1].as_ref())?,
    })
}

/// Extract the integer from a `<label>=<value>` or `<label>,<value>` line
fn parse_header_value(path: &Path, line_num: usize, line: &str) -> Result<u64> {
    let malformed = |reason: String| EnrichError::MalformedHeader {
        path: path.to_path_buf(),
        line: line_num,
        reason,
    };

    let trimmed = line.trim();
    let (_, value) = trimmed
        .rsplit_once('=')
        .or_else(|| trimmed.rsplit_once(','))
        .ok_or_else(|| {
            malformed(format!(
                "'{}' is not of the form '<label>=<value>' or '<label>,<value>'",
                trimmed
            ))
        })?;

    value
        .trim()
        .parse::<u64>()
        .map_err(|_| malformed(format!("'{}' is not an integer", value.trim())))
}
