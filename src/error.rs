// error.rs - Error kinds for parsing, resampling and writing

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the enrichment engine.
///
/// A zero-molecule bootstrap input has no variant: it resolves to a
/// degenerate `[0, 0]` interval instead of an error.
#[derive(Error, Debug)]
pub enum EnrichError {
    /// A header line could not be split or its value is not an integer
    #[error("malformed header in {path} (line {line}): {reason}")]
    MalformedHeader {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A body row could not be parsed into a sequence and count
    #[error("malformed row in {path} (line {line}): {reason}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("count file not found: {0}")]
    CountFileNotFound(PathBuf),

    #[error("count table {0} has no sequence rows")]
    EmptyTable(PathBuf),

    /// No post-selection file exists for the round
    #[error("round {round} has no post-selection file")]
    MissingMandatorySource { round: u32 },

    #[error("failed writing {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sorting-table filenames do not match the files present in a counts folder
    #[error("sorting table does not match files in {dir}: {detail}")]
    InconsistentSortingTable { dir: PathBuf, detail: String },

    #[error("invalid sorting table {path}: {reason}")]
    SortingTable { path: PathBuf, reason: String },

    #[error("directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("bootstrap cache: {0}")]
    Cache(String),

    #[error("name dictionary: {0}")]
    NameDictionary(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, EnrichError>;

impl EnrichError {
    pub(crate) fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EnrichError::WriteFailure {
            path: path.into(),
            source,
        }
    }
}
