// mod.rs - Count file and sorting table data structures

pub mod counts;
pub mod header;
pub mod sorting;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export main types for convenience
pub use counts::{CountRecord, CountTable, RawCount, RawCountTable};
pub use header::{read_header, CountHeader};
pub use sorting::{SortingEntry, SortingTable};

/// Role a count file plays within one selection round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sample taken before the selection step
    Pre,
    /// Sample taken after the selection step
    Post,
    /// Negative-control sample
    Negative,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Pre, Role::Post, Role::Negative];

    /// Column suffix used in merged and written tables
    pub fn suffix(&self) -> &'static str {
        match self {
            Role::Pre => "pre",
            Role::Post => "post",
            Role::Negative => "neg",
        }
    }

    /// Label used in the metadata block of a round result file
    pub fn header_label(&self) -> &'static str {
        match self {
            Role::Pre => "Input",
            Role::Post => "Post",
            Role::Negative => "Neg Control",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Pre => write!(f, "pre"),
            Role::Post => write!(f, "post"),
            Role::Negative => write!(f, "negative"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pre" | "in" | "input" => Ok(Role::Pre),
            "post" | "out" | "output" => Ok(Role::Post),
            "negative" | "neg" => Ok(Role::Negative),
            other => Err(format!(
                "Unknown file type '{}'. Use: pre, post, negative",
                other
            )),
        }
    }
}

/// Which optional sources exist anywhere in a run.
///
/// Decided once from the sorting table and threaded through the merger,
/// writer and aggregator so column presence is never probed per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSchema {
    pub has_pre: bool,
    pub has_negative: bool,
}
