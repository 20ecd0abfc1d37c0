// merge.rs - Join pre/post/negative tables of one round into one row per sequence

use std::collections::HashMap;

use crate::data::{CountHeader, CountRecord, CountTable, Role};

/// Count and frequency ranges of one sequence in one source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMeasures {
    pub count: u64,
    pub count_lower: u64,
    pub count_upper: u64,
    pub freq: f64,
    pub freq_lower: f64,
    pub freq_upper: f64,
}

impl From<&CountRecord> for SourceMeasures {
    fn from(record: &CountRecord) -> Self {
        Self {
            count: record.count,
            count_lower: record.count_lower,
            count_upper: record.count_upper,
            freq: record.frequency,
            freq_lower: record.freq_lower,
            freq_upper: record.freq_upper,
        }
    }
}

/// One sequence of one round.
///
/// Post-selection measures are mandatory. `None` for pre or negative is the
/// missing-value sentinel: the source is absent or did not observe the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    /// Empty until a name assigner stamps the row
    pub unique_sequence_name: String,
    pub sequence: String,
    pub pre: Option<SourceMeasures>,
    pub post: SourceMeasures,
    pub neg: Option<SourceMeasures>,
}

impl MergedRow {
    pub fn measures(&self, role: Role) -> Option<&SourceMeasures> {
        match role {
            Role::Pre => self.pre.as_ref(),
            Role::Post => Some(&self.post),
            Role::Negative => self.neg.as_ref(),
        }
    }
}

/// Header totals of each source that took part in a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundTotals {
    pub pre: Option<CountHeader>,
    pub post: CountHeader,
    pub neg: Option<CountHeader>,
}

impl RoundTotals {
    pub fn for_role(&self, role: Role) -> Option<CountHeader> {
        match role {
            Role::Pre => self.pre,
            Role::Post => Some(self.post),
            Role::Negative => self.neg,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergedRound {
    pub round: u32,
    pub rows: Vec<MergedRow>,
    pub totals: RoundTotals,
}

/// Left-outer join anchored on the post-selection table
pub struct RoundMerger;

impl RoundMerger {
    /// Merge the tables of one round.
    ///
    /// Every post-selection sequence yields exactly one row (duplicate lines in the
    /// post file are kept as-is); sequences seen only in pre or negative are dropped.
    /// Rows are sorted by post count, descending, ties kept in input order.
    pub fn merge(post: &CountTable, pre: Option<&CountTable>, neg: Option<&CountTable>) -> MergedRound {
        let pre_index = pre.map(index_by_sequence);
        let neg_index = neg.map(index_by_sequence);

        let lookup = |index: &Option<HashMap<&str, &CountRecord>>, sequence: &str| {
            index
                .as_ref()
                .and_then(|idx| idx.get(sequence))
                .map(|record| SourceMeasures::from(*record))
        };

        let mut rows: Vec<MergedRow> = post
            .records
            .iter()
            .map(|record| MergedRow {
                unique_sequence_name: String::new(),
                sequence: record.sequence.clone(),
                pre: lookup(&pre_index, &record.sequence),
                post: SourceMeasures::from(record),
                neg: lookup(&neg_index, &record.sequence),
            })
            .collect();

        // sort_by is stable
        rows.sort_by(|a, b| b.post.count.cmp(&a.post.count));

        MergedRound {
            round: post.round,
            rows,
            totals: RoundTotals {
                pre: pre.map(|t| t.header),
                post: post.header,
                neg: neg.map(|t| t.header),
            },
        }
    }
}

/// First occurrence wins when a sequence is listed twice
fn index_by_sequence(table: &CountTable) -> HashMap<&str, &CountRecord> {
    let mut index = HashMap::with_capacity(table.records.len());
    for record in &table.records {
        index.entry(record.sequence.as_str()).or_insert(record);
    }
    index
}
