// enrichment.rs - Enrichment ratios with interval-arithmetic bounds

use rayon::prelude::*;

use crate::core::merge::{MergedRound, MergedRow, RoundTotals};

/// Division that never fails.
///
/// `None` if either operand is `None`, `default` when the denominator is zero,
/// the quotient otherwise. Pass `Some(0.0)` for the conventional zero default.
pub fn safe_divide(numerator: Option<f64>, denominator: Option<f64>, default: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(_), Some(d)) if d == 0.0 => default,
        (Some(n), Some(d)) => Some(n / d),
        _ => None,
    }
}

/// Divide, resolving a zero denominator to null
fn divide(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    safe_divide(numerator, denominator, None)
}

fn positive(value: Option<f64>) -> bool {
    value.map_or(false, |v| v > 0.0)
}

/// Enrichment metrics of one merged row; `None` means not enough evidence
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnrichmentResult {
    pub enr_post: Option<f64>,
    pub enr_post_lower: Option<f64>,
    pub enr_post_upper: Option<f64>,
    pub enr_neg: Option<f64>,
    pub enr_neg_lower: Option<f64>,
    pub enr_neg_upper: Option<f64>,
    pub enr_ratio: Option<f64>,
    pub enr_ratio_lower: Option<f64>,
    pub enr_ratio_upper: Option<f64>,
}

/// Range of an enrichment ratio, from frequency ranges rather than point estimates
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min: Option<f64>,
    max: Option<f64>,
}

impl Bounds {
    const UNINFORMATIVE: Bounds = Bounds {
        min: Some(0.0),
        max: Some(0.0),
    };
}

pub struct EnrichmentCalculator;

impl EnrichmentCalculator {
    /// Compute the metrics of one row.
    ///
    /// Bounds are only informative when the pre-selection frequency has a positive
    /// lower bound; otherwise both ranges collapse to `[0, 0]` and every point
    /// estimate is null. A point estimate is reported only when its upper bound is
    /// positive, and its bounds only alongside it.
    pub fn compute(row: &MergedRow) -> EnrichmentResult {
        let pre = row.pre.as_ref();
        let post = &row.post;
        let neg = row.neg.as_ref();

        let (post_bounds, neg_bounds) = match pre {
            Some(pre) if pre.freq_lower > 0.0 => {
                let post_bounds = Bounds {
                    min: divide(Some(post.freq_lower), Some(pre.freq_upper)),
                    max: divide(Some(post.freq_upper), Some(pre.freq_lower)),
                };
                let neg_bounds = Bounds {
                    min: neg.and_then(|n| divide(Some(n.freq_lower), Some(pre.freq_upper))),
                    max: neg.and_then(|n| divide(Some(n.freq_upper), Some(pre.freq_lower))),
                };
                (post_bounds, neg_bounds)
            }
            _ => (Bounds::UNINFORMATIVE, Bounds::UNINFORMATIVE),
        };

        let pre_freq = pre.map(|p| p.freq);

        let enr_post = if positive(post_bounds.max) {
            divide(Some(post.freq), pre_freq)
        } else {
            None
        };

        let enr_neg = if positive(neg_bounds.max) {
            neg.and_then(|n| divide(Some(n.freq), pre_freq))
        } else {
            None
        };

        let (enr_ratio, ratio_lower, ratio_upper) =
            if positive(neg_bounds.max) && positive(neg_bounds.min) {
                (
                    divide(enr_post, enr_neg),
                    divide(post_bounds.min, neg_bounds.max),
                    divide(post_bounds.max, neg_bounds.min),
                )
            } else {
                (None, None, None)
            };

        let gated = |point: Option<f64>, bound: Option<f64>| point.and(bound);

        EnrichmentResult {
            enr_post,
            enr_post_lower: gated(enr_post, post_bounds.min),
            enr_post_upper: gated(enr_post, post_bounds.max),
            enr_neg,
            enr_neg_lower: gated(enr_neg, neg_bounds.min),
            enr_neg_upper: gated(enr_neg, neg_bounds.max),
            enr_ratio,
            enr_ratio_lower: gated(enr_ratio, ratio_lower),
            enr_ratio_upper: gated(enr_ratio, ratio_upper),
        }
    }

    /// Enrich every row of a merged round, preserving row order
    pub fn enrich(round: MergedRound) -> EnrichedRound {
        let rows = round
            .rows
            .into_par_iter()
            .map(|row| {
                let enrichment = Self::compute(&row);
                EnrichedRow { row, enrichment }
            })
            .collect();

        EnrichedRound {
            round: round.round,
            rows,
            totals: round.totals,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row: MergedRow,
    pub enrichment: EnrichmentResult,
}

#[derive(Debug, Clone)]
pub struct EnrichedRound {
    pub round: u32,
    pub rows: Vec<EnrichedRow>,
    pub totals: RoundTotals,
}
