use std::sync::Arc;

use crate::constraints::{ScoreFn, Validator};
use crate::error::{ChainError, Result};
use crate::optimize::SingleMetricOptimizer;
use crate::partition::Partition;
use crate::proposals::Proposal;

/// Score variants for opportunity-district optimization. Each counts the
/// parts whose minority share exceeds the threshold, plus a shaping term
/// that rewards near-misses or penalizes overshoot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GingleatorScore {
    /// Plain count of parts at or above the threshold.
    NumOpportunityDists,
    /// Count plus the share of the next-highest part below threshold.
    RewardPartialDist,
    /// Count plus a scaled bonus when the next-highest part is within
    /// ten points of the threshold.
    RewardNextHighestClose,
    /// Count plus `(1 - max share) / (1 - threshold)`, discouraging
    /// packing any single part far over the line.
    PenalizeMaximumOver,
    /// Count plus `(1 - mean share of qualifying parts) / (1 - threshold)`.
    PenalizeAvgOver,
}

/// Optimizer preset for hunting opportunity districts: maximizes one of
/// the `GingleatorScore` variants over the share
/// `minority_pop / total_pop` per part.
pub struct Gingleator;

impl Gingleator {
    /// Build the preset optimizer. Shares are computed directly from
    /// the two population columns, so no extra updaters are required.
    pub fn new<P: Proposal + Clone>(
        proposal: P,
        validator: Validator,
        initial: Partition,
        minority_pop_col: impl Into<String>,
        total_pop_col: impl Into<String>,
        threshold: f64,
        variant: GingleatorScore,
    ) -> Result<SingleMetricOptimizer<P>> {
        let score = Self::score_fn(minority_pop_col, total_pop_col, threshold, variant);
        SingleMetricOptimizer::new(proposal, validator, initial, score, true)
    }

    /// The raw score function for a variant, usable outside the
    /// optimizer (e.g. for logging a chain's trajectory).
    pub fn score_fn(
        minority_pop_col: impl Into<String>,
        total_pop_col: impl Into<String>,
        threshold: f64,
        variant: GingleatorScore,
    ) -> ScoreFn {
        let minority_col = minority_pop_col.into();
        let total_col = total_pop_col.into();
        Arc::new(move |partition: &Partition| {
            let shares = minority_shares(partition, &minority_col, &total_col)?;
            Ok(score_shares(&shares, threshold, variant))
        })
    }
}

/// Minority population share per part, in part order.
fn minority_shares(
    partition: &Partition,
    minority_col: &str,
    total_col: &str,
) -> Result<Vec<f64>> {
    let graph = partition.graph();
    let mut shares = Vec::with_capacity(partition.part_count());
    for p in partition.parts() {
        let mut minority = 0.0;
        let mut total = 0.0;
        for &v in partition.members(p) {
            minority += graph.node_float(v, minority_col)?;
            total += graph.node_float(v, total_col)?;
        }
        if total <= 0.0 {
            return Err(ChainError::UpdaterFailure {
                name: "gingleator".to_string(),
                cause: format!("part {p} has zero total population"),
            });
        }
        shares.push(minority / total);
    }
    Ok(shares)
}

fn score_shares(shares: &[f64], threshold: f64, variant: GingleatorScore) -> f64 {
    let count = shares.iter().filter(|&&s| s >= threshold).count() as f64;
    let next_highest = shares.iter()
        .filter(|&&s| s < threshold)
        .fold(f64::NEG_INFINITY, |acc, &s| acc.max(s));

    match variant {
        GingleatorScore::NumOpportunityDists => count,
        GingleatorScore::RewardPartialDist => {
            if next_highest.is_finite() { count + next_highest } else { count }
        }
        GingleatorScore::RewardNextHighestClose => {
            if !next_highest.is_finite() || next_highest < threshold - 0.1 {
                count
            } else {
                count + (next_highest - threshold + 0.1) * 10.0
            }
        }
        GingleatorScore::PenalizeMaximumOver => {
            if count == 0.0 {
                0.0
            } else {
                let max_share = shares.iter().fold(f64::NEG_INFINITY, |acc, &s| acc.max(s));
                count + (1.0 - max_share) / (1.0 - threshold)
            }
        }
        GingleatorScore::PenalizeAvgOver => {
            let qualifying = shares.iter().filter(|&&s| s >= threshold).collect::<Vec<_>>();
            if qualifying.is_empty() {
                0.0
            } else {
                let avg = qualifying.iter().copied().sum::<f64>() / qualifying.len() as f64;
                count + (1.0 - avg) / (1.0 - threshold)
            }
        }
    }
}
