//! Trait aggregator.
//!
//! Combines the trait scores of an assessment's items into
//! session-level trait scores and one overall score. Aggregation is an
//! unweighted mean per trait across the items that reported it; whether
//! items should instead be weighted by duration or trial count is an
//! open calibration question, so the simple mean stands.

use std::collections::BTreeMap;

use crate::domain::models::AssessmentItem;

/// Session-level aggregation result.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateScore {
    /// Overall score on a 0-100 scale
    pub overall_score: f64,
    /// Per-trait mean of weighted scores across reporting items
    pub trait_scores: BTreeMap<String, f64>,
}

/// Aggregate terminal items into an overall score.
///
/// `authoritative_score` (externally supplied, e.g. a manual override)
/// takes precedence over the computed mean; the two are never combined.
pub fn aggregate(items: &[AssessmentItem], authoritative_score: Option<f64>) -> AggregateScore {
    let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for item in items {
        for ts in &item.trait_scores {
            let entry = sums.entry(ts.trait_name.clone()).or_insert((0.0, 0));
            entry.0 += ts.weighted_score;
            entry.1 += 1;
        }
    }
    let trait_scores = sums
        .into_iter()
        .map(|(name, (sum, count))| (name, sum / f64::from(count)))
        .collect();

    let overall_score = authoritative_score.unwrap_or_else(|| {
        let scored: Vec<f64> = items.iter().filter_map(|i| i.score).collect();
        if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<f64>() / scored.len() as f64
        }
    });

    AggregateScore {
        overall_score,
        trait_scores,
    }
}
