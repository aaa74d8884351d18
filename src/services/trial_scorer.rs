//! Trial scorer.
//!
//! Pure conversion of one item's raw trial list into accuracy, mean
//! response time, and per-trait scores. Trait formulas consume
//! `(trials, accuracy, average_response_time_ms)` and return [0, 1].
//! The trait→weight mapping is an injected capability looked up by
//! `game_code`; when the lookup fails, scoring degrades to a single
//! synthetic accuracy trait so an item always ends with a score.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::domain::models::{GameScore, TraitScore, Trial};
use crate::domain::ports::TraitWeights;

/// Trait name used when the weight lookup is unavailable.
const FALLBACK_TRAIT: &str = "accuracy";

/// Scores one game's trials against its declared traits.
pub struct TrialScorer {
    weights: Arc<dyn TraitWeights>,
}

impl TrialScorer {
    pub fn new(weights: Arc<dyn TraitWeights>) -> Self {
        Self { weights }
    }

    /// Score a trial list for the given game.
    ///
    /// Never fails: a weight-lookup error degrades to raw accuracy.
    #[instrument(skip(self, trials), fields(game_code, trials = trials.len()))]
    pub async fn score(&self, game_code: &str, trials: &[Trial]) -> GameScore {
        let weights = match self.weights.weights_for(game_code).await {
            Ok(weights) => weights,
            Err(err) => {
                warn!(%game_code, %err, "trait weight lookup failed, degrading to accuracy");
                vec![(FALLBACK_TRAIT.to_string(), 1.0)]
            }
        };
        score_with_weights(trials, &weights)
    }
}

/// Pure scoring core, independently testable.
pub fn score_with_weights(trials: &[Trial], weights: &[(String, f64)]) -> GameScore {
    let accuracy = accuracy_fraction(trials);
    let average_response_time_ms = mean_response_time(trials);

    let trait_scores = weights
        .iter()
        .map(|(trait_name, weight)| {
            let raw = trait_formula(trait_name, trials, accuracy, average_response_time_ms);
            TraitScore::new(trait_name.clone(), raw, *weight)
        })
        .collect();

    GameScore {
        accuracy: accuracy * 100.0,
        average_response_time_ms,
        trait_scores,
    }
}

/// `correct / max(1, n)`; an empty trial set scores zero, not NaN.
fn accuracy_fraction(trials: &[Trial]) -> f64 {
    let correct = trials.iter().filter(|t| t.correct).count();
    correct as f64 / (trials.len().max(1)) as f64
}

/// Mean response time over trials that recorded a response. Trials with
/// no response are excluded, not treated as zero.
fn mean_response_time(trials: &[Trial]) -> Option<f64> {
    let times: Vec<f64> = trials
        .iter()
        .filter_map(|t| t.response_time_ms.map(f64::from))
        .collect();
    if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<f64>() / times.len() as f64)
    }
}

/// Population variance of recorded response times.
fn response_time_variance(trials: &[Trial]) -> f64 {
    let times: Vec<f64> = trials
        .iter()
        .filter_map(|t| t.response_time_ms.map(f64::from))
        .collect();
    if times.is_empty() {
        return 0.0;
    }
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / times.len() as f64
}

/// Accuracy over one half of the trial sequence.
fn half_accuracy(trials: &[Trial], first: bool) -> f64 {
    let mid = trials.len() / 2;
    let half = if first { &trials[..mid] } else { &trials[mid..] };
    accuracy_fraction(half)
}

/// Trait-specific formula; unknown traits fall back to raw accuracy.
fn trait_formula(trait_name: &str, trials: &[Trial], accuracy: f64, avg_rt: Option<f64>) -> f64 {
    let avg_rt = avg_rt.unwrap_or(0.0);
    match trait_name {
        "memory" => {
            let consistency_bonus = (1.0 - response_time_variance(trials) / 10_000.0).max(0.0);
            0.7 * accuracy + 0.3 * consistency_bonus
        }
        "attention" => {
            let speed_score = (1.0 - avg_rt / 2000.0).max(0.0);
            0.6 * accuracy + 0.4 * speed_score
        }
        "logic" => {
            let volume_bonus = if trials.len() > 10 { 0.1 } else { 0.0 };
            0.9 * accuracy + volume_bonus
        }
        "processing_speed" => (1.0 - avg_rt / 1500.0).max(0.0),
        "executive_function" => {
            let drift = (half_accuracy(trials, true) - half_accuracy(trials, false)).abs();
            0.7 * accuracy + 0.3 * (1.0 - drift)
        }
        _ => accuracy,
    }
}
