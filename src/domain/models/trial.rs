//! Trial and score value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stimulus/response pair recorded during a game.
///
/// Immutable once recorded; a duplicate `trial_index` replaces the
/// earlier record (idempotent upsert) rather than appending.
/// `client_timestamp` is diagnostic only; state transitions use
/// server time exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub trial_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    /// Milliseconds from stimulus to response; None when no response
    #[serde(default)]
    pub response_time_ms: Option<u32>,
    pub correct: bool,
    #[serde(default)]
    pub client_timestamp: Option<DateTime<Utc>>,
    pub server_timestamp: DateTime<Utc>,
}

/// Client-submitted trial payload, before the server stamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialInput {
    pub trial_index: u32,
    #[serde(default)]
    pub stimulus: Option<serde_json::Value>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    #[serde(default)]
    pub response_time_ms: Option<u32>,
    pub correct: bool,
    #[serde(default)]
    pub client_timestamp: Option<DateTime<Utc>>,
}

impl TrialInput {
    /// Stamp with the server clock, producing the stored record.
    pub fn into_trial(self, server_timestamp: DateTime<Utc>) -> Trial {
        Trial {
            trial_index: self.trial_index,
            stimulus: self.stimulus,
            response: self.response,
            response_time_ms: self.response_time_ms,
            correct: self.correct,
            client_timestamp: self.client_timestamp,
            server_timestamp,
        }
    }
}

/// A scored cognitive trait for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitScore {
    pub trait_name: String,
    /// Raw trait score in [0, 1]
    pub raw_score: f64,
    pub weight: f64,
    /// `raw_score * weight`; recomputed, never hand-edited
    pub weighted_score: f64,
}

impl TraitScore {
    pub fn new(trait_name: impl Into<String>, raw_score: f64, weight: f64) -> Self {
        let raw_score = raw_score.clamp(0.0, 1.0);
        Self {
            trait_name: trait_name.into(),
            raw_score,
            weight,
            weighted_score: raw_score * weight,
        }
    }
}

/// Output of the trial scorer for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameScore {
    /// Fraction of correct trials, on a 0-100 scale
    pub accuracy: f64,
    /// Mean response time over trials that had a response
    pub average_response_time_ms: Option<f64>,
    pub trait_scores: Vec<TraitScore>,
}

impl GameScore {
    /// Collapse trait scores into the item-level score (0-100 scale).
    ///
    /// Weighted mean of trait scores when weights exist, otherwise raw
    /// accuracy.
    pub fn item_score(&self) -> f64 {
        let total_weight: f64 = self.trait_scores.iter().map(|t| t.weight).sum();
        if total_weight > 0.0 {
            let weighted: f64 = self.trait_scores.iter().map(|t| t.weighted_score).sum();
            100.0 * weighted / total_weight
        } else {
            self.accuracy
        }
    }
}
