//! Assessment item domain model.
//!
//! One game instance within an assessment, ordered by `order_index`.
//! The server-computed deadline is the only timing authority: the
//! deadline is derived once at start and never recomputed from
//! client-reported data.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::trial::TraitScore;

/// Status of one item within an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Materialized, waiting for its turn
    Pending,
    /// Timer running; exactly one item per assessment may be active
    Active,
    /// Submitted before the deadline and scored
    Submitted,
    /// Deadline passed; scored from whatever trials were recorded
    Expired,
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Submitted => "submitted",
            Self::Expired => "expired",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "submitted" => Some(Self::Submitted),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Check if this is a terminal state. Terminal items are read-only.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted | Self::Expired)
    }

    pub fn valid_transitions(&self) -> Vec<ItemStatus> {
        match self {
            Self::Pending => vec![Self::Active, Self::Expired],
            Self::Active => vec![Self::Submitted, Self::Expired],
            Self::Submitted | Self::Expired => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// One game occurrence within an assessment, with its own timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentItem {
    /// Unique identifier
    pub id: Uuid,
    /// Owning assessment
    pub assessment_id: Uuid,
    /// Game this item instantiates
    pub game_code: String,
    /// Position in the assessment sequence
    pub order_index: u32,
    /// Server-enforced time budget
    pub timer_seconds: u32,
    /// Current status
    pub status: ItemStatus,
    /// Server clock at activation
    pub server_started_at: Option<DateTime<Utc>>,
    /// `server_started_at + timer_seconds`, computed once
    pub server_deadline_at: Option<DateTime<Utc>>,
    /// Item score on a 0-100 scale, set when the item terminates
    pub score: Option<f64>,
    /// Trait scores computed from this item's trials
    pub trait_scores: Vec<TraitScore>,
    /// Per-item game configuration snapshot
    pub config: serde_json::Value,
}

impl AssessmentItem {
    /// Materialize an item from a game-package entry.
    pub fn new(
        assessment_id: Uuid,
        game_code: impl Into<String>,
        order_index: u32,
        timer_seconds: u32,
        config: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            assessment_id,
            game_code: game_code.into(),
            order_index,
            timer_seconds,
            status: ItemStatus::default(),
            server_started_at: None,
            server_deadline_at: None,
            score: None,
            trait_scores: Vec::new(),
            config,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Activate the item at the given server time, fixing the deadline.
    ///
    /// The deadline is derived here and only here.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.status = ItemStatus::Active;
        self.server_started_at = Some(now);
        self.server_deadline_at = Some(now + Duration::seconds(i64::from(self.timer_seconds)));
    }

    /// Whether the given server time is past this item's deadline.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.server_deadline_at.is_some_and(|d| now > d)
    }
}
