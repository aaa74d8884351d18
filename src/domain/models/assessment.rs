//! Assessment domain model.
//!
//! An assessment is one candidate's single attempt at one job role's
//! game package. It owns the session-level state machine; item-level
//! state lives in [`super::item::AssessmentItem`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::integrity::IntegritySummary;

/// Status of an assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Assigned but the candidate has not begun
    NotStarted,
    /// Candidate is working through items
    InProgress,
    /// All items terminal, total score computed
    Completed,
    /// The final item timed out with no recovery
    Expired,
    /// Administratively cancelled
    Cancelled,
}

impl Default for AssessmentStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "expired" => Some(Self::Expired),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Check if this is a terminal state. Terminal assessments are immutable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired | Self::Cancelled)
    }

    /// Valid transitions from this status. All transitions are one-way.
    pub fn valid_transitions(&self) -> Vec<AssessmentStatus> {
        match self {
            Self::NotStarted => vec![Self::InProgress, Self::Cancelled],
            Self::InProgress => vec![Self::Completed, Self::Expired, Self::Cancelled],
            Self::Completed | Self::Expired | Self::Cancelled => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// One candidate's attempt at a job role's full game package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier
    pub id: Uuid,
    /// Owning candidate; only this subject may start/submit
    pub candidate_id: Uuid,
    /// Job role whose game package this assessment runs
    pub job_role_id: Uuid,
    /// Current status
    pub status: AssessmentStatus,
    /// When the candidate started (server time)
    pub started_at: Option<DateTime<Utc>>,
    /// When the assessment reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Overall score on a 0-100 scale, set at finalization
    pub total_score: Option<f64>,
    /// Running integrity counters and suspicion flag
    pub integrity: IntegritySummary,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last updated
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    /// Create a new assessment assignment for a candidate and job role.
    pub fn new(candidate_id: Uuid, job_role_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            job_role_id,
            status: AssessmentStatus::default(),
            started_at: None,
            completed_at: None,
            total_score: None,
            integrity: IntegritySummary::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn can_transition_to(&self, new_status: AssessmentStatus) -> bool {
        self.status.can_transition_to(new_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assessment_defaults() {
        let candidate = Uuid::new_v4();
        let role = Uuid::new_v4();
        let a = Assessment::new(candidate, role);
        assert_eq!(a.status, AssessmentStatus::NotStarted);
        assert!(a.started_at.is_none());
        assert!(a.total_score.is_none());
        assert!(!a.integrity.suspicious_activity);
    }

    #[test]
    fn test_status_transitions_are_one_way() {
        assert!(AssessmentStatus::NotStarted.can_transition_to(AssessmentStatus::InProgress));
        assert!(AssessmentStatus::InProgress.can_transition_to(AssessmentStatus::Completed));
        assert!(AssessmentStatus::InProgress.can_transition_to(AssessmentStatus::Expired));
        assert!(!AssessmentStatus::Completed.can_transition_to(AssessmentStatus::InProgress));
        assert!(!AssessmentStatus::Cancelled.can_transition_to(AssessmentStatus::InProgress));
        assert!(!AssessmentStatus::NotStarted.can_transition_to(AssessmentStatus::Completed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(AssessmentStatus::Completed.is_terminal());
        assert!(AssessmentStatus::Expired.is_terminal());
        assert!(AssessmentStatus::Cancelled.is_terminal());
        assert!(!AssessmentStatus::NotStarted.is_terminal());
        assert!(!AssessmentStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for s in [
            AssessmentStatus::NotStarted,
            AssessmentStatus::InProgress,
            AssessmentStatus::Completed,
            AssessmentStatus::Expired,
            AssessmentStatus::Cancelled,
        ] {
            assert_eq!(AssessmentStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(AssessmentStatus::from_str("canceled"), Some(AssessmentStatus::Cancelled));
        assert_eq!(AssessmentStatus::from_str("bogus"), None);
    }
}
