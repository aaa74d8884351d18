use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::EngineResult;
use crate::domain::models::{
    Assessment, AssessmentStatus, IntegrityEvent, IntegritySummary,
};

/// Repository port for assessment persistence.
///
/// Status-changing writes are compare-and-set on the current status so
/// that a request racing the deadline-expiry task cannot double-fire a
/// transition; they return `false` when the guard did not match.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Insert a new assessment (created by the assignment collaborator).
    async fn insert(&self, assessment: &Assessment) -> EngineResult<()>;

    /// Get an assessment by ID.
    async fn get(&self, id: Uuid) -> EngineResult<Option<Assessment>>;

    /// CAS `NotStarted -> InProgress`, recording the start time.
    async fn begin(&self, id: Uuid, started_at: DateTime<Utc>) -> EngineResult<bool>;

    /// CAS `InProgress -> status` (Completed or Expired), recording the
    /// total score and completion time.
    async fn finalize(
        &self,
        id: Uuid,
        status: AssessmentStatus,
        total_score: Option<f64>,
        completed_at: DateTime<Utc>,
    ) -> EngineResult<bool>;

    /// CAS any non-terminal status -> Cancelled.
    async fn cancel(&self, id: Uuid, cancelled_at: DateTime<Utc>) -> EngineResult<bool>;

    /// Persist the running integrity counters.
    async fn update_integrity(&self, id: Uuid, summary: &IntegritySummary) -> EngineResult<()>;

    /// Append one event to the append-only integrity log.
    async fn append_integrity_event(
        &self,
        assessment_id: Uuid,
        event: &IntegrityEvent,
    ) -> EngineResult<()>;

    /// List the integrity event log in arrival order.
    async fn list_integrity_events(
        &self,
        assessment_id: Uuid,
    ) -> EngineResult<Vec<IntegrityEvent>>;
}
