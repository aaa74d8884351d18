use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::EngineResult;
use crate::domain::models::{AssessmentItem, ItemStatus, TraitScore, Trial};

/// Repository port for assessment items and their trial sub-collection.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert the materialized item set for an assessment.
    async fn insert_many(&self, items: &[AssessmentItem]) -> EngineResult<()>;

    /// Get an item by ID.
    async fn get(&self, id: Uuid) -> EngineResult<Option<AssessmentItem>>;

    /// List an assessment's items ordered by `order_index`.
    async fn list_for_assessment(&self, assessment_id: Uuid)
        -> EngineResult<Vec<AssessmentItem>>;

    /// List every Active item across all assessments. Feeds deadline
    /// recovery after a process restart.
    async fn list_active(&self) -> EngineResult<Vec<AssessmentItem>>;

    /// CAS `Pending -> Active`, recording the server start and deadline.
    async fn activate(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
        deadline_at: DateTime<Utc>,
    ) -> EngineResult<bool>;

    /// CAS `Active -> status` (Submitted or Expired), recording the
    /// computed score and trait scores.
    async fn finish(
        &self,
        id: Uuid,
        status: ItemStatus,
        score: f64,
        trait_scores: &[TraitScore],
    ) -> EngineResult<bool>;

    /// Force all non-terminal items of an assessment to Expired.
    /// Used by administrative cancel. Returns the number of items moved.
    async fn expire_open_items(&self, assessment_id: Uuid) -> EngineResult<u64>;

    /// Upsert one trial keyed by `(item_id, trial_index)`.
    async fn upsert_trial(&self, item_id: Uuid, trial: &Trial) -> EngineResult<()>;

    /// List an item's trials ordered by `trial_index`.
    async fn list_trials(&self, item_id: Uuid) -> EngineResult<Vec<Trial>>;
}
