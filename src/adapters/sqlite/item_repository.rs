//! SQLite implementation of the ItemRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{AssessmentItem, ItemStatus, TraitScore, Trial};
use crate::domain::ports::ItemRepository;

use super::{parse_datetime, parse_optional_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteItemRepository {
    pool: SqlitePool,
}

impl SqliteItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn insert_many(&self, items: &[AssessmentItem]) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            let trait_scores_json = serde_json::to_string(&item.trait_scores)?;
            let config_json = serde_json::to_string(&item.config)?;

            sqlx::query(
                r#"INSERT INTO assessment_items (id, assessment_id, game_code, order_index,
                   timer_seconds, status, server_started_at, server_deadline_at,
                   score, trait_scores, config)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(item.id.to_string())
            .bind(item.assessment_id.to_string())
            .bind(&item.game_code)
            .bind(i64::from(item.order_index))
            .bind(i64::from(item.timer_seconds))
            .bind(item.status.as_str())
            .bind(item.server_started_at.map(|t| t.to_rfc3339()))
            .bind(item.server_deadline_at.map(|t| t.to_rfc3339()))
            .bind(item.score)
            .bind(&trait_scores_json)
            .bind(&config_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<AssessmentItem>> {
        let row: Option<ItemRow> =
            sqlx::query_as("SELECT * FROM assessment_items WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_assessment(
        &self,
        assessment_id: Uuid,
    ) -> EngineResult<Vec<AssessmentItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT * FROM assessment_items WHERE assessment_id = ? ORDER BY order_index",
        )
        .bind(assessment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_active(&self) -> EngineResult<Vec<AssessmentItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT * FROM assessment_items WHERE status = 'active' ORDER BY server_deadline_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn activate(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
        deadline_at: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let result = sqlx::query(
            r#"UPDATE assessment_items
               SET status = 'active', server_started_at = ?, server_deadline_at = ?
               WHERE id = ? AND status = 'pending'"#,
        )
        .bind(started_at.to_rfc3339())
        .bind(deadline_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn finish(
        &self,
        id: Uuid,
        status: ItemStatus,
        score: f64,
        trait_scores: &[TraitScore],
    ) -> EngineResult<bool> {
        let trait_scores_json = serde_json::to_string(trait_scores)?;

        let result = sqlx::query(
            r#"UPDATE assessment_items
               SET status = ?, score = ?, trait_scores = ?
               WHERE id = ? AND status = 'active'"#,
        )
        .bind(status.as_str())
        .bind(score)
        .bind(&trait_scores_json)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire_open_items(&self, assessment_id: Uuid) -> EngineResult<u64> {
        let result = sqlx::query(
            r#"UPDATE assessment_items
               SET status = 'expired'
               WHERE assessment_id = ? AND status IN ('pending', 'active')"#,
        )
        .bind(assessment_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_trial(&self, item_id: Uuid, trial: &Trial) -> EngineResult<()> {
        let stimulus_json = trial
            .stimulus
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let response_json = trial
            .response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO trials (item_id, trial_index, stimulus, response,
               response_time_ms, correct, client_timestamp, server_timestamp)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (item_id, trial_index) DO UPDATE SET
                   stimulus = excluded.stimulus,
                   response = excluded.response,
                   response_time_ms = excluded.response_time_ms,
                   correct = excluded.correct,
                   client_timestamp = excluded.client_timestamp,
                   server_timestamp = excluded.server_timestamp"#,
        )
        .bind(item_id.to_string())
        .bind(i64::from(trial.trial_index))
        .bind(stimulus_json)
        .bind(response_json)
        .bind(trial.response_time_ms.map(i64::from))
        .bind(i64::from(trial.correct))
        .bind(trial.client_timestamp.map(|t| t.to_rfc3339()))
        .bind(trial.server_timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_trials(&self, item_id: Uuid) -> EngineResult<Vec<Trial>> {
        let rows: Vec<TrialRow> = sqlx::query_as(
            "SELECT * FROM trials WHERE item_id = ? ORDER BY trial_index",
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    assessment_id: String,
    game_code: String,
    order_index: i64,
    timer_seconds: i64,
    status: String,
    server_started_at: Option<String>,
    server_deadline_at: Option<String>,
    score: Option<f64>,
    trait_scores: String,
    config: String,
}

impl TryFrom<ItemRow> for AssessmentItem {
    type Error = EngineError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let status = ItemStatus::from_str(&row.status)
            .ok_or_else(|| EngineError::Serialization(format!("Invalid status: {}", row.status)))?;

        let trait_scores: Vec<TraitScore> = serde_json::from_str(&row.trait_scores)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        let config: serde_json::Value = serde_json::from_str(&row.config)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;

        Ok(AssessmentItem {
            id: parse_uuid(&row.id)?,
            assessment_id: parse_uuid(&row.assessment_id)?,
            game_code: row.game_code,
            order_index: row.order_index as u32,
            timer_seconds: row.timer_seconds as u32,
            status,
            server_started_at: parse_optional_datetime(row.server_started_at)?,
            server_deadline_at: parse_optional_datetime(row.server_deadline_at)?,
            score: row.score,
            trait_scores,
            config,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TrialRow {
    #[allow(dead_code)]
    item_id: String,
    trial_index: i64,
    stimulus: Option<String>,
    response: Option<String>,
    response_time_ms: Option<i64>,
    correct: i64,
    client_timestamp: Option<String>,
    server_timestamp: String,
}

impl TryFrom<TrialRow> for Trial {
    type Error = EngineError;

    fn try_from(row: TrialRow) -> Result<Self, Self::Error> {
        let stimulus = row
            .stimulus
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        let response = row
            .response
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| EngineError::Serialization(e.to_string()))?;

        Ok(Trial {
            trial_index: row.trial_index as u32,
            stimulus,
            response,
            response_time_ms: row.response_time_ms.map(|v| v as u32),
            correct: row.correct != 0,
            client_timestamp: parse_optional_datetime(row.client_timestamp)?,
            server_timestamp: parse_datetime(&row.server_timestamp)?,
        })
    }
}
