//! SQLite implementation of the AssessmentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    Assessment, AssessmentStatus, IntegrityEvent, IntegrityEventKind, IntegritySummary,
};
use crate::domain::ports::AssessmentRepository;

use super::{parse_datetime, parse_optional_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteAssessmentRepository {
    pool: SqlitePool,
}

impl SqliteAssessmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssessmentRepository for SqliteAssessmentRepository {
    async fn insert(&self, assessment: &Assessment) -> EngineResult<()> {
        sqlx::query(
            r#"INSERT INTO assessments (id, candidate_id, job_role_id, status,
               started_at, completed_at, total_score,
               tab_switches, focus_loss, visibility_changes, fullscreen_exits,
               suspicious_activity, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(assessment.id.to_string())
        .bind(assessment.candidate_id.to_string())
        .bind(assessment.job_role_id.to_string())
        .bind(assessment.status.as_str())
        .bind(assessment.started_at.map(|t| t.to_rfc3339()))
        .bind(assessment.completed_at.map(|t| t.to_rfc3339()))
        .bind(assessment.total_score)
        .bind(i64::from(assessment.integrity.tab_switches))
        .bind(i64::from(assessment.integrity.focus_loss))
        .bind(i64::from(assessment.integrity.visibility_changes))
        .bind(i64::from(assessment.integrity.fullscreen_exits))
        .bind(i64::from(assessment.integrity.suspicious_activity))
        .bind(assessment.created_at.to_rfc3339())
        .bind(assessment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<Assessment>> {
        let row: Option<AssessmentRow> =
            sqlx::query_as("SELECT * FROM assessments WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn begin(&self, id: Uuid, started_at: DateTime<Utc>) -> EngineResult<bool> {
        let result = sqlx::query(
            r#"UPDATE assessments
               SET status = 'in_progress', started_at = ?, updated_at = ?
               WHERE id = ? AND status = 'not_started'"#,
        )
        .bind(started_at.to_rfc3339())
        .bind(started_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: AssessmentStatus,
        total_score: Option<f64>,
        completed_at: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let result = sqlx::query(
            r#"UPDATE assessments
               SET status = ?, total_score = ?, completed_at = ?, updated_at = ?
               WHERE id = ? AND status = 'in_progress'"#,
        )
        .bind(status.as_str())
        .bind(total_score)
        .bind(completed_at.to_rfc3339())
        .bind(completed_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn cancel(&self, id: Uuid, cancelled_at: DateTime<Utc>) -> EngineResult<bool> {
        let result = sqlx::query(
            r#"UPDATE assessments
               SET status = 'cancelled', completed_at = ?, updated_at = ?
               WHERE id = ? AND status IN ('not_started', 'in_progress')"#,
        )
        .bind(cancelled_at.to_rfc3339())
        .bind(cancelled_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_integrity(&self, id: Uuid, summary: &IntegritySummary) -> EngineResult<()> {
        let result = sqlx::query(
            r#"UPDATE assessments
               SET tab_switches = ?, focus_loss = ?, visibility_changes = ?,
                   fullscreen_exits = ?, suspicious_activity = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(i64::from(summary.tab_switches))
        .bind(i64::from(summary.focus_loss))
        .bind(i64::from(summary.visibility_changes))
        .bind(i64::from(summary.fullscreen_exits))
        .bind(i64::from(summary.suspicious_activity))
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::AssessmentNotFound(id));
        }

        Ok(())
    }

    async fn append_integrity_event(
        &self,
        assessment_id: Uuid,
        event: &IntegrityEvent,
    ) -> EngineResult<()> {
        let details_json = if event.details.is_null() {
            None
        } else {
            Some(serde_json::to_string(&event.details)?)
        };

        sqlx::query(
            r#"INSERT INTO integrity_events (assessment_id, kind, visible, fullscreen,
               client_timestamp, server_timestamp, details)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(assessment_id.to_string())
        .bind(event.kind.as_str())
        .bind(event.visible.map(i64::from))
        .bind(event.fullscreen.map(i64::from))
        .bind(event.client_timestamp.map(|t| t.to_rfc3339()))
        .bind(event.server_timestamp.to_rfc3339())
        .bind(details_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_integrity_events(
        &self,
        assessment_id: Uuid,
    ) -> EngineResult<Vec<IntegrityEvent>> {
        let rows: Vec<IntegrityEventRow> = sqlx::query_as(
            "SELECT * FROM integrity_events WHERE assessment_id = ? ORDER BY seq",
        )
        .bind(assessment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AssessmentRow {
    id: String,
    candidate_id: String,
    job_role_id: String,
    status: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    total_score: Option<f64>,
    tab_switches: i64,
    focus_loss: i64,
    visibility_changes: i64,
    fullscreen_exits: i64,
    suspicious_activity: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AssessmentRow> for Assessment {
    type Error = EngineError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        let id = parse_uuid(&row.id)?;
        let candidate_id = parse_uuid(&row.candidate_id)?;
        let job_role_id = parse_uuid(&row.job_role_id)?;

        let status = AssessmentStatus::from_str(&row.status)
            .ok_or_else(|| EngineError::Serialization(format!("Invalid status: {}", row.status)))?;

        let integrity = IntegritySummary {
            tab_switches: row.tab_switches as u32,
            focus_loss: row.focus_loss as u32,
            visibility_changes: row.visibility_changes as u32,
            fullscreen_exits: row.fullscreen_exits as u32,
            suspicious_activity: row.suspicious_activity != 0,
        };

        Ok(Assessment {
            id,
            candidate_id,
            job_role_id,
            status,
            started_at: parse_optional_datetime(row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
            total_score: row.total_score,
            integrity,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IntegrityEventRow {
    #[allow(dead_code)]
    seq: i64,
    #[allow(dead_code)]
    assessment_id: String,
    kind: String,
    visible: Option<i64>,
    fullscreen: Option<i64>,
    client_timestamp: Option<String>,
    server_timestamp: String,
    details: Option<String>,
}

impl TryFrom<IntegrityEventRow> for IntegrityEvent {
    type Error = EngineError;

    fn try_from(row: IntegrityEventRow) -> Result<Self, Self::Error> {
        let kind = IntegrityEventKind::from_str(&row.kind)
            .ok_or_else(|| EngineError::Serialization(format!("Invalid event kind: {}", row.kind)))?;

        let details = row
            .details
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| EngineError::Serialization(e.to_string()))?
            .unwrap_or(serde_json::Value::Null);

        Ok(IntegrityEvent {
            kind,
            visible: row.visible.map(|v| v != 0),
            fullscreen: row.fullscreen.map(|v| v != 0),
            client_timestamp: parse_optional_datetime(row.client_timestamp)?,
            server_timestamp: parse_datetime(&row.server_timestamp)?,
            details,
        })
    }
}
