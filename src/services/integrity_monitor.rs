//! Integrity monitor.
//!
//! Ingests focus/visibility/fullscreen events from the client, keeps
//! the running counters on the assessment, and derives the suspicion
//! flag. Annotation only: this component never blocks or rejects the
//! assessment; enforcement is left to a human reviewer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{IntegrityEvent, IntegritySummary};
use crate::domain::ports::{AssessmentRepository, Clock};
use crate::services::locks::AssessmentLocks;

/// Read-only integrity report for an assessment.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub assessment_id: Uuid,
    pub summary: IntegritySummary,
    /// Event counts per kind, over the full log
    pub event_counts: BTreeMap<String, u64>,
    pub total_events: u64,
}

pub struct IntegrityMonitor {
    repo: Arc<dyn AssessmentRepository>,
    clock: Arc<dyn Clock>,
    locks: Arc<AssessmentLocks>,
}

impl IntegrityMonitor {
    pub fn new(
        repo: Arc<dyn AssessmentRepository>,
        clock: Arc<dyn Clock>,
        locks: Arc<AssessmentLocks>,
    ) -> Self {
        Self { repo, clock, locks }
    }

    /// Record one integrity event and update the assessment's counters.
    ///
    /// Events against a terminal assessment are dropped silently: the
    /// counters freeze when the assessment terminates.
    #[instrument(skip(self, event), fields(%assessment_id, kind = event.kind.as_str()))]
    pub async fn record_event(
        &self,
        assessment_id: Uuid,
        mut event: IntegrityEvent,
    ) -> EngineResult<IntegritySummary> {
        let _guard = self.locks.acquire(assessment_id).await;

        let mut assessment = self
            .repo
            .get(assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        if assessment.is_terminal() {
            debug!("ignoring integrity event for terminal assessment");
            return Ok(assessment.integrity);
        }

        // Server receipt time is authoritative; the client timestamp is
        // kept only for diagnostic ordering.
        event.server_timestamp = self.clock.now();

        self.repo
            .append_integrity_event(assessment_id, &event)
            .await?;

        assessment.integrity.apply(&event);
        self.repo
            .update_integrity(assessment_id, &assessment.integrity)
            .await?;

        Ok(assessment.integrity)
    }

    /// Derive the admin-facing integrity report from the event log.
    pub async fn report(&self, assessment_id: Uuid) -> EngineResult<IntegrityReport> {
        let assessment = self
            .repo
            .get(assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        let events = self.repo.list_integrity_events(assessment_id).await?;
        let mut event_counts: BTreeMap<String, u64> = BTreeMap::new();
        for event in &events {
            *event_counts.entry(event.kind.as_str().to_string()).or_insert(0) += 1;
        }

        Ok(IntegrityReport {
            assessment_id,
            summary: assessment.integrity,
            total_events: events.len() as u64,
            event_counts,
        })
    }
}
