//! Assessment orchestrator.
//!
//! Owns the assessment-level state machine: starting a session
//! (materializing its items from the job-role package), finalizing once
//! every item is terminal, and administrative cancellation. All
//! finalization funnels through [`AssessmentOrchestrator::complete_if_finished`];
//! no other code path sets a terminal assessment status.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Assessment, AssessmentItem, AssessmentStatus, ItemStatus};
use crate::domain::ports::{
    AssessmentRepository, Clock, CompletionNotifier, ItemRepository, PackageLookup,
};
use crate::services::locks::AssessmentLocks;
use crate::services::timers::DeadlineTimers;
use crate::services::trait_aggregator;

pub struct AssessmentOrchestrator {
    assessments: Arc<dyn AssessmentRepository>,
    items: Arc<dyn ItemRepository>,
    packages: Arc<dyn PackageLookup>,
    notifier: Arc<dyn CompletionNotifier>,
    clock: Arc<dyn Clock>,
    locks: Arc<AssessmentLocks>,
    timers: Arc<DeadlineTimers>,
}

impl AssessmentOrchestrator {
    pub fn new(
        assessments: Arc<dyn AssessmentRepository>,
        items: Arc<dyn ItemRepository>,
        packages: Arc<dyn PackageLookup>,
        notifier: Arc<dyn CompletionNotifier>,
        clock: Arc<dyn Clock>,
        locks: Arc<AssessmentLocks>,
        timers: Arc<DeadlineTimers>,
    ) -> Self {
        Self {
            assessments,
            items,
            packages,
            notifier,
            clock,
            locks,
            timers,
        }
    }

    /// Start an assessment for its owning candidate.
    ///
    /// Materializes the ordered item list from the job-role package and
    /// moves the assessment to InProgress, exactly once. A retried
    /// request after a successful start fails with `AlreadyStarted`
    /// rather than re-materializing items.
    #[instrument(skip(self), err)]
    pub async fn start_assessment(
        &self,
        assessment_id: Uuid,
        requester_id: Uuid,
    ) -> EngineResult<(Assessment, Vec<AssessmentItem>)> {
        let _guard = self.locks.acquire(assessment_id).await;

        let assessment = self
            .assessments
            .get(assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        if assessment.candidate_id != requester_id {
            return Err(EngineError::Forbidden(requester_id));
        }
        match assessment.status {
            AssessmentStatus::NotStarted => {}
            AssessmentStatus::InProgress => {
                return Err(EngineError::AlreadyStarted { id: assessment_id })
            }
            status => {
                return Err(EngineError::InvalidState {
                    entity: "assessment",
                    action: "start",
                    status: status.as_str().to_string(),
                })
            }
        }

        let mut entries = self.packages.games_for_role(assessment.job_role_id).await?;
        if entries.is_empty() {
            return Err(EngineError::Validation(format!(
                "job role {} has no game package",
                assessment.job_role_id
            )));
        }
        entries.sort_by_key(|e| e.order_index);

        let now = self.clock.now();
        if !self.assessments.begin(assessment_id, now).await? {
            // Lost a cross-process race; the winner already materialized.
            return Err(EngineError::AlreadyStarted { id: assessment_id });
        }

        let items: Vec<AssessmentItem> = entries
            .into_iter()
            .map(|e| {
                AssessmentItem::new(
                    assessment_id,
                    e.game_code,
                    e.order_index,
                    e.timer_seconds,
                    e.config,
                )
            })
            .collect();
        self.items.insert_many(&items).await?;

        info!(%assessment_id, items = items.len(), "assessment started");

        let mut started = assessment;
        started.status = AssessmentStatus::InProgress;
        started.started_at = Some(now);
        Ok((started, items))
    }

    /// Finalize the assessment if every item is terminal.
    pub async fn complete_if_finished(&self, assessment_id: Uuid) -> EngineResult<()> {
        let guard = self.locks.acquire(assessment_id).await;
        let finished = self.complete_if_finished_locked(assessment_id).await?;
        drop(guard);
        if finished {
            self.locks.release(assessment_id).await;
        }
        Ok(())
    }

    /// Finalization body. Caller must hold the assessment's lock, and
    /// once that guard is dropped should call `locks.release` when this
    /// returns true (the assessment is terminal).
    #[instrument(skip(self), err)]
    pub(crate) async fn complete_if_finished_locked(
        &self,
        assessment_id: Uuid,
    ) -> EngineResult<bool> {
        let assessment = self
            .assessments
            .get(assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;
        if assessment.status != AssessmentStatus::InProgress {
            return Ok(assessment.is_terminal());
        }

        let items = self.items.list_for_assessment(assessment_id).await?;
        if items.is_empty() || items.iter().any(|i| !i.is_terminal()) {
            return Ok(false);
        }

        let aggregate = trait_aggregator::aggregate(&items, None);
        // A session where nothing was ever submitted ends Expired, not
        // Completed; partial submissions still complete normally.
        let status = if items.iter().all(|i| i.status == ItemStatus::Expired) {
            AssessmentStatus::Expired
        } else {
            AssessmentStatus::Completed
        };

        let now = self.clock.now();
        let finalized = self
            .assessments
            .finalize(assessment_id, status, Some(aggregate.overall_score), now)
            .await?;
        if !finalized {
            // Another writer already moved the assessment to a terminal
            // status.
            warn!(%assessment_id, "finalize lost a status race, skipping");
            return Ok(true);
        }

        info!(
            %assessment_id,
            status = status.as_str(),
            total_score = aggregate.overall_score,
            "assessment finalized"
        );

        if let Some(mut finished) = self.assessments.get(assessment_id).await? {
            finished.total_score = Some(aggregate.overall_score);
            let notifier = self.notifier.clone();
            tokio::spawn(async move {
                if let Err(err) = notifier.assessment_finished(&finished).await {
                    error!(assessment_id = %finished.id, %err, "completion notification failed");
                }
            });
        }

        Ok(true)
    }

    /// Administrative cancel: the assessment and any open item move
    /// directly to their terminal states, pending deadline timers are
    /// cancelled, and finalization is short-circuited.
    #[instrument(skip(self), err)]
    pub async fn cancel_assessment(&self, assessment_id: Uuid) -> EngineResult<Assessment> {
        let guard = self.locks.acquire(assessment_id).await;

        let assessment = self
            .assessments
            .get(assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;
        if assessment.is_terminal() {
            return Err(EngineError::InvalidState {
                entity: "assessment",
                action: "cancel",
                status: assessment.status.as_str().to_string(),
            });
        }

        let items = self.items.list_for_assessment(assessment_id).await?;
        for item in &items {
            if !item.is_terminal() {
                self.timers.cancel(item.id).await;
            }
        }
        self.items.expire_open_items(assessment_id).await?;

        let now = self.clock.now();
        if !self.assessments.cancel(assessment_id, now).await? {
            return Err(EngineError::InvalidState {
                entity: "assessment",
                action: "cancel",
                status: "terminal".to_string(),
            });
        }
        info!(%assessment_id, "assessment cancelled");

        drop(guard);
        self.locks.release(assessment_id).await;

        self.assessments
            .get(assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))
    }
}
