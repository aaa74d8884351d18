//! Item lifecycle manager.
//!
//! Owns one item's transitions: activation with the server-fixed
//! deadline, the single accepted submission, and deferred expiry via a
//! cancellable timer task. A late submission is still scored, since
//! work the candidate already performed is never dropped, but the item
//! is flagged Expired instead of Submitted.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    Assessment, AssessmentItem, AssessmentStatus, ItemStatus, TrialInput,
};
use crate::domain::ports::{AssessmentRepository, Clock, ItemRepository};
use crate::services::locks::AssessmentLocks;
use crate::services::orchestrator::AssessmentOrchestrator;
use crate::services::timers::DeadlineTimers;
use crate::services::trial_scorer::TrialScorer;

/// Result of a submission (or of replaying one against a terminal item).
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub item: AssessmentItem,
    /// False when this call was an idempotent replay of an earlier
    /// submission and the stored result was returned unchanged.
    pub newly_scored: bool,
}

pub struct ItemLifecycle {
    assessments: Arc<dyn AssessmentRepository>,
    items: Arc<dyn ItemRepository>,
    scorer: TrialScorer,
    clock: Arc<dyn Clock>,
    locks: Arc<AssessmentLocks>,
    timers: Arc<DeadlineTimers>,
    orchestrator: Arc<AssessmentOrchestrator>,
}

impl ItemLifecycle {
    pub fn new(
        assessments: Arc<dyn AssessmentRepository>,
        items: Arc<dyn ItemRepository>,
        scorer: TrialScorer,
        clock: Arc<dyn Clock>,
        locks: Arc<AssessmentLocks>,
        timers: Arc<DeadlineTimers>,
        orchestrator: Arc<AssessmentOrchestrator>,
    ) -> Self {
        Self {
            assessments,
            items,
            scorer,
            clock,
            locks,
            timers,
            orchestrator,
        }
    }

    /// Start the current item, fixing its server deadline and arming
    /// the expiry timer.
    #[instrument(skip(self), err)]
    pub async fn start_item(
        self: &Arc<Self>,
        item_id: Uuid,
        requester_id: Uuid,
    ) -> EngineResult<AssessmentItem> {
        let assessment_id = self.assessment_id_of(item_id).await?;
        let _guard = self.locks.acquire(assessment_id).await;

        let item = self.require_item(item_id).await?;
        let assessment = self.require_assessment(item.assessment_id).await?;
        Self::require_owner(&assessment, requester_id)?;

        if assessment.status != AssessmentStatus::InProgress {
            return Err(EngineError::InvalidState {
                entity: "assessment",
                action: "start item",
                status: assessment.status.as_str().to_string(),
            });
        }
        match item.status {
            ItemStatus::Pending => {}
            _ => return Err(EngineError::AlreadyStarted { id: item_id }),
        }

        // Only the first non-terminal item (by order) may start; this
        // also rejects a start while another item is still active.
        let siblings = self.items.list_for_assessment(assessment.id).await?;
        let current = siblings.iter().find(|i| !i.is_terminal());
        if current.map(|i| i.id) != Some(item_id) {
            return Err(EngineError::NotCurrentItem { id: item_id });
        }

        let mut item = item;
        let now = self.clock.now();
        item.activate(now);
        let deadline = item
            .server_deadline_at
            .expect("activate always sets the deadline");

        if !self.items.activate(item_id, now, deadline).await? {
            return Err(EngineError::AlreadyStarted { id: item_id });
        }

        self.arm_deadline_timer(&item).await;
        info!(%item_id, %deadline, "item started");
        Ok(item)
    }

    /// Accept one submission for an active item.
    ///
    /// Trials are persisted and scored regardless of lateness; a late
    /// submission terminates as Expired. Repeat submits against a
    /// terminal item are idempotent no-ops returning the stored result.
    #[instrument(skip(self, trials), fields(%item_id, trials = trials.len()), err)]
    pub async fn submit_item(
        &self,
        item_id: Uuid,
        requester_id: Uuid,
        trials: Vec<TrialInput>,
    ) -> EngineResult<SubmitOutcome> {
        let assessment_id = self.assessment_id_of(item_id).await?;
        let guard = self.locks.acquire(assessment_id).await;

        let item = self.require_item(item_id).await?;
        let assessment = self.require_assessment(item.assessment_id).await?;
        Self::require_owner(&assessment, requester_id)?;

        if item.is_terminal() {
            // Double-submit from a network retry: hand back the result
            // computed the first time, never re-score.
            return Ok(SubmitOutcome {
                item,
                newly_scored: false,
            });
        }
        if item.status != ItemStatus::Active {
            return Err(EngineError::InvalidState {
                entity: "item",
                action: "submit",
                status: item.status.as_str().to_string(),
            });
        }

        let now = self.clock.now();
        for input in trials {
            let trial = input.into_trial(now);
            self.items.upsert_trial(item_id, &trial).await?;
        }

        let late = item.is_past_deadline(now);
        let status = if late {
            warn!(%item_id, "submission after deadline, flagging expired");
            ItemStatus::Expired
        } else {
            ItemStatus::Submitted
        };

        let outcome = self.score_and_finish(item, status).await?;
        self.timers.cancel(item_id).await;
        let finished = self
            .orchestrator
            .complete_if_finished_locked(assessment_id)
            .await?;
        drop(guard);
        if finished {
            self.locks.release(assessment_id).await;
        }
        Ok(outcome)
    }

    /// Re-arm deadline enforcement after a process restart.
    ///
    /// Timers live only in process memory, so items left Active by a
    /// previous process would otherwise block their assessment forever.
    /// Past-due items are expired on the spot; the rest get a fresh
    /// timer for their original deadline. Returns the re-armed count.
    #[instrument(skip(self), err)]
    pub async fn recover_deadlines(self: &Arc<Self>) -> EngineResult<usize> {
        let active = self.items.list_active().await?;
        let now = self.clock.now();

        let mut rearmed = 0;
        for item in active {
            if item.is_past_deadline(now) {
                self.expire_item(item.id).await;
            } else {
                self.arm_deadline_timer(&item).await;
                rearmed += 1;
            }
        }
        if rearmed > 0 {
            info!(rearmed, "deadline timers re-armed");
        }
        Ok(rearmed)
    }

    /// Record a single trial streamed through the telemetry endpoint.
    #[instrument(skip(self, trial), err)]
    pub async fn record_trial(
        &self,
        item_id: Uuid,
        requester_id: Uuid,
        trial: TrialInput,
    ) -> EngineResult<()> {
        let assessment_id = self.assessment_id_of(item_id).await?;
        let _guard = self.locks.acquire(assessment_id).await;

        let item = self.require_item(item_id).await?;
        let assessment = self.require_assessment(item.assessment_id).await?;
        Self::require_owner(&assessment, requester_id)?;

        if item.status != ItemStatus::Active {
            return Err(EngineError::InvalidState {
                entity: "item",
                action: "record trial",
                status: item.status.as_str().to_string(),
            });
        }

        let stamped = trial.into_trial(self.clock.now());
        self.items.upsert_trial(item_id, &stamped).await
    }

    /// Deadline expiry without a submission: score whatever trials were
    /// streamed (possibly none) and move on, guaranteeing forward
    /// progress even if the candidate disconnected.
    #[instrument(skip(self))]
    pub async fn expire_item(&self, item_id: Uuid) {
        let result = self.expire_item_inner(item_id).await;
        if let Err(err) = result {
            warn!(%item_id, %err, "deadline expiry failed");
        }
        self.timers.forget(item_id).await;
    }

    async fn expire_item_inner(&self, item_id: Uuid) -> EngineResult<()> {
        let assessment_id = self.assessment_id_of(item_id).await?;
        let guard = self.locks.acquire(assessment_id).await;

        let item = self.require_item(item_id).await?;
        if item.status != ItemStatus::Active {
            // A submission won the race; nothing to do.
            return Ok(());
        }

        info!(%item_id, "item deadline expired without submission");
        self.score_and_finish(item, ItemStatus::Expired).await?;
        let finished = self
            .orchestrator
            .complete_if_finished_locked(assessment_id)
            .await?;
        drop(guard);
        if finished {
            self.locks.release(assessment_id).await;
        }
        Ok(())
    }

    /// Score the item's stored trials and apply the terminal status.
    async fn score_and_finish(
        &self,
        mut item: AssessmentItem,
        status: ItemStatus,
    ) -> EngineResult<SubmitOutcome> {
        let stored = self.items.list_trials(item.id).await?;
        let score = self.scorer.score(&item.game_code, &stored).await;
        let item_score = score.item_score();

        if !self
            .items
            .finish(item.id, status, item_score, &score.trait_scores)
            .await?
        {
            // Lost a CAS race against a concurrent terminal transition;
            // return what is now stored.
            let current = self.require_item(item.id).await?;
            return Ok(SubmitOutcome {
                item: current,
                newly_scored: false,
            });
        }

        item.status = status;
        item.score = Some(item_score);
        item.trait_scores = score.trait_scores;
        Ok(SubmitOutcome {
            item,
            newly_scored: true,
        })
    }

    /// Spawn the one-shot deadline task for an active item.
    async fn arm_deadline_timer(self: &Arc<Self>, item: &AssessmentItem) {
        let Some(deadline) = item.server_deadline_at else {
            return;
        };
        let wait = (deadline - self.clock.now())
            .to_std()
            .unwrap_or_default();
        let lifecycle = Arc::clone(self);
        let item_id = item.id;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            lifecycle.expire_item(item_id).await;
        });
        self.timers.register(item_id, handle).await;
    }

    async fn assessment_id_of(&self, item_id: Uuid) -> EngineResult<Uuid> {
        Ok(self.require_item(item_id).await?.assessment_id)
    }

    async fn require_item(&self, item_id: Uuid) -> EngineResult<AssessmentItem> {
        self.items
            .get(item_id)
            .await?
            .ok_or(EngineError::ItemNotFound(item_id))
    }

    async fn require_assessment(&self, assessment_id: Uuid) -> EngineResult<Assessment> {
        self.assessments
            .get(assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))
    }

    fn require_owner(assessment: &Assessment, requester_id: Uuid) -> EngineResult<()> {
        if assessment.candidate_id == requester_id {
            Ok(())
        } else {
            Err(EngineError::Forbidden(requester_id))
        }
    }
}
