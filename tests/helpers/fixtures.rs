use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use proctor::adapters::sqlite::{
    SqliteAssessmentRepository, SqliteItemRepository, SqlitePackageLookup, SqliteTraitWeights,
};
use proctor::domain::models::Assessment;
use proctor::domain::ports::{
    AssessmentRepository, Clock, CompletionNotifier, ItemRepository, ManualClock, NullNotifier,
};
use proctor::services::{
    AssessmentLocks, AssessmentOrchestrator, DeadlineTimers, IntegrityMonitor, ItemLifecycle,
    TrialScorer,
};

/// Fully wired engine over a test database and a manual clock.
pub struct TestEngine {
    pub clock: Arc<ManualClock>,
    pub assessments: Arc<dyn AssessmentRepository>,
    pub items: Arc<dyn ItemRepository>,
    pub orchestrator: Arc<AssessmentOrchestrator>,
    pub lifecycle: Arc<ItemLifecycle>,
    pub monitor: Arc<IntegrityMonitor>,
}

pub fn build_engine(pool: &SqlitePool, start: DateTime<Utc>) -> TestEngine {
    build_engine_with_notifier(pool, start, Arc::new(NullNotifier))
}

pub fn build_engine_with_notifier(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    notifier: Arc<dyn CompletionNotifier>,
) -> TestEngine {
    let clock = Arc::new(ManualClock::new(start));
    let assessments: Arc<dyn AssessmentRepository> =
        Arc::new(SqliteAssessmentRepository::new(pool.clone()));
    let items: Arc<dyn ItemRepository> = Arc::new(SqliteItemRepository::new(pool.clone()));
    let packages = Arc::new(SqlitePackageLookup::new(pool.clone()));
    let weights = Arc::new(SqliteTraitWeights::new(pool.clone()));

    let clock_port: Arc<dyn Clock> = clock.clone();
    let locks = Arc::new(AssessmentLocks::new());
    let timers = Arc::new(DeadlineTimers::new());

    let orchestrator = Arc::new(AssessmentOrchestrator::new(
        assessments.clone(),
        items.clone(),
        packages,
        notifier,
        clock_port.clone(),
        locks.clone(),
        timers.clone(),
    ));
    let lifecycle = Arc::new(ItemLifecycle::new(
        assessments.clone(),
        items.clone(),
        TrialScorer::new(weights),
        clock_port.clone(),
        locks.clone(),
        timers,
        orchestrator.clone(),
    ));
    let monitor = Arc::new(IntegrityMonitor::new(assessments.clone(), clock_port, locks));

    TestEngine {
        clock,
        assessments,
        items,
        orchestrator,
        lifecycle,
        monitor,
    }
}

/// Seed a job role with an ordered game package.
///
/// `games` is `(game_code, timer_seconds)` in package order.
pub async fn seed_role(pool: &SqlitePool, games: &[(&str, u32)]) -> Uuid {
    let job_role_id = Uuid::new_v4();
    for (order_index, (game_code, timer_seconds)) in games.iter().enumerate() {
        sqlx::query(
            "INSERT INTO job_role_games (job_role_id, order_index, game_code, timer_seconds, config)
             VALUES (?, ?, ?, ?, '{}')",
        )
        .bind(job_role_id.to_string())
        .bind(order_index as i64)
        .bind(*game_code)
        .bind(i64::from(*timer_seconds))
        .execute(pool)
        .await
        .expect("failed to seed job role games");
    }
    job_role_id
}

/// Seed the trait/weight table for one game.
pub async fn seed_weights(pool: &SqlitePool, game_code: &str, weights: &[(&str, f64)]) {
    for (trait_name, weight) in weights {
        sqlx::query(
            "INSERT INTO game_trait_weights (game_code, trait_name, weight) VALUES (?, ?, ?)",
        )
        .bind(game_code)
        .bind(*trait_name)
        .bind(*weight)
        .execute(pool)
        .await
        .expect("failed to seed trait weights");
    }
}

/// Insert a fresh assessment assignment and return it.
pub async fn seed_assessment(
    engine: &TestEngine,
    candidate_id: Uuid,
    job_role_id: Uuid,
) -> Assessment {
    let assessment = Assessment::new(candidate_id, job_role_id);
    engine
        .assessments
        .insert(&assessment)
        .await
        .expect("failed to insert assessment");
    assessment
}
