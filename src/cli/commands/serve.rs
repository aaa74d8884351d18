//! HTTP server command: the composition root.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::adapters::http::{AssessmentsHttpConfig, AssessmentsHttpServer};
use crate::adapters::notify::WebhookNotifier;
use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteAssessmentRepository, SqliteItemRepository,
    SqlitePackageLookup, SqliteTraitWeights,
};
use crate::domain::models::config::Config;
use crate::domain::ports::{
    AssessmentRepository, Clock, CompletionNotifier, ItemRepository, NullNotifier, SystemClock,
};
use crate::services::{
    AssessmentLocks, AssessmentOrchestrator, DeadlineTimers, IntegrityMonitor, ItemLifecycle,
    TrialScorer,
};

pub async fn execute(config: &Config, port: Option<u16>) -> Result<()> {
    let database_url = format!("sqlite:{}", config.database.path);
    let pool_config = PoolConfig {
        max_connections: config.database.max_connections,
        ..PoolConfig::default()
    };
    let pool = initialize_database(&database_url, Some(pool_config)).await?;
    info!(path = %config.database.path, "database ready");

    let assessments: Arc<dyn AssessmentRepository> =
        Arc::new(SqliteAssessmentRepository::new(pool.clone()));
    let items: Arc<dyn ItemRepository> = Arc::new(SqliteItemRepository::new(pool.clone()));
    let packages = Arc::new(SqlitePackageLookup::new(pool.clone()));
    let weights = Arc::new(SqliteTraitWeights::new(pool.clone()));

    let notifier: Arc<dyn CompletionNotifier> = match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.notify.max_retry_secs),
        )),
        None => Arc::new(NullNotifier),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let locks = Arc::new(AssessmentLocks::new());
    let timers = Arc::new(DeadlineTimers::new());

    let orchestrator = Arc::new(AssessmentOrchestrator::new(
        assessments.clone(),
        items.clone(),
        packages,
        notifier,
        clock.clone(),
        locks.clone(),
        timers.clone(),
    ));
    let lifecycle = Arc::new(ItemLifecycle::new(
        assessments.clone(),
        items.clone(),
        TrialScorer::new(weights),
        clock.clone(),
        locks.clone(),
        timers,
        orchestrator.clone(),
    ));
    let monitor = Arc::new(IntegrityMonitor::new(assessments.clone(), clock, locks));

    // Items left Active by a previous process must not stall their
    // assessments.
    lifecycle.recover_deadlines().await?;

    let http_config = AssessmentsHttpConfig {
        host: config.http.host.clone(),
        port: port.unwrap_or(config.http.port),
        enable_cors: config.http.enable_cors,
    };

    let server = AssessmentsHttpServer::new(
        orchestrator,
        lifecycle,
        monitor,
        assessments,
        items,
        http_config,
    );

    server
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
