//! Assessment HTTP API.
//!
//! Exposes the execution engine to candidate clients and admin tooling.
//! Identity arrives pre-authenticated from the upstream gateway as
//! `X-Subject-Id` / `X-Subject-Role` headers; this adapter only checks
//! ownership and role, never credentials.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    Assessment, AssessmentItem, IntegrityEvent, IntegritySummary, TraitScore, TrialInput,
};
use crate::domain::ports::{AssessmentRepository, ItemRepository};
use crate::services::{
    AssessmentOrchestrator, IntegrityMonitor, IntegrityReport, ItemLifecycle,
};

/// Configuration for the assessment HTTP server.
#[derive(Debug, Clone)]
pub struct AssessmentsHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable CORS.
    pub enable_cors: bool,
}

impl Default for AssessmentsHttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8300,
            enable_cors: true,
        }
    }
}

/// Authenticated subject, as asserted by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub id: Uuid,
    pub role: SubjectRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectRole {
    Candidate,
    Admin,
}

/// Request body for item submission.
#[derive(Debug, Deserialize)]
pub struct SubmitItemRequest {
    #[serde(default)]
    pub trials: Vec<TrialInput>,
}

/// Telemetry payload: either an integrity event or a single trial.
///
/// Integrity events always carry a `type` field; trial records never
/// do, which is what the untagged deserialization keys on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TelemetryPayload {
    Event(IntegrityEvent),
    Trial(TrialInput),
}

/// Response with one assessment item.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub game_code: String,
    pub order_index: u32,
    pub timer_seconds: u32,
    pub status: String,
    pub server_started_at: Option<String>,
    pub server_deadline_at: Option<String>,
    pub score: Option<f64>,
    pub trait_scores: Vec<TraitScore>,
    pub config: serde_json::Value,
}

impl From<AssessmentItem> for ItemResponse {
    fn from(item: AssessmentItem) -> Self {
        Self {
            id: item.id,
            game_code: item.game_code,
            order_index: item.order_index,
            timer_seconds: item.timer_seconds,
            status: item.status.as_str().to_string(),
            server_started_at: item.server_started_at.map(|t| t.to_rfc3339()),
            server_deadline_at: item.server_deadline_at.map(|t| t.to_rfc3339()),
            score: item.score,
            trait_scores: item.trait_scores,
            config: item.config,
        }
    }
}

/// Response with an assessment and its items.
#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_role_id: Uuid,
    pub status: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub total_score: Option<f64>,
    pub integrity: IntegritySummary,
    pub items: Vec<ItemResponse>,
}

impl AssessmentResponse {
    fn from_parts(assessment: Assessment, items: Vec<AssessmentItem>) -> Self {
        Self {
            id: assessment.id,
            candidate_id: assessment.candidate_id,
            job_role_id: assessment.job_role_id,
            status: assessment.status.as_str().to_string(),
            started_at: assessment.started_at.map(|t| t.to_rfc3339()),
            completed_at: assessment.completed_at.map(|t| t.to_rfc3339()),
            total_score: assessment.total_score,
            integrity: assessment.integrity,
            items: items.into_iter().map(ItemResponse::from).collect(),
        }
    }
}

/// Response after a submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub item: ItemResponse,
    /// False when this was an idempotent replay of an earlier submit.
    pub newly_scored: bool,
}

/// Response after a telemetry post.
#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<IntegritySummary>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: EngineError) -> ApiError {
    let (status, code) = match &err {
        EngineError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        EngineError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        EngineError::AssessmentNotFound(_) | EngineError::ItemNotFound(_) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        EngineError::AlreadyStarted { .. } => (StatusCode::CONFLICT, "ALREADY_STARTED"),
        EngineError::NotCurrentItem { .. } => (StatusCode::CONFLICT, "NOT_CURRENT_ITEM"),
        EngineError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
        EngineError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION"),
        EngineError::DependencyUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "DEPENDENCY_UNAVAILABLE")
        }
        EngineError::Database(_) | EngineError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
        }),
    )
}

fn subject_from_headers(headers: &HeaderMap) -> EngineResult<Subject> {
    let id = headers
        .get("x-subject-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(EngineError::Unauthorized)?;

    let role = match headers.get("x-subject-role").and_then(|v| v.to_str().ok()) {
        Some("candidate") => SubjectRole::Candidate,
        Some("admin") => SubjectRole::Admin,
        _ => return Err(EngineError::Unauthorized),
    };

    Ok(Subject { id, role })
}

fn require_admin(subject: Subject) -> EngineResult<()> {
    if subject.role != SubjectRole::Admin {
        return Err(EngineError::Forbidden(subject.id));
    }
    Ok(())
}

/// Shared state for the assessment HTTP server.
struct AppState {
    orchestrator: Arc<AssessmentOrchestrator>,
    lifecycle: Arc<ItemLifecycle>,
    monitor: Arc<IntegrityMonitor>,
    assessments: Arc<dyn AssessmentRepository>,
    items: Arc<dyn ItemRepository>,
}

/// Assessment HTTP server.
pub struct AssessmentsHttpServer {
    config: AssessmentsHttpConfig,
    state: Arc<AppState>,
}

impl AssessmentsHttpServer {
    pub fn new(
        orchestrator: Arc<AssessmentOrchestrator>,
        lifecycle: Arc<ItemLifecycle>,
        monitor: Arc<IntegrityMonitor>,
        assessments: Arc<dyn AssessmentRepository>,
        items: Arc<dyn ItemRepository>,
        config: AssessmentsHttpConfig,
    ) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                orchestrator,
                lifecycle,
                monitor,
                assessments,
                items,
            }),
        }
    }

    /// Build the router.
    pub fn build_router(&self) -> Router {
        let app = Router::new()
            .route("/api/v1/assessments/{id}", get(get_assessment))
            .route("/api/v1/assessments/{id}/start", post(start_assessment))
            .route("/api/v1/assessments/{id}/cancel", post(cancel_assessment))
            .route("/api/v1/assessments/{id}/integrity", get(integrity_report))
            .route(
                "/api/v1/assessments/{id}/items/{item_id}/start",
                post(start_item),
            )
            .route(
                "/api/v1/assessments/{id}/items/{item_id}/submit",
                post(submit_item),
            )
            .route(
                "/api/v1/assessments/{id}/items/{item_id}/telemetry",
                post(post_telemetry),
            )
            .route("/health", get(health_check))
            .with_state(self.state.clone());

        if self.config.enable_cors {
            app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    /// Start the server.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.build_router();

        tracing::info!("Assessment HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.build_router();

        tracing::info!("Assessment HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn start_assessment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<AssessmentResponse>), ApiError> {
    let subject = subject_from_headers(&headers).map_err(error_response)?;

    let (assessment, items) = state
        .orchestrator
        .start_assessment(id, subject.id)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::OK,
        Json(AssessmentResponse::from_parts(assessment, items)),
    ))
}

async fn get_assessment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let subject = subject_from_headers(&headers).map_err(error_response)?;

    let assessment = state
        .assessments
        .get(id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(EngineError::AssessmentNotFound(id)))?;

    if subject.role != SubjectRole::Admin && assessment.candidate_id != subject.id {
        return Err(error_response(EngineError::Forbidden(subject.id)));
    }

    let items = state
        .items
        .list_for_assessment(id)
        .await
        .map_err(error_response)?;

    Ok(Json(AssessmentResponse::from_parts(assessment, items)))
}

async fn cancel_assessment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let subject = subject_from_headers(&headers).map_err(error_response)?;
    require_admin(subject).map_err(error_response)?;

    let assessment = state
        .orchestrator
        .cancel_assessment(id)
        .await
        .map_err(error_response)?;
    let items = state
        .items
        .list_for_assessment(id)
        .await
        .map_err(error_response)?;

    Ok(Json(AssessmentResponse::from_parts(assessment, items)))
}

async fn integrity_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<IntegrityReport>, ApiError> {
    let subject = subject_from_headers(&headers).map_err(error_response)?;
    require_admin(subject).map_err(error_response)?;

    let report = state.monitor.report(id).await.map_err(error_response)?;
    Ok(Json(report))
}

async fn start_item(
    State(state): State<Arc<AppState>>,
    Path((assessment_id, item_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<ItemResponse>, ApiError> {
    let subject = subject_from_headers(&headers).map_err(error_response)?;
    require_item_in_assessment(&state, assessment_id, item_id)
        .await
        .map_err(error_response)?;

    let item = state
        .lifecycle
        .start_item(item_id, subject.id)
        .await
        .map_err(error_response)?;

    Ok(Json(ItemResponse::from(item)))
}

async fn submit_item(
    State(state): State<Arc<AppState>>,
    Path((assessment_id, item_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(req): Json<SubmitItemRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let subject = subject_from_headers(&headers).map_err(error_response)?;
    require_item_in_assessment(&state, assessment_id, item_id)
        .await
        .map_err(error_response)?;

    let outcome = state
        .lifecycle
        .submit_item(item_id, subject.id, req.trials)
        .await
        .map_err(error_response)?;

    Ok(Json(SubmitResponse {
        item: ItemResponse::from(outcome.item),
        newly_scored: outcome.newly_scored,
    }))
}

async fn post_telemetry(
    State(state): State<Arc<AppState>>,
    Path((assessment_id, item_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(payload): Json<TelemetryPayload>,
) -> Result<Json<TelemetryResponse>, ApiError> {
    let subject = subject_from_headers(&headers).map_err(error_response)?;
    require_item_in_assessment(&state, assessment_id, item_id)
        .await
        .map_err(error_response)?;

    match payload {
        TelemetryPayload::Event(event) => {
            let assessment = state
                .assessments
                .get(assessment_id)
                .await
                .map_err(error_response)?
                .ok_or_else(|| error_response(EngineError::AssessmentNotFound(assessment_id)))?;
            if assessment.candidate_id != subject.id {
                return Err(error_response(EngineError::Forbidden(subject.id)));
            }

            let summary = state
                .monitor
                .record_event(assessment_id, event)
                .await
                .map_err(error_response)?;

            Ok(Json(TelemetryResponse {
                accepted: true,
                integrity: Some(summary),
            }))
        }
        TelemetryPayload::Trial(trial) => {
            state
                .lifecycle
                .record_trial(item_id, subject.id, trial)
                .await
                .map_err(error_response)?;

            Ok(Json(TelemetryResponse {
                accepted: true,
                integrity: None,
            }))
        }
    }
}

/// Reject item operations addressed through the wrong assessment.
async fn require_item_in_assessment(
    state: &AppState,
    assessment_id: Uuid,
    item_id: Uuid,
) -> EngineResult<()> {
    let item = state
        .items
        .get(item_id)
        .await?
        .ok_or(EngineError::ItemNotFound(item_id))?;

    if item.assessment_id != assessment_id {
        return Err(EngineError::ItemNotFound(item_id));
    }
    Ok(())
}
