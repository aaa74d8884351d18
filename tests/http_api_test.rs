mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use proctor::adapters::http::{AssessmentsHttpConfig, AssessmentsHttpServer};

use helpers::database::{setup_test_db, teardown_test_db};
use helpers::fixtures::{build_engine, seed_assessment, seed_role, TestEngine};

fn router(engine: &TestEngine) -> Router {
    AssessmentsHttpServer::new(
        engine.orchestrator.clone(),
        engine.lifecycle.clone(),
        engine.monitor.clone(),
        engine.assessments.clone(),
        engine.items.clone(),
        AssessmentsHttpConfig::default(),
    )
    .build_router()
}

fn request(
    method: &str,
    uri: String,
    subject: Option<(Uuid, &str)>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = subject {
        builder = builder
            .header("x-subject-id", id.to_string())
            .header("x-subject-role", role);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let app = router(&engine);

    let response = app
        .oneshot(request("GET", "/health".to_string(), None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_missing_identity_headers_is_unauthorized() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    let response = app
        .oneshot(request(
            "POST",
            format!("/api/v1/assessments/{}/start", assessment.id),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_garbage_identity_headers_are_unauthorized() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let app = router(&engine);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/assessments/{}", Uuid::new_v4()))
                .header("x-subject-id", "not-a-uuid")
                .header("x-subject-role", "candidate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_start_returns_assessment_with_items() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60), ("stroop", 90)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    let response = app
        .oneshot(request(
            "POST",
            format!("/api/v1/assessments/{}/start", assessment.id),
            Some((candidate, "candidate")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["candidate_id"], candidate.to_string());
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["game_code"], "nback");
    assert_eq!(items[0]["status"], "pending");
    assert_eq!(items[1]["timer_seconds"], 90);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_start_replay_conflicts() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    let uri = format!("/api/v1/assessments/{}/start", assessment.id);
    let response = app
        .clone()
        .oneshot(request("POST", uri.clone(), Some((candidate, "candidate")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("POST", uri, Some((candidate, "candidate")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["code"], "ALREADY_STARTED");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_get_assessment_owner_or_admin_only() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    let uri = format!("/api/v1/assessments/{}", assessment.id);

    let response = app
        .clone()
        .oneshot(request("GET", uri.clone(), Some((candidate, "candidate")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stranger = Uuid::new_v4();
    let response = app
        .clone()
        .oneshot(request("GET", uri.clone(), Some((stranger, "candidate")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = Uuid::new_v4();
    let response = app
        .oneshot(request("GET", uri, Some((admin, "admin")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_unknown_assessment_is_404() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let app = router(&engine);

    let response = app
        .oneshot(request(
            "GET",
            format!("/api/v1/assessments/{}", Uuid::new_v4()),
            Some((Uuid::new_v4(), "admin")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_cancel_requires_admin() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    let uri = format!("/api/v1/assessments/{}/cancel", assessment.id);

    // Candidates cannot cancel, not even their own assessment.
    let response = app
        .clone()
        .oneshot(request("POST", uri.clone(), Some((candidate, "candidate")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = Uuid::new_v4();
    let response = app
        .oneshot(request("POST", uri, Some((admin, "admin")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "cancelled");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_integrity_report_requires_admin() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    let uri = format!("/api/v1/assessments/{}/integrity", assessment.id);

    let response = app
        .clone()
        .oneshot(request("GET", uri.clone(), Some((candidate, "candidate")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request("GET", uri, Some((Uuid::new_v4(), "admin")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["assessment_id"], assessment.id.to_string());
    assert_eq!(body["total_events"], 0);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_item_under_wrong_assessment_is_404() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let other = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();
    let items = engine
        .items
        .list_for_assessment(assessment.id)
        .await
        .unwrap();

    // Real item, but addressed under the wrong assessment.
    let response = app
        .oneshot(request(
            "POST",
            format!("/api/v1/assessments/{}/items/{}/start", other.id, items[0].id),
            Some((candidate, "candidate")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_item_start_submit_flow() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();
    let items = engine
        .items
        .list_for_assessment(assessment.id)
        .await
        .unwrap();
    let item_id = items[0].id;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            format!("/api/v1/assessments/{}/items/{}/start", assessment.id, item_id),
            Some((candidate, "candidate")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "active");
    assert!(body["server_deadline_at"].is_string());

    let submit_uri = format!(
        "/api/v1/assessments/{}/items/{}/submit",
        assessment.id, item_id
    );
    let payload = serde_json::json!({
        "trials": [
            {"trial_index": 0, "correct": true, "response_time_ms": 450},
            {"trial_index": 1, "correct": false, "response_time_ms": 900},
        ]
    });
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            submit_uri.clone(),
            Some((candidate, "candidate")),
            Some(payload.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["newly_scored"], true);
    assert_eq!(body["item"]["status"], "submitted");
    assert!(body["item"]["score"].is_number());

    // Network-retry replay returns the stored result.
    let response = app
        .oneshot(request(
            "POST",
            submit_uri,
            Some((candidate, "candidate")),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["newly_scored"], false);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_telemetry_accepts_events_and_trials() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    let app = router(&engine);

    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();
    let items = engine
        .items
        .list_for_assessment(assessment.id)
        .await
        .unwrap();
    let item_id = items[0].id;
    engine
        .lifecycle
        .start_item(item_id, candidate)
        .await
        .unwrap();

    let telemetry_uri = format!(
        "/api/v1/assessments/{}/items/{}/telemetry",
        assessment.id, item_id
    );

    // A `type` field marks an integrity event.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            telemetry_uri.clone(),
            Some((candidate, "candidate")),
            Some(serde_json::json!({"type": "visibilitychange", "visible": false})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["accepted"], true);
    assert_eq!(body["integrity"]["tab_switches"], 1);

    // No `type` field: a streamed trial.
    let response = app
        .oneshot(request(
            "POST",
            telemetry_uri,
            Some((candidate, "candidate")),
            Some(serde_json::json!({"trial_index": 0, "correct": true, "response_time_ms": 512})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["accepted"], true);
    assert!(body.get("integrity").is_none());

    let trials = engine.items.list_trials(item_id).await.unwrap();
    assert_eq!(trials.len(), 1);
    assert!(trials[0].correct);

    teardown_test_db(pool).await;
}
