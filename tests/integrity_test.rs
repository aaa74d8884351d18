mod helpers;

use chrono::Utc;
use uuid::Uuid;

use proctor::domain::errors::EngineError;
use proctor::domain::models::{IntegrityEvent, IntegrityEventKind};

use helpers::database::{setup_test_db, teardown_test_db};
use helpers::fixtures::{build_engine, seed_assessment, seed_role};

fn event(kind: IntegrityEventKind) -> IntegrityEvent {
    IntegrityEvent {
        kind,
        visible: None,
        fullscreen: None,
        client_timestamp: None,
        server_timestamp: Utc::now(),
        details: serde_json::Value::Null,
    }
}

fn hidden() -> IntegrityEvent {
    let mut ev = event(IntegrityEventKind::VisibilityChange);
    ev.visible = Some(false);
    ev
}

#[tokio::test]
async fn test_fourth_tab_switch_flips_suspicion() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();

    for i in 1..=3 {
        let summary = engine
            .monitor
            .record_event(assessment.id, hidden())
            .await
            .unwrap();
        assert_eq!(summary.tab_switches, i);
        assert!(!summary.suspicious_activity);
    }

    let summary = engine
        .monitor
        .record_event(assessment.id, hidden())
        .await
        .unwrap();
    assert_eq!(summary.tab_switches, 4);
    assert_eq!(summary.visibility_changes, 4);
    assert!(summary.suspicious_activity);

    // Persisted, not just returned.
    let stored = engine.assessments.get(assessment.id).await.unwrap().unwrap();
    assert!(stored.integrity.suspicious_activity);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_fifth_blur_flips_suspicion() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();

    for _ in 0..4 {
        let summary = engine
            .monitor
            .record_event(assessment.id, event(IntegrityEventKind::Blur))
            .await
            .unwrap();
        assert!(!summary.suspicious_activity);
    }
    let summary = engine
        .monitor
        .record_event(assessment.id, event(IntegrityEventKind::Blur))
        .await
        .unwrap();
    assert_eq!(summary.focus_loss, 5);
    assert!(summary.suspicious_activity);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_blur_streak_with_single_fullscreen_exit() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();

    for _ in 0..4 {
        engine
            .monitor
            .record_event(assessment.id, event(IntegrityEventKind::Blur))
            .await
            .unwrap();
    }
    // One fullscreen exit on top of four blurs is still below every
    // threshold.
    let mut exit = event(IntegrityEventKind::FullscreenChange);
    exit.fullscreen = Some(false);
    let summary = engine
        .monitor
        .record_event(assessment.id, exit)
        .await
        .unwrap();
    assert_eq!(summary.focus_loss, 4);
    assert_eq!(summary.fullscreen_exits, 1);
    assert!(!summary.suspicious_activity);

    // The fifth blur crosses the focus-loss threshold.
    let summary = engine
        .monitor
        .record_event(assessment.id, event(IntegrityEventKind::Blur))
        .await
        .unwrap();
    assert_eq!(summary.focus_loss, 5);
    assert!(summary.suspicious_activity);

    let stored = engine.assessments.get(assessment.id).await.unwrap().unwrap();
    assert!(stored.integrity.suspicious_activity);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_second_fullscreen_exit_flips_suspicion() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();

    let mut exit = event(IntegrityEventKind::FullscreenChange);
    exit.fullscreen = Some(false);

    let summary = engine
        .monitor
        .record_event(assessment.id, exit.clone())
        .await
        .unwrap();
    assert_eq!(summary.fullscreen_exits, 1);
    assert!(!summary.suspicious_activity);

    // Re-entering fullscreen does not count as an exit.
    let mut re_enter = event(IntegrityEventKind::FullscreenChange);
    re_enter.fullscreen = Some(true);
    let summary = engine
        .monitor
        .record_event(assessment.id, re_enter)
        .await
        .unwrap();
    assert_eq!(summary.fullscreen_exits, 1);

    let summary = engine
        .monitor
        .record_event(assessment.id, exit)
        .await
        .unwrap();
    assert_eq!(summary.fullscreen_exits, 2);
    assert!(summary.suspicious_activity);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_benign_events_are_logged_but_not_counted() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();

    engine
        .monitor
        .record_event(assessment.id, event(IntegrityEventKind::Focus))
        .await
        .unwrap();
    let summary = engine
        .monitor
        .record_event(assessment.id, event(IntegrityEventKind::WindowResize))
        .await
        .unwrap();
    assert_eq!(summary.tab_switches, 0);
    assert_eq!(summary.focus_loss, 0);
    assert!(!summary.suspicious_activity);

    let report = engine.monitor.report(assessment.id).await.unwrap();
    assert_eq!(report.total_events, 2);
    assert_eq!(report.event_counts.get("focus"), Some(&1));
    assert_eq!(report.event_counts.get("window_resize"), Some(&1));

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_events_after_terminality_are_dropped() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;

    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();
    engine
        .monitor
        .record_event(assessment.id, hidden())
        .await
        .unwrap();

    engine
        .orchestrator
        .cancel_assessment(assessment.id)
        .await
        .unwrap();

    // Counters froze at cancellation; the late event is not logged.
    let summary = engine
        .monitor
        .record_event(assessment.id, hidden())
        .await
        .unwrap();
    assert_eq!(summary.tab_switches, 1);

    let report = engine.monitor.report(assessment.id).await.unwrap();
    assert_eq!(report.total_events, 1);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_unknown_assessment_is_not_found() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());

    let err = engine
        .monitor
        .record_event(Uuid::new_v4(), hidden())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AssessmentNotFound(_)));

    let err = engine.monitor.report(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::AssessmentNotFound(_)));

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_report_aggregates_the_full_log() {
    let pool = setup_test_db().await;
    let engine = build_engine(&pool, Utc::now());
    let role = seed_role(&pool, &[("nback", 60)]).await;
    let candidate = Uuid::new_v4();
    let assessment = seed_assessment(&engine, candidate, role).await;
    engine
        .orchestrator
        .start_assessment(assessment.id, candidate)
        .await
        .unwrap();

    for _ in 0..2 {
        engine
            .monitor
            .record_event(assessment.id, hidden())
            .await
            .unwrap();
    }
    engine
        .monitor
        .record_event(assessment.id, event(IntegrityEventKind::Blur))
        .await
        .unwrap();
    engine
        .monitor
        .record_event(assessment.id, event(IntegrityEventKind::TabSwitch))
        .await
        .unwrap();

    let report = engine.monitor.report(assessment.id).await.unwrap();
    assert_eq!(report.assessment_id, assessment.id);
    assert_eq!(report.total_events, 4);
    assert_eq!(report.event_counts.get("visibilitychange"), Some(&2));
    assert_eq!(report.event_counts.get("blur"), Some(&1));
    assert_eq!(report.event_counts.get("tab_switch"), Some(&1));
    assert_eq!(report.summary.tab_switches, 3);
    assert!(!report.summary.suspicious_activity);

    teardown_test_db(pool).await;
}
