//! Admin View Verification
//!
//! Exercises the read-only admin snapshots against a running engine and
//! pins the wire shapes the HTTP surface serves.

use std::sync::Arc;

use chatdesk_engine::prelude::*;
use chrono::{Duration, TimeZone};

async fn engine_with_clock() -> (Arc<DispatchEngine>, Arc<SimulatedClock>) {
    // Monday 03:00 UTC: Team A on shift, outside office hours.
    let clock = Arc::new(SimulatedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap(),
    ));
    let engine = DispatchEngine::new(DispatchConfig::default(), Some(clock.clone() as Arc<dyn Clock>))
        .await
        .unwrap();
    (engine, clock)
}

#[tokio::test]
async fn queue_status_reflects_queues_and_limits() {
    let (engine, clock) = engine_with_clock().await;
    let admin = AdminApi::new(Arc::clone(&engine));

    for i in 0..3 {
        clock.advance(Duration::milliseconds(10));
        engine.create_session(&format!("u{i}")).await.unwrap();
    }

    let status = admin.queue_status().await.unwrap();
    assert_eq!(status.queue_length, 3);
    assert_eq!(status.overflow_queue_length, 0);
    // Only Team A is on shift at 03:00 UTC.
    assert_eq!(status.total_capacity, 21);
    assert_eq!(status.main_queue_limit, 31);
    assert_eq!(status.overflow_capacity, 0);
    assert!(!status.is_office_hours);
    assert_eq!(status.agents.len(), 16);

    let on_shift: Vec<_> = status.agents.iter().filter(|a| a.active).collect();
    assert_eq!(on_shift.len(), 4);
    assert!(on_shift.iter().all(|a| a.team == Team::TeamA));
}

#[tokio::test]
async fn session_views_split_by_liveness() {
    let (engine, clock) = engine_with_clock().await;
    let admin = AdminApi::new(Arc::clone(&engine));

    let keeper = engine.create_session("u-live").await.unwrap();
    clock.advance(Duration::milliseconds(10));
    let goner = engine.create_session("u-gone").await.unwrap();
    engine.dispatcher().tick().await.unwrap();

    // Keep one session polling while the other goes silent.
    clock.advance(Duration::seconds(4));
    engine.poll(&keeper.id).await.unwrap();
    engine.timeout_service().process_timeouts().await.unwrap();

    let active = admin.active_sessions().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, keeper.id);

    let inactive = admin.inactive_sessions().await.unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].id, goner.id);

    assert_eq!(admin.sessions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn wire_shapes_are_camel_case_with_enum_names() {
    let (engine, _clock) = engine_with_clock().await;
    let admin = AdminApi::new(Arc::clone(&engine));
    engine.create_session("u1").await.unwrap();

    let status = serde_json::to_value(admin.queue_status().await.unwrap()).unwrap();
    assert!(status.get("queueLength").is_some());
    assert!(status.get("overflowQueueLength").is_some());
    assert!(status.get("isOfficeHours").is_some());

    let agent = &status["agents"][0];
    assert!(agent.get("acceptingNewChats").is_some());
    assert!(agent.get("maxConcurrent").is_some());
    let seniority = agent["seniority"].as_str().unwrap();
    assert!(["Junior", "MidLevel", "Senior", "TeamLead"].contains(&seniority));
    let team = agent["team"].as_str().unwrap();
    assert!(["TeamA", "TeamB", "TeamC", "Overflow"].contains(&team));

    let sessions = serde_json::to_value(admin.sessions().await.unwrap()).unwrap();
    let session = &sessions[0];
    assert_eq!(session["status"], "Queued");
    assert!(session.get("userId").is_some());
    assert!(session.get("createdAt").is_some());
    assert!(session.get("lastPolledAt").is_some());
}
