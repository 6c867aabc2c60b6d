//! Telemetry Ledger Integration Tests
//!
//! Tests for lifecycle writes, metrics snapshots, retention curves,
//! and the reporting queries against a file-backed ledger.

use optiloop::core::{Database, RetrainingEngine, RetrainingTrigger, TelemetryStore};
use optiloop::domain::{
    CostUpdate, EngagementMetrics, PreflightOutcome, ProductionDetails, RetentionPoint,
    RiskScores, VideoStatus,
};
use optiloop::reward::compute_reward;
use tempfile::TempDir;

fn open_ledger() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("ledger.db")).unwrap();
    (db, dir)
}

fn metrics(views: i64) -> EngagementMetrics {
    EngagementMetrics {
        data_available: true,
        views,
        estimated_minutes_watched: views as f64,
        avg_view_percentage: 45.0,
        likes: views / 20,
        comments: views / 100,
        shares: views / 200,
        subscribers_gained: 3,
        subscribers_lost: 1,
        ..Default::default()
    }
}

#[test]
fn test_full_lifecycle() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);

    telemetry
        .log_video_planned(
            "vid_001",
            "rich_tech",
            Some("Five AI tools"),
            Some("rich_tech__neutral_male__listicle__bold_text"),
        )
        .unwrap();

    telemetry
        .log_video_produced(
            "vid_001",
            &ProductionDetails {
                script_path: Some("output/scripts/vid_001.md".to_string()),
                video_path: Some("output/videos/vid_001.mp4".to_string()),
                script_word_count: Some(1450),
                video_duration_sec: Some(612.0),
                broll_generated: Some(9),
                broll_failed: Some(1),
                ..Default::default()
            },
        )
        .unwrap();

    telemetry
        .log_video_preflight(
            "vid_001",
            &PreflightOutcome {
                risk_scores: RiskScores {
                    policy: 0.05,
                    copyright: 0.1,
                    misleading_metadata: 0.0,
                    inauthentic_content: 0.0,
                },
                publishable: true,
            },
        )
        .unwrap();

    telemetry
        .log_video_published("vid_001", "dQw4w9WgXcQ", Some(1600))
        .unwrap();
    telemetry
        .log_video_quality("vid_001", 82, Some(&serde_json::json!({"pacing": "good"})))
        .unwrap();

    let video = telemetry.get_video("vid_001").unwrap().unwrap();
    assert_eq!(video.status, VideoStatus::Published);
    assert_eq!(video.channel, "rich_tech");
    assert_eq!(video.production.unwrap().script_word_count, Some(1450));
    assert!(video.preflight.unwrap().publishable);
    assert_eq!(
        video.publication.unwrap().youtube_video_id,
        "dQw4w9WgXcQ"
    );
    assert_eq!(video.quality.unwrap().score, 82);
}

#[test]
fn test_planning_idempotent_and_stages_skippable() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);

    telemetry
        .log_video_planned("vid_001", "ch", None, None)
        .unwrap();
    telemetry
        .log_video_planned("vid_001", "ch", None, None)
        .unwrap();

    // Skipping production and preflight is allowed
    telemetry
        .log_video_published("vid_001", "yt_abc", None)
        .unwrap();

    let video = telemetry.get_video("vid_001").unwrap().unwrap();
    assert_eq!(video.status, VideoStatus::Published);
    assert!(video.production.is_none());
    assert!(video.preflight.is_none());
}

#[test]
fn test_costs_always_sum() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);
    telemetry
        .log_video_planned("vid_001", "ch", None, None)
        .unwrap();

    telemetry
        .update_costs(
            "vid_001",
            &CostUpdate {
                tts_characters: Some(7800),
                tts_cost_usd: Some(1.17),
                ..Default::default()
            },
        )
        .unwrap();
    telemetry
        .update_costs(
            "vid_001",
            &CostUpdate {
                broll_api_calls: Some(12),
                broll_cost_usd: Some(0.96),
                ..Default::default()
            },
        )
        .unwrap();

    let costs = telemetry.get_video("vid_001").unwrap().unwrap().costs;
    assert_eq!(costs.tts_cost_usd, Some(1.17));
    assert_eq!(costs.broll_cost_usd, Some(0.96));
    assert!((costs.total_cost_usd.unwrap() - 2.13).abs() < 1e-9);
}

#[test]
fn test_metrics_windows_coexist_and_overwrite() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);
    telemetry
        .log_video_planned("vid_001", "ch", None, None)
        .unwrap();

    telemetry
        .log_metrics("vid_001", "7d", Some("yt_abc"), &metrics(120))
        .unwrap();
    telemetry
        .log_metrics("vid_001", "28d", Some("yt_abc"), &metrics(480))
        .unwrap();
    // Refreshing the 7d window replaces the earlier snapshot
    telemetry
        .log_metrics("vid_001", "7d", Some("yt_abc"), &metrics(200))
        .unwrap();

    let seven_day = telemetry.get_metrics("vid_001", "7d").unwrap().unwrap();
    assert_eq!(seven_day.metrics.views, 200);

    let month = telemetry.get_metrics("vid_001", "28d").unwrap().unwrap();
    assert_eq!(month.metrics.views, 480);
}

#[test]
fn test_reward_recorded_onto_snapshot() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);
    telemetry
        .log_video_planned("vid_001", "ch", None, None)
        .unwrap();

    let m = metrics(500);
    telemetry.log_metrics("vid_001", "7d", None, &m).unwrap();

    let reward = compute_reward(Some(&m), Some(2.5), None);
    telemetry.record_reward("vid_001", "7d", &reward).unwrap();

    let snapshot = telemetry.get_metrics("vid_001", "7d").unwrap().unwrap();
    assert_eq!(snapshot.reward, Some(reward.total_reward));
    assert_eq!(snapshot.confidence.as_deref(), Some("medium"));
    let components = snapshot.reward_components.unwrap();
    assert_eq!(components["cost_penalty"], -0.5);

    // Missing snapshot is an explicit error
    assert!(telemetry.record_reward("vid_001", "28d", &reward).is_err());
}

#[test]
fn test_recent_performance_joins_latest_metrics() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);

    for i in 0..3 {
        let name = format!("vid_{i:03}");
        telemetry
            .log_video_planned(&name, "rich_tech", None, None)
            .unwrap();
        telemetry
            .log_video_published(&name, &format!("yt_{i}"), None)
            .unwrap();
        let m = metrics(100 * (i + 1));
        telemetry.log_metrics(&name, "7d", None, &m).unwrap();
        let reward = compute_reward(Some(&m), None, None);
        telemetry.record_reward(&name, "7d", &reward).unwrap();
    }

    let rows = telemetry.get_recent_performance(10).unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert!(row.reward.is_some());
        assert_eq!(row.window.as_deref(), Some("7d"));
    }

    let limited = telemetry.get_recent_performance(2).unwrap();
    assert_eq!(limited.len(), 2);
}

#[test]
fn test_channel_summary_groups_by_channel() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);

    for (name, channel) in [
        ("vid_a", "rich_tech"),
        ("vid_b", "rich_tech"),
        ("vid_c", "rich_horror"),
    ] {
        telemetry.log_video_planned(name, channel, None, None).unwrap();
    }
    telemetry.log_video_published("vid_a", "yt_a", None).unwrap();

    let summaries = telemetry.get_channel_summary().unwrap();
    assert_eq!(summaries.len(), 2);

    let tech = summaries.iter().find(|s| s.channel == "rich_tech").unwrap();
    assert_eq!(tech.total_videos, 2);
    assert_eq!(tech.published, 1);

    let horror = summaries.iter().find(|s| s.channel == "rich_horror").unwrap();
    assert_eq!(horror.total_videos, 1);
    assert_eq!(horror.published, 0);
}

#[test]
fn test_cost_report_window() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);

    telemetry.log_video_planned("vid_001", "ch", None, None).unwrap();
    telemetry
        .update_costs(
            "vid_001",
            &CostUpdate {
                tts_cost_usd: Some(1.0),
                broll_cost_usd: Some(0.5),
                ..Default::default()
            },
        )
        .unwrap();

    let report = telemetry.get_cost_report(30).unwrap();
    assert_eq!(report.videos_produced, 1);
    assert!((report.total_cost_usd.unwrap() - 1.5).abs() < 1e-9);

    // Empty window still reports zero rows, not an error
    let empty = Database::open_in_memory().unwrap();
    let report = TelemetryStore::new(&empty).get_cost_report(30).unwrap();
    assert_eq!(report.videos_produced, 0);
    assert!(report.total_cost_usd.is_none());
}

#[test]
fn test_retention_round_trip_preserves_order_and_values() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);

    let points: Vec<RetentionPoint> = (0..5)
        .map(|i| RetentionPoint {
            elapsed_pct: i as f64 * 0.25,
            audience_watch_ratio: 1.2 - i as f64 * 0.2,
            relative_performance: 0.5 - i as f64 * 0.1,
        })
        .collect();

    telemetry
        .log_retention_curve("vid_001", Some("yt_abc"), &points)
        .unwrap();

    let stored = telemetry.get_retention_curve("vid_001").unwrap();
    assert_eq!(stored.len(), 5);
    for (original, round_tripped) in points.iter().zip(&stored) {
        assert_eq!(original.elapsed_pct, round_tripped.elapsed_pct);
        assert_eq!(
            original.audience_watch_ratio,
            round_tripped.audience_watch_ratio
        );
    }
}

#[test]
fn test_incidents_append_and_feed_triggers() {
    let (db, _dir) = open_ledger();
    let telemetry = TelemetryStore::new(&db);

    telemetry
        .log_incident(Some("vid_001"), "copyright_claim", "critical", "Content ID hit")
        .unwrap();
    telemetry
        .log_incident(Some("vid_001"), "copyright_claim", "critical", "Second hit")
        .unwrap();
    telemetry
        .log_decision(
            Some("vid_001"),
            "topic_selection",
            Some("maximize_reward"),
            "ai_tools_roundup",
            Some(&["ai_tools_roundup".to_string(), "gpu_deep_dive".to_string()]),
            None,
            Some("low"),
        )
        .unwrap();

    // Both incidents are visible to the retraining trigger scan
    let triggers = RetrainingEngine::new(&db).check_retraining_triggers();
    assert!(triggers.iter().any(|t| matches!(
        t,
        RetrainingTrigger::CopyrightSpike { incident_count: 2 }
    )));
}
