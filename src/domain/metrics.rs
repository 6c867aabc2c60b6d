//! Engagement metrics, retention curves, and reporting row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw engagement numbers for one video over one analytics window,
/// supplied by the metrics collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// False when the analytics backend returned no rows for the window
    pub data_available: bool,
    pub views: i64,
    pub estimated_minutes_watched: f64,
    pub avg_view_duration_sec: f64,
    pub avg_view_percentage: f64,
    /// Short-form only: views that cleared the engaged-view threshold
    pub engaged_views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub subscribers_gained: i64,
    pub subscribers_lost: i64,
}

/// A stored metrics snapshot, keyed by `(video, window)`. Re-logging the
/// same window overwrites the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub video_name: String,
    pub window: String,
    pub pulled_at: Option<DateTime<Utc>>,
    pub metrics: EngagementMetrics,

    /// Reward attached by `record_reward` once computed
    pub reward: Option<f64>,
    pub reward_components: Option<BTreeMap<String, f64>>,
    pub confidence: Option<String>,
}

/// One point of a video's audience retention curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionPoint {
    /// Fraction of the video's runtime, in [0, 1]
    pub elapsed_pct: f64,
    /// Share of the audience still watching (> 1 indicates rewatching)
    pub audience_watch_ratio: f64,
    pub relative_performance: f64,
}

/// Per-channel production and performance aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: String,
    pub total_videos: i64,
    pub published: i64,
    pub avg_quality: Option<f64>,
    pub avg_cost: Option<f64>,
    pub avg_duration_min: Option<f64>,
    pub total_cost: Option<f64>,
}

/// Aggregate cost totals over a trailing window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostReport {
    pub window_days: i64,
    pub videos_produced: i64,
    pub total_tts_usd: Option<f64>,
    pub total_broll_usd: Option<f64>,
    pub total_cost_usd: Option<f64>,
    pub total_broll_calls: Option<i64>,
    pub total_tts_characters: Option<i64>,
    pub total_quota_used: Option<i64>,
    pub avg_cost_per_video: Option<f64>,
}

/// One row of the recent-performance report: a published video joined
/// with its most recent metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub video_name: String,
    pub channel: String,
    pub template_arm: Option<String>,
    pub quality_score: Option<i64>,
    pub video_duration_sec: Option<f64>,
    pub total_cost_usd: Option<f64>,
    pub views: Option<i64>,
    pub estimated_minutes_watched: Option<f64>,
    pub avg_view_percentage: Option<f64>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub reward: Option<f64>,
    pub window: Option<String>,
}

/// Direction of a detected performance drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftDirection {
    Regression,
    Improvement,
    Stable,
}

impl std::fmt::Display for DriftDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DriftDirection::Regression => "regression",
            DriftDirection::Improvement => "improvement",
            DriftDirection::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Result of comparing recent mean reward against a trailing baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub drift_detected: bool,
    /// Set when the comparison could not be made (e.g. "insufficient_data")
    pub reason: Option<String>,
    pub direction: Option<DriftDirection>,
    pub pct_change: Option<f64>,
    pub recent_avg_reward: Option<f64>,
    pub baseline_avg_reward: Option<f64>,
    pub recent_count: i64,
    pub baseline_count: i64,
}

impl DriftReport {
    pub fn insufficient_data(recent_count: i64, baseline_count: i64) -> Self {
        Self {
            drift_detected: false,
            reason: Some("insufficient_data".to_string()),
            direction: None,
            pct_change: None,
            recent_avg_reward: None,
            baseline_avg_reward: None,
            recent_count,
            baseline_count,
        }
    }
}

/// Today's API quota consumption.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub api_quota_used: i64,
    pub upload_count: i64,
}
