//! Video lifecycle records.
//!
//! A video moves through planned -> produced -> preflight -> published.
//! Each stage contributes its own sub-struct; the composed `VideoRecord`
//! carries whichever stages have been reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a video. Transitions are monotonic: a write never
/// moves a video to an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Planned,
    Produced,
    PreflightPassed,
    PreflightFailed,
    Published,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Planned => "planned",
            VideoStatus::Produced => "produced",
            VideoStatus::PreflightPassed => "preflight_passed",
            VideoStatus::PreflightFailed => "preflight_failed",
            VideoStatus::Published => "published",
        }
    }

    /// Ordering rank used to enforce monotonic transitions.
    pub fn rank(&self) -> u8 {
        match self {
            VideoStatus::Planned => 0,
            VideoStatus::Produced => 1,
            VideoStatus::PreflightPassed | VideoStatus::PreflightFailed => 2,
            VideoStatus::Published => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(VideoStatus::Planned),
            "produced" => Some(VideoStatus::Produced),
            "preflight_passed" => Some(VideoStatus::PreflightPassed),
            "preflight_failed" => Some(VideoStatus::PreflightFailed),
            "published" => Some(VideoStatus::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category risk scores from the preflight compliance check, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskScores {
    pub policy: f64,
    pub copyright: f64,
    pub misleading_metadata: f64,
    pub inauthentic_content: f64,
}

impl RiskScores {
    /// The dominant risk across all categories.
    pub fn max(&self) -> f64 {
        self.policy
            .max(self.copyright)
            .max(self.misleading_metadata)
            .max(self.inauthentic_content)
    }
}

/// Outcome of the preflight compliance check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreflightOutcome {
    pub risk_scores: RiskScores,
    pub publishable: bool,
}

/// Artifact paths and measurements recorded when a video is produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionDetails {
    pub script_path: Option<String>,
    pub audio_path: Option<String>,
    pub video_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub script_word_count: Option<i64>,
    pub script_visual_count: Option<i64>,
    pub audio_duration_sec: Option<f64>,
    pub video_duration_sec: Option<f64>,
    pub video_size_mb: Option<f64>,
    pub broll_generated: Option<i64>,
    pub broll_failed: Option<i64>,
    pub segment_duration: Option<f64>,
    pub render_time_sec: Option<f64>,
}

impl ProductionDetails {
    pub fn is_empty(&self) -> bool {
        self == &ProductionDetails::default()
    }
}

/// Partial cost update; unset fields are left untouched in the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostUpdate {
    pub tts_characters: Option<i64>,
    pub tts_cost_usd: Option<f64>,
    pub broll_api_calls: Option<i64>,
    pub broll_cost_usd: Option<f64>,
    pub thumbnail_api_calls: Option<i64>,
    pub render_time_sec: Option<f64>,
}

/// Accumulated per-video costs. `total_cost_usd` is always the sum of the
/// component costs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub tts_characters: Option<i64>,
    pub tts_cost_usd: Option<f64>,
    pub broll_api_calls: Option<i64>,
    pub broll_cost_usd: Option<f64>,
    pub thumbnail_api_calls: Option<i64>,
    pub total_cost_usd: Option<f64>,
}

/// Details recorded when a video is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub youtube_video_id: String,
    pub quota_used: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Quality assessment attached after production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Score in 0-100
    pub score: i64,
    /// Free-form detail payload
    pub details: Option<serde_json::Value>,
}

/// Short-form lineage for clips cut from a long-form source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortDetails {
    pub source_video: Option<String>,
    pub platform: String,
    pub caption_style: Option<String>,
    pub crop_strategy: Option<String>,
    pub caption_position: Option<String>,
    pub shorts_arm: Option<String>,
    pub video_duration_sec: Option<f64>,
    pub video_size_mb: Option<f64>,
}

/// A video's full ledger entry, composed from lifecycle-stage sub-structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub name: String,
    pub channel: String,
    pub topic: Option<String>,
    /// Packaging arm assigned at planning time
    pub template_arm: Option<String>,
    pub status: VideoStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub is_short: bool,

    pub production: Option<ProductionDetails>,
    pub costs: CostBreakdown,
    pub preflight: Option<PreflightOutcome>,
    pub publication: Option<Publication>,
    pub quality: Option<QualityAssessment>,
    pub short: Option<ShortDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ranks_are_monotonic() {
        assert!(VideoStatus::Planned.rank() < VideoStatus::Produced.rank());
        assert!(VideoStatus::Produced.rank() < VideoStatus::PreflightPassed.rank());
        assert_eq!(
            VideoStatus::PreflightPassed.rank(),
            VideoStatus::PreflightFailed.rank()
        );
        assert!(VideoStatus::PreflightFailed.rank() < VideoStatus::Published.rank());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            VideoStatus::Planned,
            VideoStatus::Produced,
            VideoStatus::PreflightPassed,
            VideoStatus::PreflightFailed,
            VideoStatus::Published,
        ] {
            assert_eq!(VideoStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VideoStatus::parse("rendering"), None);
    }

    #[test]
    fn test_max_risk() {
        let risk = RiskScores {
            policy: 0.1,
            copyright: 0.8,
            misleading_metadata: 0.3,
            inauthentic_content: 0.0,
        };
        assert_eq!(risk.max(), 0.8);
    }

    #[test]
    fn test_empty_production_details() {
        assert!(ProductionDetails::default().is_empty());

        let details = ProductionDetails {
            video_duration_sec: Some(612.0),
            ..Default::default()
        };
        assert!(!details.is_empty());
    }
}
