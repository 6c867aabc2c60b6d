//! Domain types for the optimization engine.
//!
//! This module contains the core data structures:
//! - Arms: bandit arms, decision dimensions, and their option sets
//! - Video: lifecycle records with stage-specific sub-structs
//! - Metrics: engagement snapshots, retention curves, reporting rows

pub mod arm;
pub mod metrics;
pub mod video;

// Re-export commonly used types
pub use arm::{
    arm_name, channel_prefix_pattern, thumbnail_styles, Arm, ArmConfig, ArmType, ThumbnailSpec,
    UnknownArmType, ARM_NAME_SEPARATOR, DEFAULT_PRIOR, HOOK_CATEGORIES, POSTING_SLOTS,
    SHORTS_CAPTION_POSITIONS, SHORTS_CAPTION_STYLES, SHORTS_CROP_STRATEGIES, TITLE_FORMULAS,
    VOICE_PARAM_PRESETS,
};
pub use metrics::{
    ChannelSummary, CostReport, DriftDirection, DriftReport, EngagementMetrics, MetricsSnapshot,
    PerformanceRow, QuotaUsage, RetentionPoint,
};
pub use video::{
    CostBreakdown, CostUpdate, PreflightOutcome, ProductionDetails, Publication,
    QualityAssessment, RiskScores, ShortDetails, VideoRecord, VideoStatus,
};
