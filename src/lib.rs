//! optiloop - Closed-loop content optimization engine
//!
//! A per-channel multi-armed-bandit parameter selector with a persisted
//! telemetry ledger and a drift-triggered retraining loop.
//!
//! # Architecture
//!
//! The learning loop is closed through one embedded SQLite ledger:
//! - A production collaborator asks the arm store (Thompson Sampling)
//!   which configuration to use before producing a video
//! - Lifecycle events land in the telemetry ledger as the video moves
//!   through planning -> production -> preflight -> publish
//! - Once engagement metrics arrive, the reward engine turns them into a
//!   scalar signal that is fed back into the selected arm's posterior
//! - A periodic drift check resets learning state when performance
//!   regresses
//!
//! # Modules
//!
//! - `core`: storage-backed learning loop (Database, ArmStore,
//!   TelemetryStore, RetrainingEngine)
//! - `reward`: pure reward computation
//! - `clips`: retention-informed clip scoring
//! - `domain`: data structures (arms, videos, metrics)
//! - `config`: channel roster and canonical paths
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Pick a packaging configuration for a channel
//! optiloop select rich_tech
//!
//! # Feed back an observed reward
//! optiloop update-arm rich_tech__neutral_male__listicle__bold_text 42.5
//!
//! # Periodic drift check
//! optiloop retrain --watch --interval-secs 3600
//! ```

pub mod cli;
pub mod clips;
pub mod config;
pub mod core;
pub mod domain;
pub mod reward;

// Re-export main types at crate root for convenience
pub use crate::core::{ArmStore, Database, RetrainingEngine, StoreError, TelemetryStore};
pub use clips::{find_best_clips, ClipCandidate, Segment};
pub use config::{ChannelConfig, ChannelsConfig};
pub use domain::{Arm, ArmConfig, ArmType, EngagementMetrics, RetentionPoint, RiskScores};
pub use reward::{
    compute_reward, compute_shorts_reward, normalize_reward, Confidence, RewardBreakdown,
    REWARD_MAX, REWARD_MIN,
};
