//! Storage-backed learning loop.
//!
//! This module contains:
//! - Database: embedded SQLite handle, schema, and retry policy
//! - ArmStore: persisted bandit arms + Thompson Sampling selection
//! - TelemetryStore: video lifecycle, metrics, and reporting queries
//! - RetrainingEngine: drift triggers and remedial resets

pub mod arms;
pub mod db;
pub mod retrain;
pub mod telemetry;

// Re-export commonly used types
pub use arms::{ArmStore, ArmUpdate, Selection};
pub use db::{Database, StoreError};
pub use retrain::{RetrainingEngine, RetrainingTrigger};
pub use telemetry::{TelemetryStore, DRIFT_THRESHOLD};
