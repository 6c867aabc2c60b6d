//! Embedded SQLite datastore shared by the arm and telemetry stores.
//!
//! One database file holds the whole ledger: arms, videos, metrics
//! snapshots, decisions, incidents, retention curves, and daily quota.
//! The schema is created on open; WAL mode keeps the sequential pipeline
//! and out-of-band batch jobs from blocking each other.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode};
use thiserror::Error;

/// Transient lock errors are retried this many times before giving up.
const MAX_RETRIES: u32 = 5;

/// Linear backoff step between retries.
const BACKOFF_STEP: Duration = Duration::from_millis(50);

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database still locked after {attempts} attempts")]
    Busy { attempts: u32 },

    #[error("unknown arm: '{0}'")]
    UnknownArm(String),

    #[error("no active arms for channel '{0}'")]
    NoActiveArms(String),

    #[error("video '{0}' has no planned record")]
    UnknownVideo(String),

    #[error("no metrics snapshot for video '{0}' in the requested window")]
    MissingSnapshot(String),

    #[error("malformed stored payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Handle to the embedded database. Cheap to share by reference; all
/// stores borrow the same handle so cross-table writes stay in one
/// transaction scope.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        conn.busy_timeout(Duration::from_millis(250))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a storage operation, retrying with bounded linear backoff when
    /// SQLite reports transient lock contention.
    pub(crate) fn with_retry<T>(
        &self,
        mut f: impl FnMut(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        for attempt in 1..=MAX_RETRIES {
            match f(&self.conn) {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < MAX_RETRIES => {
                    tracing::debug!(attempt, "database busy, backing off");
                    std::thread::sleep(BACKOFF_STEP * attempt);
                }
                Err(err) if is_transient(&err) => {
                    return Err(StoreError::Busy {
                        attempts: MAX_RETRIES,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(StoreError::Busy {
            attempts: MAX_RETRIES,
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS arms (
                arm_name TEXT PRIMARY KEY,
                arm_type TEXT NOT NULL,
                config TEXT NOT NULL,
                alpha REAL NOT NULL DEFAULT 1.0,
                beta REAL NOT NULL DEFAULT 1.0,
                pull_count INTEGER NOT NULL DEFAULT 0,
                avg_reward REAL NOT NULL DEFAULT 0,
                last_used TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS videos (
                video_name TEXT PRIMARY KEY,
                channel TEXT NOT NULL,
                topic TEXT,
                template_arm TEXT,
                status TEXT NOT NULL DEFAULT 'planned',
                created_at TEXT DEFAULT (datetime('now')),
                published_at TEXT,

                -- Production details
                script_path TEXT,
                audio_path TEXT,
                video_path TEXT,
                thumbnail_path TEXT,
                script_word_count INTEGER,
                script_visual_count INTEGER,
                audio_duration_sec REAL,
                video_duration_sec REAL,
                video_size_mb REAL,
                broll_generated INTEGER,
                broll_failed INTEGER,
                segment_duration REAL,
                render_time_sec REAL,

                -- Cost tracking
                tts_characters INTEGER,
                tts_cost_usd REAL,
                broll_api_calls INTEGER,
                broll_cost_usd REAL,
                thumbnail_api_calls INTEGER,
                total_cost_usd REAL,

                -- Preflight risk scores
                risk_policy REAL,
                risk_copyright REAL,
                risk_misleading REAL,
                risk_inauthentic REAL,
                preflight_passed INTEGER,

                -- Publication
                youtube_video_id TEXT,
                youtube_quota_used INTEGER,

                -- Quality assessment
                quality_score INTEGER,
                quality_details TEXT,

                -- Short-form lineage
                is_short INTEGER NOT NULL DEFAULT 0,
                source_video TEXT,
                platform TEXT DEFAULT 'youtube',
                caption_style TEXT,
                caption_position TEXT,
                crop_strategy TEXT,
                shorts_arm TEXT
            );

            CREATE TABLE IF NOT EXISTS metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_name TEXT NOT NULL,
                youtube_video_id TEXT,
                window TEXT NOT NULL,
                pulled_at TEXT DEFAULT (datetime('now')),

                views INTEGER,
                estimated_minutes_watched REAL,
                avg_view_duration_sec REAL,
                avg_view_percentage REAL,
                engaged_views INTEGER,
                likes INTEGER,
                comments INTEGER,
                shares INTEGER,
                subscribers_gained INTEGER,
                subscribers_lost INTEGER,

                reward REAL,
                reward_components TEXT,
                confidence TEXT,

                UNIQUE (video_name, window)
            );

            CREATE TABLE IF NOT EXISTS decisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_name TEXT,
                timestamp TEXT DEFAULT (datetime('now')),
                decision_type TEXT NOT NULL,
                objective TEXT,
                alternatives TEXT,
                chosen_action TEXT,
                expected_impact TEXT,
                risk_rating TEXT
            );

            CREATE TABLE IF NOT EXISTS incidents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_name TEXT,
                timestamp TEXT DEFAULT (datetime('now')),
                incident_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                message TEXT,
                resolution TEXT
            );

            CREATE TABLE IF NOT EXISTS retention_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_name TEXT NOT NULL,
                youtube_video_id TEXT,
                pulled_at TEXT DEFAULT (datetime('now')),
                elapsed_pct REAL NOT NULL,
                audience_watch_ratio REAL NOT NULL,
                relative_performance REAL NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS daily_quota (
                date TEXT PRIMARY KEY,
                api_quota_used INTEGER NOT NULL DEFAULT 0,
                upload_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_arms_type ON arms(arm_type);
            CREATE INDEX IF NOT EXISTS idx_videos_channel ON videos(channel);
            CREATE INDEX IF NOT EXISTS idx_videos_status ON videos(status);
            CREATE INDEX IF NOT EXISTS idx_metrics_video ON metrics(video_name);
            CREATE INDEX IF NOT EXISTS idx_metrics_window ON metrics(window);
            CREATE INDEX IF NOT EXISTS idx_decisions_video ON decisions(video_name);
            CREATE INDEX IF NOT EXISTS idx_incidents_type ON incidents(incident_type);
            CREATE INDEX IF NOT EXISTS idx_retention_video ON retention_points(video_name);
            "#,
        )
    }
}

fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Parse a timestamp written by SQLite's `datetime('now')`.
pub(crate) fn parse_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
