//! Durable ledger of video lifecycle, metrics, decisions, incidents,
//! and retention curves, plus the queries that drive the learning loop.
//!
//! Lifecycle writes are transactional: a video row either records the
//! whole stage update or none of it. Status only ever moves forward.

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::db::{parse_timestamp, Database, StoreError};
use crate::domain::{
    ChannelSummary, CostBreakdown, CostReport, CostUpdate, DriftDirection, DriftReport,
    EngagementMetrics, MetricsSnapshot, PerformanceRow, PreflightOutcome, ProductionDetails,
    Publication, QualityAssessment, QuotaUsage, RetentionPoint, RiskScores, ShortDetails,
    VideoRecord, VideoStatus,
};
use crate::reward::RewardBreakdown;

/// Relative change in mean reward beyond which drift is flagged.
pub const DRIFT_THRESHOLD: f64 = 0.15;

/// Storage-backed telemetry ledger.
pub struct TelemetryStore<'a> {
    db: &'a Database,
}

impl<'a> TelemetryStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // -- Video lifecycle --

    /// Register a video entering the pipeline. Idempotent: re-planning an
    /// existing name leaves the original row untouched.
    pub fn log_video_planned(
        &self,
        video_name: &str,
        channel: &str,
        topic: Option<&str>,
        template_arm: Option<&str>,
    ) -> Result<(), StoreError> {
        self.db.with_retry(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO videos (video_name, channel, topic, template_arm, status)
                 VALUES (?1, ?2, ?3, ?4, 'planned')",
                params![video_name, channel, topic, template_arm],
            )
        })?;
        tracing::debug!(video_name, channel, "video planned");
        Ok(())
    }

    /// Record production artifacts and measurements. The video must have
    /// been planned first.
    pub fn log_video_produced(
        &self,
        video_name: &str,
        details: &ProductionDetails,
    ) -> Result<(), StoreError> {
        let found = self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            if !video_exists(&tx, video_name)? {
                return Ok(false);
            }
            tx.execute(
                "UPDATE videos SET
                    script_path = COALESCE(?2, script_path),
                    audio_path = COALESCE(?3, audio_path),
                    video_path = COALESCE(?4, video_path),
                    thumbnail_path = COALESCE(?5, thumbnail_path),
                    script_word_count = COALESCE(?6, script_word_count),
                    script_visual_count = COALESCE(?7, script_visual_count),
                    audio_duration_sec = COALESCE(?8, audio_duration_sec),
                    video_duration_sec = COALESCE(?9, video_duration_sec),
                    video_size_mb = COALESCE(?10, video_size_mb),
                    broll_generated = COALESCE(?11, broll_generated),
                    broll_failed = COALESCE(?12, broll_failed),
                    segment_duration = COALESCE(?13, segment_duration),
                    render_time_sec = COALESCE(?14, render_time_sec)
                 WHERE video_name = ?1",
                params![
                    video_name,
                    details.script_path,
                    details.audio_path,
                    details.video_path,
                    details.thumbnail_path,
                    details.script_word_count,
                    details.script_visual_count,
                    details.audio_duration_sec,
                    details.video_duration_sec,
                    details.video_size_mb,
                    details.broll_generated,
                    details.broll_failed,
                    details.segment_duration,
                    details.render_time_sec,
                ],
            )?;
            advance_status(&tx, video_name, VideoStatus::Produced)?;
            tx.commit()?;
            Ok(true)
        })?;
        if !found {
            return Err(StoreError::UnknownVideo(video_name.to_string()));
        }
        tracing::debug!(video_name, "video produced");
        Ok(())
    }

    /// Record the preflight compliance outcome.
    pub fn log_video_preflight(
        &self,
        video_name: &str,
        outcome: &PreflightOutcome,
    ) -> Result<(), StoreError> {
        let status = if outcome.publishable {
            VideoStatus::PreflightPassed
        } else {
            VideoStatus::PreflightFailed
        };

        let found = self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            if !video_exists(&tx, video_name)? {
                return Ok(false);
            }
            tx.execute(
                "UPDATE videos SET
                    risk_policy = ?2,
                    risk_copyright = ?3,
                    risk_misleading = ?4,
                    risk_inauthentic = ?5,
                    preflight_passed = ?6
                 WHERE video_name = ?1",
                params![
                    video_name,
                    outcome.risk_scores.policy,
                    outcome.risk_scores.copyright,
                    outcome.risk_scores.misleading_metadata,
                    outcome.risk_scores.inauthentic_content,
                    outcome.publishable as i64,
                ],
            )?;
            advance_status(&tx, video_name, status)?;
            tx.commit()?;
            Ok(true)
        })?;
        if !found {
            return Err(StoreError::UnknownVideo(video_name.to_string()));
        }
        tracing::info!(video_name, publishable = outcome.publishable, "preflight logged");
        Ok(())
    }

    /// Record a successful upload.
    pub fn log_video_published(
        &self,
        video_name: &str,
        youtube_video_id: &str,
        quota_used: Option<i64>,
    ) -> Result<(), StoreError> {
        let found = self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            if !video_exists(&tx, video_name)? {
                return Ok(false);
            }
            tx.execute(
                "UPDATE videos SET
                    youtube_video_id = ?2,
                    youtube_quota_used = ?3,
                    published_at = datetime('now')
                 WHERE video_name = ?1",
                params![video_name, youtube_video_id, quota_used],
            )?;
            advance_status(&tx, video_name, VideoStatus::Published)?;
            tx.commit()?;
            Ok(true)
        })?;
        if !found {
            return Err(StoreError::UnknownVideo(video_name.to_string()));
        }
        tracing::info!(video_name, youtube_video_id, "video published");
        Ok(())
    }

    /// Attach a quality assessment (0-100 plus free-form details).
    pub fn log_video_quality(
        &self,
        video_name: &str,
        score: i64,
        details: Option<&serde_json::Value>,
    ) -> Result<(), StoreError> {
        let details_json = details.map(serde_json::to_string).transpose()?;
        let found = self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            if !video_exists(&tx, video_name)? {
                return Ok(false);
            }
            tx.execute(
                "UPDATE videos SET quality_score = ?2, quality_details = ?3
                 WHERE video_name = ?1",
                params![video_name, score, details_json],
            )?;
            tx.commit()?;
            Ok(true)
        })?;
        if !found {
            return Err(StoreError::UnknownVideo(video_name.to_string()));
        }
        Ok(())
    }

    /// Register a short cut from a long-form source, with its lineage and
    /// presentation choices. Idempotent on the short's name.
    pub fn log_short_produced(
        &self,
        video_name: &str,
        channel: &str,
        details: &ShortDetails,
    ) -> Result<(), StoreError> {
        self.db.with_retry(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO videos
                    (video_name, channel, status, is_short, source_video, platform,
                     caption_style, crop_strategy, caption_position, shorts_arm,
                     video_duration_sec, video_size_mb)
                 VALUES (?1, ?2, 'produced', 1, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    video_name,
                    channel,
                    details.source_video,
                    details.platform,
                    details.caption_style,
                    details.crop_strategy,
                    details.caption_position,
                    details.shorts_arm,
                    details.video_duration_sec,
                    details.video_size_mb,
                ],
            )
        })?;
        tracing::debug!(video_name, channel, "short produced");
        Ok(())
    }

    /// Update cost fields and recompute the total as the sum of parts.
    pub fn update_costs(&self, video_name: &str, update: &CostUpdate) -> Result<(), StoreError> {
        let found = self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            if !video_exists(&tx, video_name)? {
                return Ok(false);
            }
            tx.execute(
                "UPDATE videos SET
                    tts_characters = COALESCE(?2, tts_characters),
                    tts_cost_usd = COALESCE(?3, tts_cost_usd),
                    broll_api_calls = COALESCE(?4, broll_api_calls),
                    broll_cost_usd = COALESCE(?5, broll_cost_usd),
                    thumbnail_api_calls = COALESCE(?6, thumbnail_api_calls),
                    render_time_sec = COALESCE(?7, render_time_sec)
                 WHERE video_name = ?1",
                params![
                    video_name,
                    update.tts_characters,
                    update.tts_cost_usd,
                    update.broll_api_calls,
                    update.broll_cost_usd,
                    update.thumbnail_api_calls,
                    update.render_time_sec,
                ],
            )?;
            tx.execute(
                "UPDATE videos SET
                    total_cost_usd = COALESCE(tts_cost_usd, 0) + COALESCE(broll_cost_usd, 0)
                 WHERE video_name = ?1",
                params![video_name],
            )?;
            tx.commit()?;
            Ok(true)
        })?;
        if !found {
            return Err(StoreError::UnknownVideo(video_name.to_string()));
        }
        Ok(())
    }

    /// Load a video's composed ledger entry.
    pub fn get_video(&self, video_name: &str) -> Result<Option<VideoRecord>, StoreError> {
        let conn = self.db.conn();
        let row = conn
            .query_row(
                "SELECT video_name, channel, topic, template_arm, status, created_at, is_short,
                        script_path, audio_path, video_path, thumbnail_path,
                        script_word_count, script_visual_count, audio_duration_sec,
                        video_duration_sec, video_size_mb, broll_generated, broll_failed,
                        segment_duration, render_time_sec,
                        tts_characters, tts_cost_usd, broll_api_calls, broll_cost_usd,
                        thumbnail_api_calls, total_cost_usd,
                        risk_policy, risk_copyright, risk_misleading, risk_inauthentic,
                        preflight_passed,
                        youtube_video_id, youtube_quota_used, published_at,
                        quality_score, quality_details,
                        source_video, platform, caption_style, crop_strategy,
                        caption_position, shorts_arm
                 FROM videos WHERE video_name = ?1",
                params![video_name],
                video_record_from_row,
            )
            .optional()?;
        Ok(row)
    }

    // -- Metrics --

    /// Store an engagement snapshot for `(video, window)`. A later call
    /// for the same window replaces the previous snapshot.
    pub fn log_metrics(
        &self,
        video_name: &str,
        window: &str,
        youtube_video_id: Option<&str>,
        metrics: &EngagementMetrics,
    ) -> Result<(), StoreError> {
        self.db.with_retry(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO metrics
                    (video_name, youtube_video_id, window, views, estimated_minutes_watched,
                     avg_view_duration_sec, avg_view_percentage, engaged_views, likes,
                     comments, shares, subscribers_gained, subscribers_lost)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    video_name,
                    youtube_video_id,
                    window,
                    metrics.views,
                    metrics.estimated_minutes_watched,
                    metrics.avg_view_duration_sec,
                    metrics.avg_view_percentage,
                    metrics.engaged_views,
                    metrics.likes,
                    metrics.comments,
                    metrics.shares,
                    metrics.subscribers_gained,
                    metrics.subscribers_lost,
                ],
            )
        })?;
        tracing::debug!(video_name, window, views = metrics.views, "metrics logged");
        Ok(())
    }

    /// Attach a computed reward to an existing metrics snapshot.
    pub fn record_reward(
        &self,
        video_name: &str,
        window: &str,
        reward: &RewardBreakdown,
    ) -> Result<(), StoreError> {
        let components = serde_json::to_string(&reward.components)?;
        let changed = self.db.with_retry(|conn| {
            conn.execute(
                "UPDATE metrics SET reward = ?3, reward_components = ?4, confidence = ?5
                 WHERE video_name = ?1 AND window = ?2",
                params![
                    video_name,
                    window,
                    reward.total_reward,
                    components,
                    reward.confidence.as_str(),
                ],
            )
        })?;
        if changed == 0 {
            return Err(StoreError::MissingSnapshot(video_name.to_string()));
        }
        tracing::info!(
            video_name,
            window,
            reward = reward.total_reward,
            confidence = %reward.confidence,
            "reward recorded"
        );
        Ok(())
    }

    /// Load one stored snapshot with any recorded reward.
    pub fn get_metrics(
        &self,
        video_name: &str,
        window: &str,
    ) -> Result<Option<MetricsSnapshot>, StoreError> {
        let conn = self.db.conn();
        let row = conn
            .query_row(
                "SELECT video_name, window, pulled_at, views, estimated_minutes_watched,
                        avg_view_duration_sec, avg_view_percentage, engaged_views, likes,
                        comments, shares, subscribers_gained, subscribers_lost,
                        reward, reward_components, confidence
                 FROM metrics WHERE video_name = ?1 AND window = ?2",
                params![video_name, window],
                |row| {
                    let components: Option<String> = row.get(14)?;
                    Ok((
                        MetricsSnapshot {
                            video_name: row.get(0)?,
                            window: row.get(1)?,
                            pulled_at: row
                                .get::<_, Option<String>>(2)?
                                .as_deref()
                                .and_then(parse_timestamp),
                            metrics: EngagementMetrics {
                                data_available: true,
                                views: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                                estimated_minutes_watched: row
                                    .get::<_, Option<f64>>(4)?
                                    .unwrap_or(0.0),
                                avg_view_duration_sec: row
                                    .get::<_, Option<f64>>(5)?
                                    .unwrap_or(0.0),
                                avg_view_percentage: row
                                    .get::<_, Option<f64>>(6)?
                                    .unwrap_or(0.0),
                                engaged_views: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
                                likes: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
                                comments: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
                                shares: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
                                subscribers_gained: row
                                    .get::<_, Option<i64>>(11)?
                                    .unwrap_or(0),
                                subscribers_lost: row
                                    .get::<_, Option<i64>>(12)?
                                    .unwrap_or(0),
                            },
                            reward: row.get(13)?,
                            reward_components: None,
                            confidence: row.get(15)?,
                        },
                        components,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((mut snapshot, components)) => {
                if let Some(json) = components {
                    snapshot.reward_components = Some(serde_json::from_str(&json)?);
                }
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    // -- Decisions & incidents --

    /// Append a decision to the audit trail.
    #[allow(clippy::too_many_arguments)]
    pub fn log_decision(
        &self,
        video_name: Option<&str>,
        decision_type: &str,
        objective: Option<&str>,
        chosen_action: &str,
        alternatives: Option<&[String]>,
        expected_impact: Option<&str>,
        risk_rating: Option<&str>,
    ) -> Result<(), StoreError> {
        let alternatives_json = alternatives.map(serde_json::to_string).transpose()?;
        self.db.with_retry(|conn| {
            conn.execute(
                "INSERT INTO decisions
                    (video_name, decision_type, objective, alternatives,
                     chosen_action, expected_impact, risk_rating)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    video_name,
                    decision_type,
                    objective,
                    alternatives_json,
                    chosen_action,
                    expected_impact,
                    risk_rating,
                ],
            )
        })?;
        Ok(())
    }

    /// Append an incident (policy violation, copyright claim, anomaly).
    pub fn log_incident(
        &self,
        video_name: Option<&str>,
        incident_type: &str,
        severity: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        self.db.with_retry(|conn| {
            conn.execute(
                "INSERT INTO incidents (video_name, incident_type, severity, message)
                 VALUES (?1, ?2, ?3, ?4)",
                params![video_name, incident_type, severity, message],
            )
        })?;
        tracing::warn!(incident_type, severity, message, "incident logged");
        Ok(())
    }

    // -- Retention curves --

    /// Replace a video's retention curve wholesale. An empty curve is a
    /// no-op that leaves any existing curve in place.
    pub fn log_retention_curve(
        &self,
        video_name: &str,
        youtube_video_id: Option<&str>,
        points: &[RetentionPoint],
    ) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM retention_points WHERE video_name = ?1",
                params![video_name],
            )?;
            for point in points {
                tx.execute(
                    "INSERT INTO retention_points
                        (video_name, youtube_video_id, elapsed_pct,
                         audience_watch_ratio, relative_performance)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        video_name,
                        youtube_video_id,
                        point.elapsed_pct,
                        point.audience_watch_ratio,
                        point.relative_performance,
                    ],
                )?;
            }
            tx.commit()
        })?;
        tracing::debug!(video_name, points = points.len(), "retention curve stored");
        Ok(())
    }

    /// A video's retention curve ordered by elapsed fraction.
    pub fn get_retention_curve(&self, video_name: &str) -> Result<Vec<RetentionPoint>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT elapsed_pct, audience_watch_ratio, relative_performance
             FROM retention_points
             WHERE video_name = ?1
             ORDER BY elapsed_pct",
        )?;
        let rows = stmt.query_map(params![video_name], |row| {
            Ok(RetentionPoint {
                elapsed_pct: row.get(0)?,
                audience_watch_ratio: row.get(1)?,
                relative_performance: row.get(2)?,
            })
        })?;
        let mut points = Vec::new();
        for row in rows {
            points.push(row?);
        }
        Ok(points)
    }

    // -- Daily quota --

    /// Add API quota units (and one upload) to today's tally.
    pub fn record_quota_usage(&self, api_units: i64, date: Option<&str>) -> Result<(), StoreError> {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let date = date.unwrap_or(&today);
        self.db.with_retry(|conn| {
            conn.execute(
                "INSERT INTO daily_quota (date, api_quota_used, upload_count, updated_at)
                 VALUES (?1, ?2, 1, datetime('now'))
                 ON CONFLICT(date) DO UPDATE SET
                    api_quota_used = api_quota_used + excluded.api_quota_used,
                    upload_count = upload_count + 1,
                    updated_at = datetime('now')",
                params![date, api_units],
            )
        })?;
        Ok(())
    }

    /// Quota consumed on a given day (today by default).
    pub fn get_daily_quota(&self, date: Option<&str>) -> Result<QuotaUsage, StoreError> {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let date = date.unwrap_or(&today);
        let usage = self
            .db
            .conn()
            .query_row(
                "SELECT api_quota_used, upload_count FROM daily_quota WHERE date = ?1",
                params![date],
                |row| {
                    Ok(QuotaUsage {
                        api_quota_used: row.get(0)?,
                        upload_count: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(usage.unwrap_or_default())
    }

    // -- Learning loop queries --

    /// The most recent published videos joined with their latest metrics
    /// snapshot (reward-bearing snapshots preferred).
    pub fn get_recent_performance(&self, n_videos: usize) -> Result<Vec<PerformanceRow>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT v.video_name, v.channel, v.template_arm, v.quality_score,
                    v.video_duration_sec, v.total_cost_usd,
                    m.views, m.estimated_minutes_watched, m.avg_view_percentage,
                    m.likes, m.comments, m.shares, m.reward, m.window
             FROM videos v
             LEFT JOIN metrics m ON m.id = (
                 SELECT id FROM metrics
                 WHERE video_name = v.video_name
                 ORDER BY (reward IS NOT NULL) DESC, pulled_at DESC, id DESC
                 LIMIT 1
             )
             WHERE v.status = 'published'
             ORDER BY v.published_at DESC, v.rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![n_videos as i64], |row| {
            Ok(PerformanceRow {
                video_name: row.get(0)?,
                channel: row.get(1)?,
                template_arm: row.get(2)?,
                quality_score: row.get(3)?,
                video_duration_sec: row.get(4)?,
                total_cost_usd: row.get(5)?,
                views: row.get(6)?,
                estimated_minutes_watched: row.get(7)?,
                avg_view_percentage: row.get(8)?,
                likes: row.get(9)?,
                comments: row.get(10)?,
                shares: row.get(11)?,
                reward: row.get(12)?,
                window: row.get(13)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Production and performance aggregates grouped by channel.
    pub fn get_channel_summary(&self) -> Result<Vec<ChannelSummary>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT channel,
                    COUNT(*) AS total_videos,
                    SUM(CASE WHEN status = 'published' THEN 1 ELSE 0 END) AS published,
                    AVG(quality_score) AS avg_quality,
                    AVG(total_cost_usd) AS avg_cost,
                    AVG(video_duration_sec) / 60.0 AS avg_duration_min,
                    SUM(total_cost_usd) AS total_cost
             FROM videos
             GROUP BY channel
             ORDER BY published DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ChannelSummary {
                channel: row.get(0)?,
                total_videos: row.get(1)?,
                published: row.get(2)?,
                avg_quality: row.get(3)?,
                avg_cost: row.get(4)?,
                avg_duration_min: row.get(5)?,
                total_cost: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Aggregate cost totals over a trailing window of days.
    pub fn get_cost_report(&self, window_days: i64) -> Result<CostReport, StoreError> {
        let conn = self.db.conn();
        let report = conn.query_row(
            "SELECT COUNT(*),
                    SUM(tts_cost_usd), SUM(broll_cost_usd), SUM(total_cost_usd),
                    SUM(broll_api_calls), SUM(tts_characters), SUM(youtube_quota_used),
                    AVG(total_cost_usd)
             FROM videos
             WHERE created_at >= datetime('now', ?1)",
            params![format!("-{window_days} days")],
            |row| {
                Ok(CostReport {
                    window_days,
                    videos_produced: row.get(0)?,
                    total_tts_usd: row.get(1)?,
                    total_broll_usd: row.get(2)?,
                    total_cost_usd: row.get(3)?,
                    total_broll_calls: row.get(4)?,
                    total_tts_characters: row.get(5)?,
                    total_quota_used: row.get(6)?,
                    avg_cost_per_video: row.get(7)?,
                })
            },
        )?;
        Ok(report)
    }

    /// Compare mean reward over the most recent `recent_n` videos against
    /// the trailing `baseline_n`. Reports `insufficient_data` when either
    /// window is short.
    pub fn detect_performance_drift(
        &self,
        recent_n: usize,
        baseline_n: usize,
    ) -> Result<DriftReport, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT m.reward
             FROM videos v
             JOIN metrics m ON m.id = (
                 SELECT id FROM metrics
                 WHERE video_name = v.video_name AND reward IS NOT NULL
                 ORDER BY pulled_at DESC, id DESC
                 LIMIT 1
             )
             WHERE v.status = 'published'
             ORDER BY v.published_at DESC, v.rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![(recent_n + baseline_n) as i64], |row| {
            row.get::<_, f64>(0)
        })?;
        let mut rewards = Vec::new();
        for row in rows {
            rewards.push(row?);
        }

        if rewards.len() < recent_n + baseline_n {
            let recent_count = rewards.len().min(recent_n) as i64;
            let baseline_count = rewards.len().saturating_sub(recent_n) as i64;
            return Ok(DriftReport::insufficient_data(recent_count, baseline_count));
        }

        let recent = &rewards[..recent_n];
        let baseline = &rewards[recent_n..recent_n + baseline_n];
        let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;
        let baseline_avg = baseline.iter().sum::<f64>() / baseline.len() as f64;

        if baseline_avg == 0.0 {
            // Relative change against a zero baseline is undefined.
            return Ok(DriftReport::insufficient_data(
                recent.len() as i64,
                baseline.len() as i64,
            ));
        }

        let pct_change = (recent_avg - baseline_avg) / baseline_avg.abs();
        let direction = if pct_change < -DRIFT_THRESHOLD {
            DriftDirection::Regression
        } else if pct_change > DRIFT_THRESHOLD {
            DriftDirection::Improvement
        } else {
            DriftDirection::Stable
        };

        Ok(DriftReport {
            drift_detected: pct_change.abs() > DRIFT_THRESHOLD,
            reason: None,
            direction: Some(direction),
            pct_change: Some(pct_change),
            recent_avg_reward: Some(recent_avg),
            baseline_avg_reward: Some(baseline_avg),
            recent_count: recent.len() as i64,
            baseline_count: baseline.len() as i64,
        })
    }
}

/// Whether a planned row exists for the name.
fn video_exists(conn: &Connection, video_name: &str) -> rusqlite::Result<bool> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM videos WHERE video_name = ?1",
            params![video_name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

/// Move a video's status forward; never backwards.
fn advance_status(
    conn: &Connection,
    video_name: &str,
    status: VideoStatus,
) -> rusqlite::Result<()> {
    let current: String = conn.query_row(
        "SELECT status FROM videos WHERE video_name = ?1",
        params![video_name],
        |row| row.get(0),
    )?;
    let current_rank = VideoStatus::parse(&current).map(|s| s.rank()).unwrap_or(0);
    if status.rank() >= current_rank {
        conn.execute(
            "UPDATE videos SET status = ?2 WHERE video_name = ?1",
            params![video_name, status.as_str()],
        )?;
    }
    Ok(())
}

fn video_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoRecord> {
    let status_str: String = row.get(4)?;
    let created_at: Option<String> = row.get(5)?;
    let is_short: i64 = row.get(6)?;

    let production = ProductionDetails {
        script_path: row.get(7)?,
        audio_path: row.get(8)?,
        video_path: row.get(9)?,
        thumbnail_path: row.get(10)?,
        script_word_count: row.get(11)?,
        script_visual_count: row.get(12)?,
        audio_duration_sec: row.get(13)?,
        video_duration_sec: row.get(14)?,
        video_size_mb: row.get(15)?,
        broll_generated: row.get(16)?,
        broll_failed: row.get(17)?,
        segment_duration: row.get(18)?,
        render_time_sec: row.get(19)?,
    };

    let costs = CostBreakdown {
        tts_characters: row.get(20)?,
        tts_cost_usd: row.get(21)?,
        broll_api_calls: row.get(22)?,
        broll_cost_usd: row.get(23)?,
        thumbnail_api_calls: row.get(24)?,
        total_cost_usd: row.get(25)?,
    };

    let preflight_passed: Option<i64> = row.get(30)?;
    let preflight = match preflight_passed {
        Some(passed) => Some(PreflightOutcome {
            risk_scores: RiskScores {
                policy: row.get::<_, Option<f64>>(26)?.unwrap_or(0.0),
                copyright: row.get::<_, Option<f64>>(27)?.unwrap_or(0.0),
                misleading_metadata: row.get::<_, Option<f64>>(28)?.unwrap_or(0.0),
                inauthentic_content: row.get::<_, Option<f64>>(29)?.unwrap_or(0.0),
            },
            publishable: passed != 0,
        }),
        None => None,
    };

    let youtube_video_id: Option<String> = row.get(31)?;
    let quota_used: Option<i64> = row.get(32)?;
    let published_at: Option<String> = row.get(33)?;
    let publication = youtube_video_id.map(|id| Publication {
        youtube_video_id: id,
        quota_used,
        published_at: published_at.as_deref().and_then(parse_timestamp),
    });

    let quality_score: Option<i64> = row.get(34)?;
    let quality_details: Option<String> = row.get(35)?;
    let quality = quality_score.map(|score| QualityAssessment {
        score,
        details: quality_details
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok()),
    });

    let short = if is_short != 0 {
        Some(ShortDetails {
            source_video: row.get(36)?,
            platform: row
                .get::<_, Option<String>>(37)?
                .unwrap_or_else(|| "youtube".to_string()),
            caption_style: row.get(38)?,
            crop_strategy: row.get(39)?,
            caption_position: row.get(40)?,
            shorts_arm: row.get(41)?,
            video_duration_sec: production.video_duration_sec,
            video_size_mb: production.video_size_mb,
        })
    } else {
        None
    };

    Ok(VideoRecord {
        name: row.get(0)?,
        channel: row.get(1)?,
        topic: row.get(2)?,
        template_arm: row.get(3)?,
        status: VideoStatus::parse(&status_str).unwrap_or(VideoStatus::Planned),
        created_at: created_at.as_deref().and_then(parse_timestamp),
        is_short: is_short != 0,
        production: if production.is_empty() {
            None
        } else {
            Some(production)
        },
        costs,
        preflight,
        publication,
        quality,
        short,
    })
}
