//! Command-line interface for optiloop.
//!
//! Provides commands for arm selection and feedback, telemetry
//! reporting, drift checks, and the periodic retraining loop.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, ChannelsConfig};
use crate::core::{ArmStore, Database, RetrainingEngine, TelemetryStore};
use crate::domain::ArmType;

/// optiloop - Closed-loop content optimization engine
#[derive(Parser, Debug)]
#[command(name = "optiloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ledger database path (defaults to ~/.optiloop/ledger.db)
    #[arg(long, global = true, env = "OPTILOOP_DB")]
    pub db: Option<PathBuf>,

    /// Channel roster path (defaults to ~/.optiloop/channels.yaml)
    #[arg(long, global = true, env = "OPTILOOP_CHANNELS")]
    pub channels: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the packaging arms for a channel
    InitArms {
        /// Channel id (e.g. rich_tech)
        channel: String,
    },

    /// Select a packaging configuration for a channel
    Select {
        /// Channel id
        channel: String,
    },

    /// Select a variant within one decision dimension
    SelectType {
        /// Channel id
        channel: String,

        /// Dimension: title_formula, hook_category, shorts_presentation,
        /// voice_params, posting_schedule
        arm_type: String,
    },

    /// Feed an observed reward back into an arm
    UpdateArm {
        /// Arm name as returned by select
        arm_name: String,

        /// Raw reward from the reward engine
        reward: f64,

        /// Associated video for the audit trail
        #[arg(short, long)]
        video: Option<String>,
    },

    /// Report all arms, best average reward first
    Arms {
        /// Only arms belonging to this channel
        #[arg(short, long)]
        channel: Option<String>,
    },

    /// Exclude an arm from future selection
    Deactivate {
        /// Arm name
        arm_name: String,
    },

    /// Show the most recent published videos with their metrics
    Recent {
        /// Maximum number of videos to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Per-channel production and performance summary
    Summary,

    /// Aggregate cost totals over a trailing window
    Costs {
        /// Window size in days
        #[arg(short, long, default_value = "30")]
        days: i64,
    },

    /// Compare recent reward against the trailing baseline
    Drift {
        /// Recent window size
        #[arg(long, default_value = "5")]
        recent: usize,

        /// Baseline window size
        #[arg(long, default_value = "20")]
        baseline: usize,
    },

    /// Check retraining triggers and apply remedial actions
    Retrain {
        /// Report triggers without acting on them
        #[arg(long)]
        dry_run: bool,

        /// Keep running, checking on an interval
        #[arg(long)]
        watch: bool,

        /// Seconds between checks in watch mode
        #[arg(long, default_value = "3600")]
        interval_secs: u64,
    },

    /// Show a video's stored retention curve
    Retention {
        /// Video name
        video: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let db_path = match &self.db {
            Some(path) => path.clone(),
            None => config::db_path()?,
        };
        let channels_path = match &self.channels {
            Some(path) => path.clone(),
            None => config::channels_path()?,
        };

        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open ledger at {}", db_path.display()))?;
        let roster = ChannelsConfig::from_file(&channels_path)?;

        match self.command {
            Commands::InitArms { channel } => init_arms(&db, &roster, &channel),
            Commands::Select { channel } => select(&db, &roster, &channel),
            Commands::SelectType { channel, arm_type } => {
                select_type(&db, &channel, &arm_type)
            }
            Commands::UpdateArm {
                arm_name,
                reward,
                video,
            } => update_arm(&db, &arm_name, reward, video.as_deref()),
            Commands::Arms { channel } => report_arms(&db, channel.as_deref()),
            Commands::Deactivate { arm_name } => deactivate(&db, &arm_name),
            Commands::Recent { limit } => recent(&db, limit),
            Commands::Summary => summary(&db),
            Commands::Costs { days } => costs(&db, days),
            Commands::Drift { recent, baseline } => drift(&db, recent, baseline),
            Commands::Retrain {
                dry_run,
                watch,
                interval_secs,
            } => retrain(&db, dry_run, watch, interval_secs).await,
            Commands::Retention { video } => retention(&db, &video),
            Commands::Config => show_config(&db_path, &channels_path, &roster),
        }
    }
}

fn init_arms(db: &Database, roster: &ChannelsConfig, channel: &str) -> Result<()> {
    let store = ArmStore::new(db);
    let arms = store.initialize_arms(channel, &roster.channel(channel))?;
    println!("Initialized {} packaging arms for {channel}:", arms.len());
    for arm in arms {
        println!("  {}", arm.arm_name);
    }
    Ok(())
}

fn select(db: &Database, roster: &ChannelsConfig, channel: &str) -> Result<()> {
    let store = ArmStore::new(db);
    let selection = store.select_arm(channel, &roster.channel(channel))?;
    println!("Selected: {}", selection.arm_name);
    println!("Sampled value: {:.4}", selection.sampled_value);
    println!(
        "Candidates: {} (exploration rate {:.0}%)",
        selection.total_candidates,
        selection.exploration_rate * 100.0
    );
    println!("Config: {}", serde_json::to_string_pretty(&selection.config)?);
    Ok(())
}

fn select_type(db: &Database, channel: &str, arm_type: &str) -> Result<()> {
    let arm_type = ArmType::from_str(arm_type)?;
    let store = ArmStore::new(db);
    let selection = store.select_arm_by_type(channel, arm_type)?;
    println!("Selected: {}", selection.arm_name);
    println!("Sampled value: {:.4}", selection.sampled_value);
    println!("Config: {}", serde_json::to_string_pretty(&selection.config)?);
    Ok(())
}

fn update_arm(db: &Database, arm_name: &str, reward: f64, video: Option<&str>) -> Result<()> {
    let store = ArmStore::new(db);
    let update = store.update_arm(arm_name, reward, video)?;
    println!(
        "{}: {} pulls, avg reward {:.4} (raw {:.2} -> normalized {:.4})",
        update.arm_name,
        update.total_pulls,
        update.avg_reward,
        update.last_reward_raw,
        update.last_reward_normalized
    );
    Ok(())
}

fn report_arms(db: &Database, channel: Option<&str>) -> Result<()> {
    let store = ArmStore::new(db);
    let arms = store.get_arm_report(channel)?;
    if arms.is_empty() {
        println!("No arms recorded yet");
        return Ok(());
    }

    println!(
        "{:<50} {:<20} {:>6} {:>10} {:>7}",
        "ARM", "TYPE", "PULLS", "AVG", "ACTIVE"
    );
    for arm in arms {
        println!(
            "{:<50} {:<20} {:>6} {:>10.4} {:>7}",
            arm.arm_name,
            arm.arm_type.to_string(),
            arm.pull_count,
            arm.avg_reward,
            if arm.active { "yes" } else { "no" }
        );
    }
    Ok(())
}

fn deactivate(db: &Database, arm_name: &str) -> Result<()> {
    ArmStore::new(db).deactivate_arm(arm_name)?;
    println!("Deactivated {arm_name}");
    Ok(())
}

fn recent(db: &Database, limit: usize) -> Result<()> {
    let telemetry = TelemetryStore::new(db);
    let rows = telemetry.get_recent_performance(limit)?;
    if rows.is_empty() {
        println!("No published videos yet");
        return Ok(());
    }

    for row in rows {
        let views = row
            .views
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let reward = row
            .reward
            .map(|r| format!("{r:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:<16} views {:>8}  reward {:>7}  window {}",
            row.video_name,
            row.channel,
            views,
            reward,
            row.window.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn summary(db: &Database) -> Result<()> {
    let telemetry = TelemetryStore::new(db);
    let summaries = telemetry.get_channel_summary()?;
    if summaries.is_empty() {
        println!("No videos recorded yet");
        return Ok(());
    }

    println!(
        "{:<20} {:>7} {:>10} {:>9} {:>10}",
        "CHANNEL", "VIDEOS", "PUBLISHED", "QUALITY", "COST"
    );
    for s in summaries {
        println!(
            "{:<20} {:>7} {:>10} {:>9} {:>10}",
            s.channel,
            s.total_videos,
            s.published,
            s.avg_quality
                .map(|q| format!("{q:.0}"))
                .unwrap_or_else(|| "-".to_string()),
            s.total_cost
                .map(|c| format!("${c:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}

fn costs(db: &Database, days: i64) -> Result<()> {
    let telemetry = TelemetryStore::new(db);
    let report = telemetry.get_cost_report(days)?;
    println!("Cost report, trailing {days} days:");
    println!("  Videos produced: {}", report.videos_produced);
    println!("  TTS: ${:.2}", report.total_tts_usd.unwrap_or(0.0));
    println!("  B-roll: ${:.2}", report.total_broll_usd.unwrap_or(0.0));
    println!("  Total: ${:.2}", report.total_cost_usd.unwrap_or(0.0));
    if let Some(avg) = report.avg_cost_per_video {
        println!("  Average per video: ${avg:.2}");
    }
    if let Some(quota) = report.total_quota_used {
        println!("  YouTube quota used: {quota}");
    }
    Ok(())
}

fn drift(db: &Database, recent_n: usize, baseline_n: usize) -> Result<()> {
    let telemetry = TelemetryStore::new(db);
    let report = telemetry.detect_performance_drift(recent_n, baseline_n)?;

    if let Some(reason) = &report.reason {
        println!(
            "No drift verdict: {reason} ({} recent / {} baseline samples)",
            report.recent_count, report.baseline_count
        );
        return Ok(());
    }

    let direction = report
        .direction
        .map(|d| d.to_string())
        .unwrap_or_else(|| "stable".to_string());
    println!(
        "Drift detected: {} ({direction}, {:+.1}%)",
        report.drift_detected,
        report.pct_change.unwrap_or(0.0) * 100.0
    );
    println!(
        "  Recent avg reward: {:.2} ({} videos)",
        report.recent_avg_reward.unwrap_or(0.0),
        report.recent_count
    );
    println!(
        "  Baseline avg reward: {:.2} ({} videos)",
        report.baseline_avg_reward.unwrap_or(0.0),
        report.baseline_count
    );
    Ok(())
}

async fn retrain(db: &Database, dry_run: bool, watch: bool, interval_secs: u64) -> Result<()> {
    if !watch {
        return retrain_once(db, dry_run);
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        interval.tick().await;
        if let Err(err) = retrain_once(db, dry_run) {
            eprintln!("Retraining check failed: {err}");
        }
    }
}

fn retrain_once(db: &Database, dry_run: bool) -> Result<()> {
    let engine = RetrainingEngine::new(db);
    let triggers = engine.check_retraining_triggers();

    if triggers.is_empty() {
        println!("No retraining triggers");
        return Ok(());
    }

    println!("Triggers:");
    for trigger in &triggers {
        println!("  {}", trigger.kind());
    }

    if dry_run {
        println!("Dry run, no actions taken");
        return Ok(());
    }

    for action in engine.execute_retraining(&triggers) {
        println!("  -> {action}");
    }
    Ok(())
}

fn retention(db: &Database, video: &str) -> Result<()> {
    let telemetry = TelemetryStore::new(db);
    let points = telemetry.get_retention_curve(video)?;
    if points.is_empty() {
        println!("No retention curve stored for {video}");
        return Ok(());
    }

    for point in points {
        println!(
            "{:>5.1}%  watch ratio {:.2}  relative {:+.2}",
            point.elapsed_pct * 100.0,
            point.audience_watch_ratio,
            point.relative_performance
        );
    }
    Ok(())
}

fn show_config(
    db_path: &std::path::Path,
    channels_path: &std::path::Path,
    roster: &ChannelsConfig,
) -> Result<()> {
    println!("Ledger: {}", db_path.display());
    println!("Channels file: {}", channels_path.display());
    if roster.channels.is_empty() {
        println!("No channels configured (unknown channels use defaults)");
    } else {
        for (id, config) in &roster.channels {
            println!(
                "  {id}: voice={} formats={}",
                config.voice_profile,
                config.formats.join(",")
            );
        }
    }
    Ok(())
}
