//! Persisted bandit arms and Thompson Sampling selection.
//!
//! Each channel carries one arm per variant of every decision dimension.
//! Selection draws one Beta(alpha, beta) sample per active arm and picks
//! the maximum; feedback folds the normalized reward back into the
//! posterior. Arms are created lazily and never deleted, only
//! deactivated.

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

use crate::config::ChannelConfig;
use crate::core::db::{parse_timestamp, Database, StoreError};
use crate::domain::{
    arm_name, channel_prefix_pattern, thumbnail_styles, Arm, ArmConfig, ArmType,
    DEFAULT_PRIOR, HOOK_CATEGORIES, POSTING_SLOTS, SHORTS_CAPTION_POSITIONS,
    SHORTS_CAPTION_STYLES, SHORTS_CROP_STRATEGIES, TITLE_FORMULAS, VOICE_PARAM_PRESETS,
};
use crate::reward::normalize_reward;

/// Result of a Thompson Sampling selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub arm_name: String,
    pub arm_type: ArmType,
    pub config: ArmConfig,
    /// The winning Beta draw
    pub sampled_value: f64,
    /// How many active arms competed
    pub total_candidates: usize,
    /// Share of candidates with fewer than 3 pulls
    pub exploration_rate: f64,
}

/// Updated statistics returned after feeding a reward back into an arm.
#[derive(Debug, Clone)]
pub struct ArmUpdate {
    pub arm_name: String,
    pub total_pulls: i64,
    pub avg_reward: f64,
    pub last_reward_raw: f64,
    pub last_reward_normalized: f64,
}

/// Storage-backed arm registry with Thompson Sampling selection.
pub struct ArmStore<'a> {
    db: &'a Database,
}

impl<'a> ArmStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create the packaging arms for a channel: one arm per
    /// format x thumbnail-style combination, with the uniform prior.
    /// Existing arms are left untouched, so repeated calls are no-ops.
    pub fn initialize_arms(
        &self,
        channel: &str,
        config: &ChannelConfig,
    ) -> Result<Vec<Arm>, StoreError> {
        let mut arms = Vec::new();
        for format in &config.formats {
            for (style_name, spec) in thumbnail_styles() {
                let name = arm_name(
                    channel,
                    &[config.voice_profile.as_str(), format.as_str(), style_name],
                );
                arms.push(Arm::with_prior(
                    name,
                    ArmType::Packaging,
                    ArmConfig::Packaging {
                        channel: channel.to_string(),
                        voice_profile: config.voice_profile.clone(),
                        format: format.clone(),
                        thumbnail_style: style_name.to_string(),
                        thumbnail: spec,
                    },
                ));
            }
        }

        self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            for arm in &arms {
                insert_arm(&tx, arm)?;
            }
            tx.commit()
        })?;

        tracing::debug!(channel, arms = arms.len(), "packaging arms initialized");
        Ok(arms)
    }

    /// Select a packaging configuration for a channel. Auto-initializes
    /// the channel's arms on first use.
    pub fn select_arm(
        &self,
        channel: &str,
        config: &ChannelConfig,
    ) -> Result<Selection, StoreError> {
        let mut rows = self.active_arms(channel, ArmType::Packaging)?;
        if rows.is_empty() {
            self.initialize_arms(channel, config)?;
            rows = self.active_arms(channel, ArmType::Packaging)?;
        }
        self.pick(channel, ArmType::Packaging, rows)
    }

    /// Select a variant within a single decision dimension. Arms for the
    /// dimension are auto-initialized from its fixed option set.
    pub fn select_arm_by_type(
        &self,
        channel: &str,
        arm_type: ArmType,
    ) -> Result<Selection, StoreError> {
        let mut rows = self.active_arms(channel, arm_type)?;
        if rows.is_empty() {
            self.auto_initialize(channel, arm_type)?;
            rows = self.active_arms(channel, arm_type)?;
        }
        self.pick(channel, arm_type, rows)
    }

    /// Fold an observed reward back into an arm's posterior. The raw
    /// reward is min-max normalized against the global bounds; the
    /// normalized value increments alpha and its complement beta.
    pub fn update_arm(
        &self,
        arm_name: &str,
        raw_reward: f64,
        video: Option<&str>,
    ) -> Result<ArmUpdate, StoreError> {
        let normalized = normalize_reward(raw_reward);

        let updated = self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;

            let row: Option<(f64, f64, i64, f64)> = tx
                .query_row(
                    "SELECT alpha, beta, pull_count, avg_reward FROM arms WHERE arm_name = ?1",
                    params![arm_name],
                    |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    },
                )
                .optional()?;

            let Some((alpha, beta, pulls, avg)) = row else {
                return Ok(None);
            };

            let new_pulls = pulls + 1;
            let new_avg = (avg * pulls as f64 + normalized) / new_pulls as f64;

            tx.execute(
                "UPDATE arms SET
                    alpha = ?1,
                    beta = ?2,
                    pull_count = ?3,
                    avg_reward = ?4,
                    last_used = datetime('now')
                 WHERE arm_name = ?5",
                params![
                    alpha + normalized,
                    beta + (1.0 - normalized),
                    new_pulls,
                    new_avg,
                    arm_name
                ],
            )?;

            insert_decision(
                &tx,
                video,
                "arm_reward_update",
                "update_bandit_stats",
                arm_name,
                None,
                Some(&format!(
                    "raw={raw_reward:.2}, norm={normalized:.4}, pulls={new_pulls}, avg={new_avg:.4}"
                )),
            )?;

            tx.commit()?;
            Ok(Some((new_pulls, new_avg)))
        })?;

        let (total_pulls, avg_reward) =
            updated.ok_or_else(|| StoreError::UnknownArm(arm_name.to_string()))?;

        tracing::info!(arm_name, raw_reward, normalized, total_pulls, "arm updated");

        Ok(ArmUpdate {
            arm_name: arm_name.to_string(),
            total_pulls,
            avg_reward,
            last_reward_raw: raw_reward,
            last_reward_normalized: normalized,
        })
    }

    /// All arms, optionally scoped to one channel, best average first.
    /// Inactive arms are included for reporting.
    pub fn get_arm_report(&self, channel: Option<&str>) -> Result<Vec<Arm>, StoreError> {
        let conn = self.db.conn();
        let sql = "SELECT arm_name, arm_type, config, alpha, beta, pull_count,
                          avg_reward, last_used, active
                   FROM arms {filter}
                   ORDER BY avg_reward DESC";

        let mut arms = Vec::new();
        match channel {
            Some(channel) => {
                let mut stmt = conn
                    .prepare(&sql.replace("{filter}", "WHERE arm_name LIKE ?1 ESCAPE '\\'"))?;
                let rows =
                    stmt.query_map(params![channel_prefix_pattern(channel)], arm_from_row)?;
                for row in rows {
                    arms.push(row?.try_into()?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&sql.replace("{filter}", ""))?;
                let rows = stmt.query_map([], arm_from_row)?;
                for row in rows {
                    arms.push(row?.try_into()?);
                }
            }
        }
        Ok(arms)
    }

    /// Exclude an arm from future selection. The row is kept for reports.
    pub fn deactivate_arm(&self, arm_name: &str) -> Result<(), StoreError> {
        let changed = self.db.with_retry(|conn| {
            conn.execute(
                "UPDATE arms SET active = 0 WHERE arm_name = ?1",
                params![arm_name],
            )
        })?;
        if changed == 0 {
            return Err(StoreError::UnknownArm(arm_name.to_string()));
        }
        tracing::info!(arm_name, "arm deactivated");
        Ok(())
    }

    // -- selection internals --

    fn pick(
        &self,
        channel: &str,
        arm_type: ArmType,
        rows: Vec<RawArm>,
    ) -> Result<Selection, StoreError> {
        if rows.is_empty() {
            return Err(StoreError::NoActiveArms(channel.to_string()));
        }

        let mut rng = rand::thread_rng();
        let mut best: Option<(usize, f64)> = None;
        let mut low_pull = 0usize;

        for (idx, row) in rows.iter().enumerate() {
            if row.pull_count < 3 {
                low_pull += 1;
            }
            let sample = sample_beta(&mut rng, row.alpha, row.beta);
            // Strictly greater keeps the first-seen arm on exact ties.
            if best.map_or(true, |(_, s)| sample > s) {
                best = Some((idx, sample));
            }
        }

        let (idx, sampled_value) = best.expect("non-empty candidate set");
        let total_candidates = rows.len();
        let exploration_rate = low_pull as f64 / total_candidates as f64;
        let alternatives: Vec<String> = rows.iter().map(|r| r.arm_name.clone()).collect();
        let alternatives_json = serde_json::to_string(&alternatives)?;
        let winner = rows.into_iter().nth(idx).expect("winner index in range");
        let config: ArmConfig = serde_json::from_str(&winner.config)?;

        self.db.with_retry(|conn| {
            insert_decision(
                conn,
                None,
                &format!("{arm_type}_selection"),
                &format!("optimize_{arm_type}"),
                &winner.arm_name,
                Some(&alternatives_json),
                Some(&format!("sampled={sampled_value:.4}")),
            )
        })?;

        tracing::debug!(
            channel,
            arm = %winner.arm_name,
            sampled_value,
            total_candidates,
            "arm selected"
        );

        Ok(Selection {
            arm_name: winner.arm_name,
            arm_type,
            config,
            sampled_value,
            total_candidates,
            exploration_rate,
        })
    }

    fn active_arms(&self, channel: &str, arm_type: ArmType) -> Result<Vec<RawArm>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT arm_name, config, alpha, beta, pull_count
             FROM arms
             WHERE active = 1 AND arm_type = ?1 AND arm_name LIKE ?2 ESCAPE '\\'
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map(
            params![arm_type.as_str(), channel_prefix_pattern(channel)],
            |row| {
                Ok(RawArm {
                    arm_name: row.get(0)?,
                    config: row.get(1)?,
                    alpha: row.get(2)?,
                    beta: row.get(3)?,
                    pull_count: row.get(4)?,
                })
            },
        )?;
        let mut arms = Vec::new();
        for row in rows {
            arms.push(row?);
        }
        Ok(arms)
    }

    fn auto_initialize(&self, channel: &str, arm_type: ArmType) -> Result<(), StoreError> {
        let arms: Vec<Arm> = match arm_type {
            // Packaging needs the channel config; callers go through
            // initialize_arms instead.
            ArmType::Packaging => Vec::new(),
            ArmType::TitleFormula => TITLE_FORMULAS
                .iter()
                .enumerate()
                .map(|(i, formula)| {
                    Arm::with_prior(
                        arm_name(channel, &[arm_type.as_str(), &i.to_string()]),
                        arm_type,
                        ArmConfig::TitleFormula {
                            formula_index: i,
                            formula: formula.to_string(),
                        },
                    )
                })
                .collect(),
            ArmType::HookCategory => HOOK_CATEGORIES
                .iter()
                .map(|category| {
                    Arm::with_prior(
                        arm_name(channel, &[arm_type.as_str(), category]),
                        arm_type,
                        ArmConfig::HookCategory {
                            category: category.to_string(),
                        },
                    )
                })
                .collect(),
            ArmType::ShortsPresentation => {
                let mut arms = Vec::new();
                for crop in SHORTS_CROP_STRATEGIES {
                    for style in SHORTS_CAPTION_STYLES {
                        for position in SHORTS_CAPTION_POSITIONS {
                            let key = format!("{crop}_{style}_{position}");
                            arms.push(Arm::with_prior(
                                arm_name(channel, &[arm_type.as_str(), &key]),
                                arm_type,
                                ArmConfig::ShortsPresentation {
                                    crop_strategy: crop.to_string(),
                                    caption_style: style.to_string(),
                                    caption_position: position.to_string(),
                                },
                            ));
                        }
                    }
                }
                arms
            }
            ArmType::VoiceParams => VOICE_PARAM_PRESETS
                .iter()
                .map(|(preset, stability, speed, style)| {
                    Arm::with_prior(
                        arm_name(channel, &[arm_type.as_str(), preset]),
                        arm_type,
                        ArmConfig::VoiceParams {
                            preset: preset.to_string(),
                            stability: *stability,
                            speed: *speed,
                            style: *style,
                        },
                    )
                })
                .collect(),
            ArmType::PostingSchedule => POSTING_SLOTS
                .iter()
                .map(|slot| {
                    Arm::with_prior(
                        arm_name(channel, &[arm_type.as_str(), slot]),
                        arm_type,
                        ArmConfig::PostingSlot {
                            slot: slot.to_string(),
                        },
                    )
                })
                .collect(),
        };

        self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            for arm in &arms {
                insert_arm(&tx, arm)?;
            }
            tx.commit()
        })?;

        tracing::debug!(channel, %arm_type, arms = arms.len(), "dimension arms initialized");
        Ok(())
    }
}

struct RawArm {
    arm_name: String,
    config: String,
    alpha: f64,
    beta: f64,
    pull_count: i64,
}

/// Intermediate row before the JSON config column is decoded.
struct ArmRow {
    arm_name: String,
    arm_type: String,
    config: String,
    alpha: f64,
    beta: f64,
    pull_count: i64,
    avg_reward: f64,
    last_used: Option<String>,
    active: bool,
}

impl TryFrom<ArmRow> for Arm {
    type Error = StoreError;

    fn try_from(row: ArmRow) -> Result<Self, Self::Error> {
        let arm_type = ArmType::from_str(&row.arm_type)
            .map_err(|_| StoreError::UnknownArm(row.arm_name.clone()))?;
        Ok(Arm {
            arm_name: row.arm_name,
            arm_type,
            config: serde_json::from_str(&row.config)?,
            alpha: row.alpha,
            beta: row.beta,
            pull_count: row.pull_count,
            avg_reward: row.avg_reward,
            last_used: row.last_used.as_deref().and_then(parse_timestamp),
            active: row.active,
        })
    }
}

fn arm_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArmRow> {
    Ok(ArmRow {
        arm_name: row.get(0)?,
        arm_type: row.get(1)?,
        config: row.get(2)?,
        alpha: row.get(3)?,
        beta: row.get(4)?,
        pull_count: row.get(5)?,
        avg_reward: row.get(6)?,
        last_used: row.get(7)?,
        active: row.get::<_, i64>(8)? != 0,
    })
}

fn insert_arm(conn: &Connection, arm: &Arm) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO arms
            (arm_name, arm_type, config, alpha, beta, pull_count, avg_reward, active)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, 1)",
        params![
            arm.arm_name,
            arm.arm_type.as_str(),
            serde_json::to_string(&arm.config)
                .expect("arm config serialization is infallible"),
            DEFAULT_PRIOR,
            DEFAULT_PRIOR,
        ],
    )?;
    Ok(())
}

fn insert_decision(
    conn: &Connection,
    video: Option<&str>,
    decision_type: &str,
    objective: &str,
    chosen_action: &str,
    alternatives_json: Option<&str>,
    expected_impact: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO decisions
            (video_name, decision_type, objective, alternatives, chosen_action, expected_impact)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            video,
            decision_type,
            objective,
            alternatives_json,
            chosen_action,
            expected_impact,
        ],
    )?;
    Ok(())
}

// -- Beta sampling --

/// Draw from Beta(alpha, beta) via the gamma ratio X / (X + Y).
pub(crate) fn sample_beta<R: Rng>(rng: &mut R, alpha: f64, beta: f64) -> f64 {
    let a = alpha.max(0.01);
    let b = beta.max(0.01);
    let x = sample_gamma(rng, a);
    let y = sample_gamma(rng, b);
    if x + y == 0.0 {
        0.5
    } else {
        x / (x + y)
    }
}

/// Marsaglia-Tsang squeeze method for Gamma(shape, 1).
fn sample_gamma<R: Rng>(rng: &mut R, shape: f64) -> f64 {
    if shape < 1.0 {
        // Boost: Gamma(a) = Gamma(a + 1) * U^(1/a)
        let u: f64 = rng.gen();
        return sample_gamma(rng, shape + 1.0) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = sample_standard_normal(rng);
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u: f64 = rng.gen();
        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

fn sample_standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // Box-Muller transform
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChannelConfig {
        ChannelConfig {
            voice_profile: "neutral_male".to_string(),
            formats: vec!["listicle".to_string(), "explainer".to_string()],
        }
    }

    #[test]
    fn test_samples_stay_in_unit_interval() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let sample = sample_beta(&mut rng, 1.0, 1.0);
            assert!((0.0..=1.0).contains(&sample));
        }
    }

    #[test]
    fn test_high_alpha_biases_high() {
        let mut rng = rand::thread_rng();
        let above: usize = (0..100)
            .filter(|_| sample_beta(&mut rng, 100.0, 1.0) > 0.5)
            .count();
        assert!(above > 90, "only {above}/100 samples above 0.5");
    }

    #[test]
    fn test_high_beta_biases_low() {
        let mut rng = rand::thread_rng();
        let below: usize = (0..100)
            .filter(|_| sample_beta(&mut rng, 1.0, 100.0) < 0.5)
            .count();
        assert!(below > 90, "only {below}/100 samples below 0.5");
    }

    #[test]
    fn test_initialize_arms_cross_product() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);

        let arms = store.initialize_arms("rich_tech", &test_config()).unwrap();
        // 2 formats x 3 thumbnail styles
        assert_eq!(arms.len(), 6);
        for arm in &arms {
            assert!(arm.arm_name.starts_with("rich_tech__"));
            assert_eq!(arm.arm_name.split("__").count(), 4);
        }
    }

    #[test]
    fn test_initialize_arms_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);

        store.initialize_arms("rich_tech", &test_config()).unwrap();
        store.initialize_arms("rich_tech", &test_config()).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM arms", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_select_arm_auto_initializes() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);

        let selection = store.select_arm("fresh_channel", &test_config()).unwrap();
        assert!(selection.arm_name.starts_with("fresh_channel__"));
        assert!((0.0..=1.0).contains(&selection.sampled_value));
        assert_eq!(selection.total_candidates, 6);
        assert!(matches!(selection.config, ArmConfig::Packaging { .. }));
    }

    #[test]
    fn test_selection_logs_decision() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);
        store.select_arm("ch", &test_config()).unwrap();

        let count: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM decisions WHERE decision_type = 'packaging_selection'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_select_by_type_cardinalities() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);

        for (arm_type, expected) in [
            (ArmType::TitleFormula, 12),
            (ArmType::HookCategory, 7),
            (ArmType::ShortsPresentation, 27),
            (ArmType::VoiceParams, 5),
            (ArmType::PostingSchedule, 7),
        ] {
            let selection = store.select_arm_by_type("ch", arm_type).unwrap();
            assert_eq!(selection.total_candidates, expected, "{arm_type}");
            assert_eq!(selection.arm_type, arm_type);
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);

        let a = store
            .select_arm_by_type("channel_a", ArmType::TitleFormula)
            .unwrap();
        let b = store
            .select_arm_by_type("channel_b", ArmType::TitleFormula)
            .unwrap();
        assert!(a.arm_name.starts_with("channel_a__"));
        assert!(b.arm_name.starts_with("channel_b__"));
    }

    #[test]
    fn test_update_arm_increments_pulls_and_posterior() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);
        let arms = store.initialize_arms("ch", &test_config()).unwrap();
        let name = &arms[0].arm_name;

        // raw 30 -> normalized (30 + 20) / 100 = 0.5
        let update = store.update_arm(name, 30.0, Some("vid_001")).unwrap();
        assert_eq!(update.total_pulls, 1);
        assert!((update.last_reward_normalized - 0.5).abs() < 1e-9);
        assert!((update.avg_reward - 0.5).abs() < 1e-9);

        let (alpha, beta): (f64, f64) = db
            .conn()
            .query_row(
                "SELECT alpha, beta FROM arms WHERE arm_name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!((alpha - 1.5).abs() < 1e-9);
        assert!((beta - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_update_arm_moves_average_toward_new_value() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);
        let arms = store.initialize_arms("ch", &test_config()).unwrap();
        let name = &arms[0].arm_name;

        let first = store
            .update_arm(name, crate::reward::REWARD_MAX, None)
            .unwrap();
        let second = store
            .update_arm(name, crate::reward::REWARD_MIN, None)
            .unwrap();
        assert_eq!(second.total_pulls, 2);
        assert!(second.avg_reward < first.avg_reward);
        assert!((second.avg_reward - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_update_unknown_arm_errors() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);
        let result = store.update_arm("missing__arm", 10.0, None);
        assert!(matches!(result, Err(StoreError::UnknownArm(_))));
    }

    #[test]
    fn test_deactivated_arm_excluded_from_selection_kept_in_report() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);
        let arms = store.initialize_arms("ch", &test_config()).unwrap();
        let name = &arms[0].arm_name;

        store.deactivate_arm(name).unwrap();

        for _ in 0..20 {
            let selection = store.select_arm("ch", &test_config()).unwrap();
            assert_ne!(&selection.arm_name, name);
            assert_eq!(selection.total_candidates, 5);
        }

        let report = store.get_arm_report(Some("ch")).unwrap();
        assert_eq!(report.len(), 6);
        let deactivated = report.iter().find(|a| &a.arm_name == name).unwrap();
        assert!(!deactivated.active);
    }

    #[test]
    fn test_report_filters_by_channel_prefix() {
        let db = Database::open_in_memory().unwrap();
        let store = ArmStore::new(&db);
        store.initialize_arms("rich_tech", &test_config()).unwrap();
        store.initialize_arms("rich_horror", &test_config()).unwrap();

        let tech = store.get_arm_report(Some("rich_tech")).unwrap();
        assert_eq!(tech.len(), 6);
        assert!(tech.iter().all(|a| a.arm_name.starts_with("rich_tech__")));

        let all = store.get_arm_report(None).unwrap();
        assert_eq!(all.len(), 12);
    }
}
