//! Drift detection triggers and the retraining executor.
//!
//! A scheduling collaborator calls `check_retraining_triggers` out of
//! band; any triggers it returns are handed to `execute_retraining`,
//! which resets the affected arms' posteriors toward the uniform prior.

use rusqlite::params;

use crate::core::db::{Database, StoreError};
use crate::core::telemetry::TelemetryStore;
use crate::domain::{DriftDirection, DriftReport};

/// Window sizes for the periodic drift comparison.
const DRIFT_RECENT_N: usize = 5;
const DRIFT_BASELINE_N: usize = 20;

/// Arms with fewer pulls than this are reset when performance regresses.
const LOW_PULL_RESET_THRESHOLD: i64 = 5;

/// Arms unused for this long are re-opened for exploration.
const STALE_AFTER_DAYS: i64 = 14;

/// Lookback for the copyright incident trigger.
const COPYRIGHT_WINDOW_DAYS: i64 = 7;

/// A condition that warrants resetting part of the learning state.
#[derive(Debug, Clone)]
pub enum RetrainingTrigger {
    /// Mean reward regressed versus the trailing baseline
    PerformanceDrift(DriftReport),

    /// Active arms that have not received feedback recently
    StaleArms(Vec<String>),

    /// Copyright incidents logged within the lookback window
    CopyrightSpike { incident_count: i64 },
}

impl RetrainingTrigger {
    pub fn kind(&self) -> &'static str {
        match self {
            RetrainingTrigger::PerformanceDrift(_) => "performance_drift",
            RetrainingTrigger::StaleArms(_) => "stale_arms",
            RetrainingTrigger::CopyrightSpike { .. } => "copyright_spike",
        }
    }
}

/// Scans telemetry for regression patterns and applies remedial actions.
pub struct RetrainingEngine<'a> {
    db: &'a Database,
}

impl<'a> RetrainingEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Check all conditions that should cause arm resets or renewed
    /// exploration. Returns an empty list when nothing fired; storage
    /// errors are logged and treated as "no trigger".
    pub fn check_retraining_triggers(&self) -> Vec<RetrainingTrigger> {
        let mut triggers = Vec::new();

        match TelemetryStore::new(self.db).detect_performance_drift(DRIFT_RECENT_N, DRIFT_BASELINE_N)
        {
            Ok(report)
                if report.drift_detected
                    && report.direction == Some(DriftDirection::Regression) =>
            {
                triggers.push(RetrainingTrigger::PerformanceDrift(report));
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "drift check failed"),
        }

        match self.stale_arms() {
            Ok(stale) if !stale.is_empty() => {
                triggers.push(RetrainingTrigger::StaleArms(stale));
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "stale arm check failed"),
        }

        match self.recent_copyright_incidents() {
            Ok(count) if count > 0 => {
                triggers.push(RetrainingTrigger::CopyrightSpike {
                    incident_count: count,
                });
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "copyright incident check failed"),
        }

        triggers
    }

    /// Apply the remedial action for each trigger and describe what was
    /// done. An empty trigger list is a no-op.
    pub fn execute_retraining(&self, triggers: &[RetrainingTrigger]) -> Vec<String> {
        let mut actions = Vec::new();

        for trigger in triggers {
            let result = match trigger {
                RetrainingTrigger::PerformanceDrift(report) => {
                    self.reset_low_pull_arms().map(|reset| {
                        format!(
                            "Reset {reset} low-pull arms to the uniform prior after a \
                             {:.1}% reward regression",
                            report.pct_change.unwrap_or(0.0) * -100.0
                        )
                    })
                }
                RetrainingTrigger::StaleArms(arm_names) => {
                    self.reset_arms(arm_names).map(|reset| {
                        format!("Reset {reset} stale arms to the uniform prior")
                    })
                }
                RetrainingTrigger::CopyrightSpike { incident_count } => {
                    TelemetryStore::new(self.db)
                        .log_incident(
                            None,
                            "retraining_triggered",
                            "warning",
                            &format!(
                                "{incident_count} copyright incidents in the last \
                                 {COPYRIGHT_WINDOW_DAYS} days"
                            ),
                        )
                        .map(|_| {
                            format!(
                                "Logged copyright retraining trigger \
                                 ({incident_count} incidents)"
                            )
                        })
                }
            };

            match result {
                Ok(action) => {
                    tracing::info!(trigger = trigger.kind(), action, "retraining action");
                    actions.push(action);
                }
                Err(err) => {
                    tracing::warn!(trigger = trigger.kind(), %err, "retraining action failed");
                    actions.push(format!("Failed to handle {}: {err}", trigger.kind()));
                }
            }
        }

        actions
    }

    /// Active arms with feedback history but no recent use.
    fn stale_arms(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT arm_name FROM arms
             WHERE active = 1 AND pull_count > 0
             AND last_used < datetime('now', ?1)",
        )?;
        let rows = stmt.query_map(params![format!("-{STALE_AFTER_DAYS} days")], |row| {
            row.get::<_, String>(0)
        })?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn recent_copyright_incidents(&self) -> Result<i64, StoreError> {
        let count = self.db.conn().query_row(
            "SELECT COUNT(*) FROM incidents
             WHERE incident_type LIKE '%copyright%'
             AND timestamp > datetime('now', ?1)",
            params![format!("-{COPYRIGHT_WINDOW_DAYS} days")],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn reset_low_pull_arms(&self) -> Result<usize, StoreError> {
        self.db.with_retry(|conn| {
            conn.execute(
                "UPDATE arms SET alpha = 1.0, beta = 1.0, pull_count = 0, avg_reward = 0
                 WHERE active = 1 AND pull_count < ?1",
                params![LOW_PULL_RESET_THRESHOLD],
            )
        })
    }

    fn reset_arms(&self, arm_names: &[String]) -> Result<usize, StoreError> {
        self.db.with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut reset = 0;
            for name in arm_names {
                reset += tx.execute(
                    "UPDATE arms SET alpha = 1.0, beta = 1.0, pull_count = 0, avg_reward = 0
                     WHERE arm_name = ?1",
                    params![name],
                )?;
            }
            tx.commit()?;
            Ok(reset)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::core::arms::ArmStore;

    fn seed_arms(db: &Database) -> Vec<String> {
        let store = ArmStore::new(db);
        store
            .initialize_arms(
                "ch",
                &ChannelConfig {
                    voice_profile: "neutral_male".to_string(),
                    formats: vec!["listicle".to_string()],
                },
            )
            .unwrap()
            .into_iter()
            .map(|arm| arm.arm_name)
            .collect()
    }

    #[test]
    fn test_no_triggers_on_empty_ledger() {
        let db = Database::open_in_memory().unwrap();
        let engine = RetrainingEngine::new(&db);
        assert!(engine.check_retraining_triggers().is_empty());
    }

    #[test]
    fn test_empty_triggers_yield_no_actions() {
        let db = Database::open_in_memory().unwrap();
        let names = seed_arms(&db);
        ArmStore::new(&db).update_arm(&names[0], 40.0, None).unwrap();

        let engine = RetrainingEngine::new(&db);
        let actions = engine.execute_retraining(&[]);
        assert!(actions.is_empty());

        // No side effects: the arm keeps its pulls
        let pulls: i64 = db
            .conn()
            .query_row(
                "SELECT pull_count FROM arms WHERE arm_name = ?1",
                params![&names[0]],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(pulls, 1);
    }

    #[test]
    fn test_drift_trigger_resets_low_pull_arms() {
        let db = Database::open_in_memory().unwrap();
        let names = seed_arms(&db);
        let store = ArmStore::new(&db);

        // One well-explored arm, the rest barely pulled
        for _ in 0..6 {
            store.update_arm(&names[0], 50.0, None).unwrap();
        }
        store.update_arm(&names[1], 10.0, None).unwrap();

        let report = DriftReport {
            drift_detected: true,
            reason: None,
            direction: Some(DriftDirection::Regression),
            pct_change: Some(-0.4),
            recent_avg_reward: Some(12.0),
            baseline_avg_reward: Some(20.0),
            recent_count: 5,
            baseline_count: 20,
        };

        let engine = RetrainingEngine::new(&db);
        let actions =
            engine.execute_retraining(&[RetrainingTrigger::PerformanceDrift(report)]);
        assert_eq!(actions.len(), 1);
        assert!(actions[0].contains("low-pull arms"));

        let (explored_pulls, reset_pulls): (i64, i64) = db
            .conn()
            .query_row(
                "SELECT
                    (SELECT pull_count FROM arms WHERE arm_name = ?1),
                    (SELECT pull_count FROM arms WHERE arm_name = ?2)",
                params![&names[0], &names[1]],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(explored_pulls, 6);
        assert_eq!(reset_pulls, 0);
    }

    #[test]
    fn test_stale_arm_trigger_resets_named_arms() {
        let db = Database::open_in_memory().unwrap();
        let names = seed_arms(&db);
        let store = ArmStore::new(&db);
        store.update_arm(&names[0], 40.0, None).unwrap();

        // Backdate the arm's last feedback past the staleness horizon
        db.conn()
            .execute(
                "UPDATE arms SET last_used = datetime('now', '-30 days')
                 WHERE arm_name = ?1",
                params![&names[0]],
            )
            .unwrap();

        let engine = RetrainingEngine::new(&db);
        let triggers = engine.check_retraining_triggers();
        assert!(triggers
            .iter()
            .any(|t| matches!(t, RetrainingTrigger::StaleArms(_))));

        let actions = engine.execute_retraining(&triggers);
        assert!(actions.iter().any(|a| a.contains("stale arms")));

        let (alpha, pulls): (f64, i64) = db
            .conn()
            .query_row(
                "SELECT alpha, pull_count FROM arms WHERE arm_name = ?1",
                params![&names[0]],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(alpha, 1.0);
        assert_eq!(pulls, 0);
    }

    #[test]
    fn test_copyright_spike_logs_incident() {
        let db = Database::open_in_memory().unwrap();
        let telemetry = TelemetryStore::new(&db);
        telemetry
            .log_incident(
                Some("vid_001"),
                "copyright_claim",
                "critical",
                "Content ID match on background track",
            )
            .unwrap();

        let engine = RetrainingEngine::new(&db);
        let triggers = engine.check_retraining_triggers();
        let spike = triggers
            .iter()
            .find(|t| matches!(t, RetrainingTrigger::CopyrightSpike { .. }))
            .expect("copyright trigger");
        assert!(matches!(
            spike,
            RetrainingTrigger::CopyrightSpike { incident_count: 1 }
        ));

        let actions = engine.execute_retraining(&triggers);
        assert!(actions.iter().any(|a| a.contains("copyright")));

        let count: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM incidents WHERE incident_type = 'retraining_triggered'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
