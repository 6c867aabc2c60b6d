//! Reward shaping: raw engagement metrics -> scalar training signal.
//!
//! Pure functions only; nothing here touches storage. The reward is a sum
//! of independently capped components, reported alongside a confidence
//! tier derived from the view count.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{EngagementMetrics, RiskScores};

/// Global reward bounds used to normalize raw rewards into [0, 1] for the
/// bandit's Beta posterior. Values outside the range clamp.
pub const REWARD_MIN: f64 = -20.0;
pub const REWARD_MAX: f64 = 80.0;

/// Min-max normalize a raw reward into [0, 1] against the global bounds.
pub fn normalize_reward(raw: f64) -> f64 {
    ((raw - REWARD_MIN) / (REWARD_MAX - REWARD_MIN)).clamp(0.0, 1.0)
}

/// Qualitative sample-size tier attached to every reward estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    NoData,
    VeryLow,
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Tier boundaries are calibrated on view counts.
    pub fn from_views(views: i64) -> Self {
        if views < 10 {
            Confidence::VeryLow
        } else if views < 100 {
            Confidence::Low
        } else if views < 1000 {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::NoData => "no_data",
            Confidence::VeryLow => "very_low",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed reward with its per-component breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub total_reward: f64,
    pub components: BTreeMap<String, f64>,
    pub confidence: Confidence,
}

impl RewardBreakdown {
    fn no_data() -> Self {
        Self {
            total_reward: 0.0,
            components: BTreeMap::new(),
            confidence: Confidence::NoData,
        }
    }

    fn from_components(components: BTreeMap<String, f64>, views: i64) -> Self {
        let total: f64 = components.values().sum();
        Self {
            total_reward: round2(total),
            components: components
                .into_iter()
                .map(|(k, v)| (k, round2(v)))
                .collect(),
            confidence: Confidence::from_views(views),
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Capped ratio component: `min(value / target, 1) * weight`.
fn capped(value: f64, target: f64, weight: f64) -> f64 {
    (value / target).min(1.0) * weight
}

/// Multi-objective reward for long-form videos.
///
/// Components (independently capped, summed):
/// - watch_time: minutes watched per view against a 2-minute target, 20 pts
/// - retention: average view percentage against 60%, 20 pts
/// - engagement: weighted interactions per view against 10%, 15 pts
/// - subscriber_growth: net subscribers against +10, 15 pts
/// - cost_penalty: 0 to -10, one point per $5 of production cost
/// - risk_penalty: 0 to -20, scaled by the dominant preflight risk
pub fn compute_reward(
    metrics: Option<&EngagementMetrics>,
    costs: Option<f64>,
    risk_scores: Option<&RiskScores>,
) -> RewardBreakdown {
    let Some(metrics) = metrics else {
        return RewardBreakdown::no_data();
    };
    if !metrics.data_available {
        return RewardBreakdown::no_data();
    }

    let mut components = BTreeMap::new();
    let views = metrics.views;

    let watch_time = if views > 0 {
        capped(
            metrics.estimated_minutes_watched / views as f64 / 2.0,
            1.0,
            20.0,
        )
    } else {
        0.0
    };
    components.insert("watch_time".to_string(), watch_time);

    components.insert(
        "retention".to_string(),
        capped(metrics.avg_view_percentage, 60.0, 20.0),
    );

    let engagement = if views > 0 {
        let rate = (metrics.likes + metrics.comments * 2 + metrics.shares * 3) as f64
            / views as f64;
        capped(rate, 0.1, 15.0)
    } else {
        0.0
    };
    components.insert("engagement".to_string(), engagement);

    let net_subs = (metrics.subscribers_gained - metrics.subscribers_lost).max(0);
    components.insert(
        "subscriber_growth".to_string(),
        capped(net_subs as f64, 10.0, 15.0),
    );

    components.insert("cost_penalty".to_string(), cost_penalty(costs, 5.0, 10.0));
    components.insert("risk_penalty".to_string(), risk_penalty(risk_scores));

    RewardBreakdown::from_components(components, views)
}

/// Short-form reward: retention and engaged-view rate dominate, and the
/// cost divisor is lower because shorts are cheap to produce.
pub fn compute_shorts_reward(
    metrics: Option<&EngagementMetrics>,
    costs: Option<f64>,
) -> RewardBreakdown {
    let Some(metrics) = metrics else {
        return RewardBreakdown::no_data();
    };
    if !metrics.data_available {
        return RewardBreakdown::no_data();
    }

    let mut components = BTreeMap::new();
    let views = metrics.views;

    components.insert(
        "retention".to_string(),
        capped(metrics.avg_view_percentage, 70.0, 30.0),
    );

    let engaged = if views > 0 && metrics.engaged_views > 0 {
        capped(metrics.engaged_views as f64 / views as f64, 0.5, 20.0)
    } else {
        0.0
    };
    components.insert("engaged_view_rate".to_string(), engaged);

    let shares = if views > 0 {
        capped(metrics.shares as f64 / views as f64, 0.02, 15.0)
    } else {
        0.0
    };
    components.insert("shares".to_string(), shares);

    let net_subs = (metrics.subscribers_gained - metrics.subscribers_lost).max(0);
    components.insert(
        "subscriber_growth".to_string(),
        capped(net_subs as f64, 10.0, 15.0),
    );

    components.insert("cost_penalty".to_string(), cost_penalty(costs, 2.0, 5.0));

    RewardBreakdown::from_components(components, views)
}

fn cost_penalty(costs: Option<f64>, divisor: f64, cap: f64) -> f64 {
    match costs {
        Some(total_cost_usd) => -(total_cost_usd / divisor).min(cap),
        None => 0.0,
    }
}

fn risk_penalty(risk_scores: Option<&RiskScores>) -> f64 {
    match risk_scores {
        Some(scores) => -scores.max() * 20.0,
        None => 0.0,
    }
}
