//! Bandit arm types and the decision dimensions they compete over.
//!
//! An arm is one candidate configuration (a title formula, a caption
//! layout, a posting slot) competing for selection under Thompson
//! Sampling. Arms are keyed by a unique name that encodes the channel,
//! the decision dimension, and the variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Uniform Beta prior for freshly created arms.
pub const DEFAULT_PRIOR: f64 = 1.0;

/// Separator used when composing arm names from their parts.
pub const ARM_NAME_SEPARATOR: &str = "__";

/// A persisted bandit arm with its posterior belief and pull statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arm {
    /// Unique name: `{channel}__{dimension parts...}`
    pub arm_name: String,

    /// Decision dimension this arm belongs to
    pub arm_type: ArmType,

    /// Decoded variant configuration
    pub config: ArmConfig,

    /// Beta posterior shape parameters (success / failure mass)
    pub alpha: f64,
    pub beta: f64,

    /// Number of reward observations fed back into this arm
    pub pull_count: i64,

    /// Running mean of normalized rewards in [0, 1]
    pub avg_reward: f64,

    /// Last time this arm received feedback
    pub last_used: Option<DateTime<Utc>>,

    /// Inactive arms are excluded from selection but kept for reporting
    pub active: bool,
}

impl Arm {
    /// A freshly created arm with the uniform prior.
    pub fn with_prior(arm_name: String, arm_type: ArmType, config: ArmConfig) -> Self {
        Self {
            arm_name,
            arm_type,
            config,
            alpha: DEFAULT_PRIOR,
            beta: DEFAULT_PRIOR,
            pull_count: 0,
            avg_reward: 0.0,
            last_used: None,
            active: true,
        }
    }
}

/// The decision dimensions the engine optimizes.
///
/// This enum is closed on purpose: an unrecognized dimension name is a
/// programming error, not a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmType {
    /// Format x thumbnail style combinations from the channel config
    Packaging,

    /// One of the 12 title templates
    TitleFormula,

    /// One of the 7 opening-hook categories
    HookCategory,

    /// Crop x caption style x caption position for short-form cuts
    ShortsPresentation,

    /// Named voice synthesis parameter preset
    VoiceParams,

    /// Day-part slot for scheduling uploads
    PostingSchedule,
}

impl ArmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmType::Packaging => "packaging",
            ArmType::TitleFormula => "title_formula",
            ArmType::HookCategory => "hook_category",
            ArmType::ShortsPresentation => "shorts_presentation",
            ArmType::VoiceParams => "voice_params",
            ArmType::PostingSchedule => "posting_schedule",
        }
    }

    /// All supported dimensions, in a stable order.
    pub fn all() -> [ArmType; 6] {
        [
            ArmType::Packaging,
            ArmType::TitleFormula,
            ArmType::HookCategory,
            ArmType::ShortsPresentation,
            ArmType::VoiceParams,
            ArmType::PostingSchedule,
        ]
    }
}

impl std::fmt::Display for ArmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArmType {
    type Err = UnknownArmType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "packaging" => Ok(ArmType::Packaging),
            "title_formula" => Ok(ArmType::TitleFormula),
            "hook_category" => Ok(ArmType::HookCategory),
            "shorts_presentation" => Ok(ArmType::ShortsPresentation),
            "voice_params" => Ok(ArmType::VoiceParams),
            "posting_schedule" => Ok(ArmType::PostingSchedule),
            other => Err(UnknownArmType(other.to_string())),
        }
    }
}

/// Raised for arm-type names outside the supported set.
#[derive(Debug, Clone, Error)]
#[error("unknown arm type: '{0}'")]
pub struct UnknownArmType(pub String);

/// Decoded per-dimension variant configuration.
///
/// Stored as tagged JSON in the arms table so each dimension carries
/// exactly the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArmConfig {
    Packaging {
        channel: String,
        voice_profile: String,
        format: String,
        thumbnail_style: String,
        thumbnail: ThumbnailSpec,
    },
    TitleFormula {
        formula_index: usize,
        formula: String,
    },
    HookCategory {
        category: String,
    },
    ShortsPresentation {
        crop_strategy: String,
        caption_style: String,
        caption_position: String,
    },
    VoiceParams {
        preset: String,
        stability: f64,
        speed: f64,
        style: f64,
    },
    PostingSlot {
        slot: String,
    },
}

impl ArmConfig {
    /// The dimension a config variant belongs to.
    pub fn arm_type(&self) -> ArmType {
        match self {
            ArmConfig::Packaging { .. } => ArmType::Packaging,
            ArmConfig::TitleFormula { .. } => ArmType::TitleFormula,
            ArmConfig::HookCategory { .. } => ArmType::HookCategory,
            ArmConfig::ShortsPresentation { .. } => ArmType::ShortsPresentation,
            ArmConfig::VoiceParams { .. } => ArmType::VoiceParams,
            ArmConfig::PostingSlot { .. } => ArmType::PostingSchedule,
        }
    }
}

/// Concrete thumbnail rendering parameters behind a named style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSpec {
    pub layout: String,
    pub font_size: String,
    pub contrast: String,
    pub emoji: bool,
}

/// Named thumbnail styles available to every channel.
pub fn thumbnail_styles() -> Vec<(&'static str, ThumbnailSpec)> {
    vec![
        (
            "bold_text",
            ThumbnailSpec {
                layout: "text_dominant".to_string(),
                font_size: "large".to_string(),
                contrast: "high".to_string(),
                emoji: false,
            },
        ),
        (
            "clean_minimal",
            ThumbnailSpec {
                layout: "image_focus".to_string(),
                font_size: "medium".to_string(),
                contrast: "medium".to_string(),
                emoji: false,
            },
        ),
        (
            "curiosity_gap",
            ThumbnailSpec {
                layout: "split".to_string(),
                font_size: "large".to_string(),
                contrast: "high".to_string(),
                emoji: true,
            },
        ),
    ]
}

/// Title templates competing under the `title_formula` dimension.
pub const TITLE_FORMULAS: [&str; 12] = [
    "I Tried {topic} for 30 Days...",
    "{topic}: The Complete Beginner's Guide ({year})",
    "Stop Making This {topic} Mistake...",
    "{number} {topic} Tips That Actually Work",
    "Why {topic} Is Not What You Think",
    "The Truth About {topic} Nobody Tells You",
    "How I {topic} (Step by Step)",
    "{topic} in {year}: Everything Changed",
    "Watch This Before You {topic}",
    "I Was Wrong About {topic}",
    "{number} {topic} Hacks You Need to Know",
    "The Ultimate {topic} Guide for Beginners",
];

/// Opening-hook categories competing under the `hook_category` dimension.
pub const HOOK_CATEGORIES: [&str; 7] = [
    "curiosity_gap",
    "pattern_interrupt",
    "bold_claim",
    "personal_story",
    "social_proof",
    "controversy",
    "value_promise",
];

pub const SHORTS_CROP_STRATEGIES: [&str; 3] = ["center", "left_third", "right_third"];
pub const SHORTS_CAPTION_STYLES: [&str; 3] = ["capcut", "minimal", "karaoke"];
pub const SHORTS_CAPTION_POSITIONS: [&str; 3] = ["center", "bottom", "top"];

/// Voice synthesis presets: (name, stability, speed, style).
pub const VOICE_PARAM_PRESETS: [(&str, f64, f64, f64); 5] = [
    ("default", 0.55, 1.0, 0.25),
    ("high_energy", 0.25, 1.1, 0.55),
    ("calm_authority", 0.65, 0.95, 0.15),
    ("conversational", 0.40, 1.0, 0.35),
    ("dramatic", 0.35, 0.95, 0.45),
];

/// Upload day-part slots competing under the `posting_schedule` dimension.
pub const POSTING_SLOTS: [&str; 7] = [
    "weekday_morning",
    "weekday_noon",
    "weekday_afternoon",
    "weekday_evening",
    "weekend_morning",
    "weekend_afternoon",
    "weekend_evening",
];

/// Compose an arm name from its channel and variant parts.
pub fn arm_name(channel: &str, parts: &[&str]) -> String {
    let mut name = channel.to_string();
    for part in parts {
        name.push_str(ARM_NAME_SEPARATOR);
        name.push_str(part);
    }
    name
}

/// The LIKE pattern matching every arm belonging to a channel. Literal
/// underscores are escaped with `\` so they do not act as single-char
/// wildcards; use with `ESCAPE '\'`.
pub fn channel_prefix_pattern(channel: &str) -> String {
    let mut pattern = String::with_capacity(channel.len() + 5);
    for c in channel.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push_str("\\_\\_%");
    pattern
}
