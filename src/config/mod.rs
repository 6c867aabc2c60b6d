//! Channel configuration.
//!
//! Channels are defined in YAML and validated at load time; unknown
//! channels fall back to a sensible default so a first selection request
//! can always auto-initialize its arms.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::ARM_NAME_SEPARATOR;

pub mod paths;

pub use paths::{channels_path, db_path, engine_home};

/// Per-channel production settings that seed the packaging arms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Voice profile used for narration
    #[serde(default = "default_voice_profile")]
    pub voice_profile: String,

    /// Content formats this channel produces (e.g. listicle, explainer)
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_voice_profile() -> String {
    "neutral_male".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["listicle".to_string(), "explainer".to_string()]
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            voice_profile: default_voice_profile(),
            formats: default_formats(),
        }
    }
}

/// The full channel roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

impl ChannelsConfig {
    /// Load and validate the roster from a YAML file. A missing file
    /// yields an empty roster.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read channel config: {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate the roster from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).context("Failed to parse channel config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the roster. Arm names join their parts with `__`, so no
    /// identifier may contain the separator.
    pub fn validate(&self) -> Result<()> {
        for (channel_id, config) in &self.channels {
            if channel_id.is_empty() {
                anyhow::bail!("Channel id cannot be empty");
            }
            if channel_id.contains(ARM_NAME_SEPARATOR) {
                anyhow::bail!("Channel id '{channel_id}' must not contain '__'");
            }
            if config.formats.is_empty() {
                anyhow::bail!("Channel '{channel_id}' must declare at least one format");
            }
            for format in &config.formats {
                if format.is_empty() || format.contains(ARM_NAME_SEPARATOR) {
                    anyhow::bail!("Channel '{channel_id}' has an invalid format '{format}'");
                }
            }
            if config.voice_profile.contains(ARM_NAME_SEPARATOR) {
                anyhow::bail!(
                    "Channel '{channel_id}' has an invalid voice profile '{}'",
                    config.voice_profile
                );
            }
        }
        Ok(())
    }

    /// The config for a channel, or the default for channels not in the
    /// roster.
    pub fn channel(&self, channel_id: &str) -> ChannelConfig {
        self.channels
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }
}
