//! Canonical paths for the engine's persisted state.
//!
//! Single source of truth - import this instead of hardcoding paths.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the engine home directory.
pub const HOME_ENV: &str = "OPTILOOP_HOME";

/// Get the engine home directory (~/.optiloop or $OPTILOOP_HOME).
pub fn engine_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().context("could not resolve home directory")?;
    Ok(home.join(".optiloop"))
}

/// Get the ledger database path (~/.optiloop/ledger.db).
pub fn db_path() -> Result<PathBuf> {
    Ok(engine_home()?.join("ledger.db"))
}

/// Get the channel configuration path (~/.optiloop/channels.yaml).
pub fn channels_path() -> Result<PathBuf> {
    Ok(engine_home()?.join("channels.yaml"))
}
