//! TOML schema for `groundwork.toml` and the system config file.
//!
//! This module provides:
//! - `GroundworkConfig` / `PlannerSection` mirroring the file layout
//! - Loading and validation
//! - The commented template written by `gw init`

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::planning::BaselinePolicy;
use crate::{Error, Result};

/// Workspace config file name.
pub const CONFIG_FILE: &str = "groundwork.toml";

/// Template written into a fresh workspace.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Groundwork workspace configuration.
# Values here override ~/.config/groundwork/config.toml and are overridden
# by environment variables and command-line flags.

# Length of a planning chunk in days
# chunk_length_days = 28

# Duration used for tasks without a usable baseline window
# default_duration_days = 1.0

# "strict" rejects tasks with a single baseline date;
# "fallback-to-actual" fills the missing date from the actual dates first
# baseline_policy = "strict"

# Append every command to actions.jsonl
# action_log = true

[planner]
# command = "optic"
# args = ["-d", "{domain}", "-p", "{problem}"]
# timeout_secs = 300
"#;

/// Contents of a config file. Every key is optional.
///
/// ```toml
/// chunk_length_days = 14
/// baseline_policy = "fallback-to-actual"
///
/// [planner]
/// command = "/opt/optic/bin/optic"
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroundworkConfig {
    /// Chunk length in days (>= 1)
    pub chunk_length_days: Option<u32>,

    /// Fallback task duration in days (> 0)
    pub default_duration_days: Option<f64>,

    /// "strict" or "fallback-to-actual"
    pub baseline_policy: Option<String>,

    /// Whether to append to the command audit log
    pub action_log: Option<bool>,

    #[serde(default)]
    pub planner: PlannerSection,
}

/// The `[planner]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerSection {
    /// Program to run
    pub command: Option<String>,
    /// Arguments; `{domain}` and `{problem}` are substituted
    pub args: Option<Vec<String>>,
    /// Kill the planner after this many seconds
    pub timeout_secs: Option<u64>,
}

impl GroundworkConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text).map_err(|e| {
            Error::InvalidInput(format!("{}: {}", path.display(), e))
        })?;
        config
            .validate()
            .map_err(|msg| Error::InvalidInput(format!("{}: {}", path.display(), msg)))?;
        Ok(config)
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.chunk_length_days == Some(0) {
            return Err("chunk_length_days must be at least 1".to_string());
        }
        if let Some(days) = self.default_duration_days {
            if !days.is_finite() || days <= 0.0 {
                return Err(format!("default_duration_days must be positive, got {}", days));
            }
        }
        if let Some(ref policy) = self.baseline_policy {
            if BaselinePolicy::parse(policy).is_none() {
                return Err(format!("unknown baseline_policy: {}", policy));
            }
        }
        if self.planner.timeout_secs == Some(0) {
            return Err("planner.timeout_secs must be at least 1".to_string());
        }
        if matches!(self.planner.command.as_deref(), Some(c) if c.trim().is_empty()) {
            return Err("planner.command must not be empty".to_string());
        }
        Ok(())
    }
}

/// Path of the workspace config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(CONFIG_FILE)
}

/// Path of the system config file (`~/.config/groundwork/config.toml`).
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("groundwork").join("config.toml"))
}

/// Write the template config into `workspace` unless one exists.
///
/// Returns whether a file was written.
pub fn write_default_config(workspace: &Path) -> Result<bool> {
    let path = workspace_config_path(workspace);
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
    Ok(true)
}
