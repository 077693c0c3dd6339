//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`GW_CHUNK_LENGTH_DAYS`, `GW_BASELINE_POLICY`, `GW_PLANNER`)
//! 3. Workspace `groundwork.toml`
//! 4. System `~/.config/groundwork/config.toml`
//! 5. Built-in defaults

use serde::{Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

use super::schema::{GroundworkConfig, system_config_path, workspace_config_path};
use crate::planner::{
    CommandPlanner, DEFAULT_PLANNER_ARGS, DEFAULT_PLANNER_COMMAND, DEFAULT_TIMEOUT_SECS,
};
use crate::planning::{
    BaselinePolicy, CompileOptions, DEFAULT_CHUNK_LENGTH_DAYS, DEFAULT_DURATION_DAYS,
};
use crate::{Error, Result};

/// Environment variable overriding `chunk_length_days`.
pub const CHUNK_LENGTH_ENV: &str = "GW_CHUNK_LENGTH_DAYS";

/// Environment variable overriding `baseline_policy`.
pub const BASELINE_POLICY_ENV: &str = "GW_BASELINE_POLICY";

/// Environment variable overriding `planner.command`.
pub const PLANNER_ENV: &str = "GW_PLANNER";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the workspace `groundwork.toml`
    Workspace,
    /// Value from the system config file
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Workspace => write!(f, "workspace"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub chunk_length_days: Resolved<u32>,
    pub default_duration_days: Resolved<f64>,
    pub baseline_policy: Resolved<BaselinePolicy>,
    pub action_log: Resolved<bool>,
    pub planner_command: Resolved<String>,
    pub planner_args: Resolved<Vec<String>>,
    pub planner_timeout_secs: Resolved<u64>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            chunk_length_days: Resolved::new(DEFAULT_CHUNK_LENGTH_DAYS, ValueSource::Default),
            default_duration_days: Resolved::new(DEFAULT_DURATION_DAYS, ValueSource::Default),
            baseline_policy: Resolved::new(BaselinePolicy::default(), ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
            planner_command: Resolved::new(
                DEFAULT_PLANNER_COMMAND.to_string(),
                ValueSource::Default,
            ),
            planner_args: Resolved::new(
                DEFAULT_PLANNER_ARGS.iter().map(|s| s.to_string()).collect(),
                ValueSource::Default,
            ),
            planner_timeout_secs: Resolved::new(DEFAULT_TIMEOUT_SECS, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Options for the planning compilers.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            chunk_length_days: self.chunk_length_days.value,
            default_duration_days: self.default_duration_days.value,
            baseline_policy: self.baseline_policy.value,
        }
    }

    /// Whether the command audit log is enabled.
    pub fn action_log_enabled(&self) -> bool {
        self.action_log.value
    }

    /// Planner built from the resolved `[planner]` settings.
    pub fn planner(&self) -> CommandPlanner {
        CommandPlanner::new(
            &self.planner_command.value,
            self.planner_args.value.clone(),
            Duration::from_secs(self.planner_timeout_secs.value),
        )
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Chunk length override from CLI flag
    pub chunk_length_days: Option<u32>,
    /// Baseline policy override from CLI flag
    pub baseline_policy: Option<BaselinePolicy>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set chunk length override.
    pub fn with_chunk_length_days(mut self, days: u32) -> Self {
        self.chunk_length_days = Some(days);
        self
    }

    /// Set baseline policy override.
    pub fn with_baseline_policy(mut self, policy: BaselinePolicy) -> Self {
        self.baseline_policy = Some(policy);
        self
    }
}

/// Resolve configuration for a workspace with the full precedence chain.
pub fn resolve_config(workspace: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => GroundworkConfig::load(&path)?,
        None => GroundworkConfig::new(),
    };
    let local = GroundworkConfig::load(&workspace_config_path(workspace))?;

    resolve_layers(&system, &local, &|name: &str| std::env::var(name).ok(), overrides)
}

/// Resolve from already-loaded layers.
///
/// `env_lookup` reads an environment variable; empty values are ignored.
pub fn resolve_layers(
    system: &GroundworkConfig,
    workspace: &GroundworkConfig,
    env_lookup: &dyn Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    let mut result = ResolvedConfig::default();
    let env = |name: &str| env_lookup(name).filter(|v| !v.trim().is_empty());

    // Resolve chunk_length_days
    if let Some(days) = overrides.chunk_length_days {
        result.chunk_length_days = Resolved::new(days, ValueSource::CliFlag);
    } else if let Some(raw) = env(CHUNK_LENGTH_ENV) {
        let days = raw.trim().parse::<u32>().map_err(|_| {
            Error::InvalidInput(format!(
                "{} must be a positive integer, got {}",
                CHUNK_LENGTH_ENV, raw
            ))
        })?;
        result.chunk_length_days = Resolved::new(days, env_source(CHUNK_LENGTH_ENV));
    } else if let Some(days) = workspace.chunk_length_days {
        result.chunk_length_days = Resolved::new(days, ValueSource::Workspace);
    } else if let Some(days) = system.chunk_length_days {
        result.chunk_length_days = Resolved::new(days, ValueSource::System);
    }
    if result.chunk_length_days.value == 0 {
        return Err(Error::InvalidInput(format!(
            "chunk_length_days must be at least 1 (from {})",
            result.chunk_length_days.source
        )));
    }

    // Resolve default_duration_days
    if let Some(days) = workspace.default_duration_days {
        result.default_duration_days = Resolved::new(days, ValueSource::Workspace);
    } else if let Some(days) = system.default_duration_days {
        result.default_duration_days = Resolved::new(days, ValueSource::System);
    }

    // Resolve baseline_policy
    if let Some(policy) = overrides.baseline_policy {
        result.baseline_policy = Resolved::new(policy, ValueSource::CliFlag);
    } else if let Some(raw) = env(BASELINE_POLICY_ENV) {
        result.baseline_policy =
            Resolved::new(parse_policy(&raw)?, env_source(BASELINE_POLICY_ENV));
    } else if let Some(ref raw) = workspace.baseline_policy {
        result.baseline_policy = Resolved::new(parse_policy(raw)?, ValueSource::Workspace);
    } else if let Some(ref raw) = system.baseline_policy {
        result.baseline_policy = Resolved::new(parse_policy(raw)?, ValueSource::System);
    }

    // Resolve action_log
    if let Some(enabled) = workspace.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::Workspace);
    } else if let Some(enabled) = system.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::System);
    }

    // Resolve planner settings
    if let Some(command) = env(PLANNER_ENV) {
        result.planner_command = Resolved::new(command, env_source(PLANNER_ENV));
    } else if let Some(ref command) = workspace.planner.command {
        result.planner_command = Resolved::new(command.clone(), ValueSource::Workspace);
    } else if let Some(ref command) = system.planner.command {
        result.planner_command = Resolved::new(command.clone(), ValueSource::System);
    }

    if let Some(ref args) = workspace.planner.args {
        result.planner_args = Resolved::new(args.clone(), ValueSource::Workspace);
    } else if let Some(ref args) = system.planner.args {
        result.planner_args = Resolved::new(args.clone(), ValueSource::System);
    }

    if let Some(secs) = workspace.planner.timeout_secs {
        result.planner_timeout_secs = Resolved::new(secs, ValueSource::Workspace);
    } else if let Some(secs) = system.planner.timeout_secs {
        result.planner_timeout_secs = Resolved::new(secs, ValueSource::System);
    }

    Ok(result)
}

fn env_source(name: &str) -> ValueSource {
    ValueSource::EnvVar(name.to_string())
}

/// Parse a policy name, failing with `InvalidInput`.
pub fn parse_policy(raw: &str) -> Result<BaselinePolicy> {
    BaselinePolicy::parse(raw.trim())
        .ok_or_else(|| Error::InvalidInput(format!("Unknown baseline policy: {}", raw)))
}
