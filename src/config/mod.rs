//! Configuration for Groundwork.
//!
//! Settings live in TOML files:
//! - System: `~/.config/groundwork/config.toml`
//! - Workspace: `<workspace>/groundwork.toml`
//!
//! Keys:
//! - `chunk_length_days` - planning chunk length (default 28)
//! - `default_duration_days` - fallback task duration (default 1.0)
//! - `baseline_policy` - "strict" or "fallback-to-actual"
//! - `action_log` - append commands to `actions.jsonl` (default true)
//! - `[planner]` - `command`, `args`, `timeout_secs`
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    BASELINE_POLICY_ENV, CHUNK_LENGTH_ENV, ConfigOverrides, PLANNER_ENV, Resolved, ResolvedConfig,
    ValueSource, parse_policy, resolve_config,
};
pub use schema::{CONFIG_FILE, GroundworkConfig, PlannerSection, write_default_config};
