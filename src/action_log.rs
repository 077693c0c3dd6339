//! Command audit trail.
//!
//! Every `gw` invocation appends one JSON line to `<workspace>/actions.jsonl`
//! recording what ran, with which arguments, and how it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Audit log file name inside a workspace.
pub const ACTION_LOG_FILE: &str = "actions.jsonl";

/// Longest string argument kept verbatim.
const MAX_ARG_LEN: usize = 100;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// When the command finished
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "ingest", "compile problem", "analyze")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Path of the audit log for a workspace.
pub fn log_path(workspace: &Path) -> PathBuf {
    workspace.join(ACTION_LOG_FILE)
}

/// Append an entry to the workspace audit log.
///
/// Never fails: write errors are reported through `tracing` so a logging
/// problem cannot break the command that was logged.
pub fn log_action(
    workspace: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    let entry = ActionLog {
        timestamp: Utc::now(),
        command: command.to_string(),
        args: summarize_args(&args),
        success,
        error,
        duration_ms,
        user: current_user(),
    };

    if let Err(e) = write_log_entry(&log_path(workspace), &entry) {
        tracing::warn!(error = %e, "failed to write action log");
    }
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Shorten arguments for the log: paths become file names, long strings
/// and large arrays are summarized.
fn summarize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), summarize_args(value)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            if arr.len() > 10 {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(summarize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            let name = s.rsplit(['/', '\\']).next().unwrap_or(s);
            if name.chars().count() > MAX_ARG_LEN {
                let head: String = name.chars().take(MAX_ARG_LEN - 3).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, name.chars().count()))
            } else {
                serde_json::Value::String(name.to_string())
            }
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
