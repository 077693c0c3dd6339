//! Data models for Groundwork entities.
//!
//! This module defines the core data structures:
//! - `Task` - A schedule row with baseline/actual dates and progress
//! - `ScheduleType` - Which half of a schedule a task set belongs to
//! - `Project` - Per-schedule-half dates (start, end, reference "as-of" day)
//! - `ChunkId` - Index of a fixed-length time bucket
//! - `Mapping` - A registered domain/problem artifact pair

pub mod hierarchy;
pub mod ingest;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use hierarchy::{leaf_tasks, summary_task_ids};
pub use ingest::ScheduleFile;

/// Which half of a schedule a task set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleType {
    /// The fixed baseline schedule
    #[serde(rename = "target")]
    Target,
    /// The evolving snapshot of actual execution
    #[serde(rename = "in-progress")]
    InProgress,
}

impl ScheduleType {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "target" | "baseline" => Some(Self::Target),
            "in-progress" | "in_progress" | "progress" => Some(Self::InProgress),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::InProgress => "in-progress",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Index of a fixed-length time bucket, counted from the schedule anchor.
///
/// Chunks are totally ordered by index and render as `chunk_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub u32);

impl ChunkId {
    /// Numeric index of this chunk.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk_{}", self.0)
    }
}

/// A single schedule row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within a schedule half
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,

    /// Parent task ID; any task referenced here is a summary task
    #[serde(default, deserialize_with = "optional_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Planned start
    #[serde(default, alias = "bl_start", with = "crate::dates::opt_datetime")]
    pub baseline_start: Option<NaiveDateTime>,

    /// Planned finish
    #[serde(default, alias = "bl_finish", with = "crate::dates::opt_datetime")]
    pub baseline_finish: Option<NaiveDateTime>,

    /// Actual (or forecast) start, in-progress schedules only
    #[serde(default, alias = "start_date", with = "crate::dates::opt_datetime")]
    pub actual_start: Option<NaiveDateTime>,

    /// Actual (or forecast) finish, in-progress schedules only
    #[serde(default, alias = "end_date", with = "crate::dates::opt_datetime")]
    pub actual_finish: Option<NaiveDateTime>,

    /// Completion in [0, 100]; `None` counts as 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_done: Option<f64>,

    /// Duration in days; derived from the baseline when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Derived chunk assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<ChunkId>,
}

impl Task {
    /// Create a task with the given ID and no dates.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: None,
            parent_id: None,
            baseline_start: None,
            baseline_finish: None,
            actual_start: None,
            actual_finish: None,
            percent_done: None,
            duration: None,
            chunk: None,
        }
    }

    /// Progress with `None` treated as 0.
    pub fn progress(&self) -> f64 {
        self.percent_done.unwrap_or(0.0)
    }

    /// Name for messages, falling back to the ID.
    pub fn display_name(&self) -> &str {
        self.task_name.as_deref().unwrap_or(&self.task_id)
    }

    /// Whether exactly one of the baseline dates is present.
    pub fn has_partial_baseline(&self) -> bool {
        self.baseline_start.is_some() != self.baseline_finish.is_some()
    }
}

/// Per-schedule-half project metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub schedule_id: String,
    pub schedule_type: ScheduleType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(with = "crate::dates::opt_datetime")]
    pub start_date: Option<NaiveDateTime>,
    /// Target schedules only
    #[serde(with = "crate::dates::opt_datetime")]
    pub end_date: Option<NaiveDateTime>,
    /// In-progress schedules only: the "as-of" day for progress comparison
    #[serde(with = "crate::dates::opt_datetime")]
    pub reference_date: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create project metadata with no dates set.
    pub fn new(schedule_id: impl Into<String>, schedule_type: ScheduleType) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            schedule_type,
            project_name: None,
            start_date: None,
            end_date: None,
            reference_date: None,
            created_at: Utc::now(),
        }
    }
}

/// A registered domain/problem artifact pair.
///
/// `chunk == None` is the domain-only row for a schedule; it carries no
/// problem file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub schedule_id: String,
    pub chunk: Option<ChunkId>,
    pub domain_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_file: Option<PathBuf>,
    /// Hex SHA-256 of the generated text this row points at
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

/// Accept task IDs exported as numbers as well as strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Parent IDs: null, empty and spreadsheet placeholders mean "no parent".
fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    let id = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected string or number, got {}",
                other
            )));
        }
    };
    match id.as_str() {
        "" | "None" | "nan" | "NaN" => Ok(None),
        _ => Ok(Some(id)),
    }
}
