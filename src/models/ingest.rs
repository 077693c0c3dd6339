//! Normalized schedule files handed over by the ingestion collaborator.
//!
//! Spreadsheet parsing happens upstream; what arrives here is JSON, either
//! an object carrying project dates plus a `tasks` array, or a bare array of
//! task records.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::{Project, ScheduleType, Task};
use crate::{Error, Result};

/// A schedule half as delivered by ingestion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleFile {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default, alias = "project_start_date", with = "crate::dates::opt_datetime")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default, alias = "project_end_date", with = "crate::dates::opt_datetime")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(
        default,
        alias = "current_in_progress_date",
        with = "crate::dates::opt_datetime"
    )]
    pub reference_date: Option<NaiveDateTime>,
    pub tasks: Vec<Task>,
}

impl ScheduleFile {
    /// Parse a schedule file from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let unreadable = |e: serde_json::Error| {
            Error::InvalidInput(format!("Unreadable schedule file: {}", e))
        };
        let value: serde_json::Value = serde_json::from_str(text).map_err(unreadable)?;
        let file = if value.is_array() {
            ScheduleFile {
                tasks: serde_json::from_value(value).map_err(unreadable)?,
                ..Default::default()
            }
        } else {
            serde_json::from_value(value).map_err(unreadable)?
        };
        file.check_unique_ids()?;
        file.check_percent_done()?;
        Ok(file)
    }

    /// Read and parse a schedule file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Project metadata for the given schedule half.
    ///
    /// End dates only apply to target schedules and reference dates only to
    /// in-progress schedules; the other field is dropped.
    pub fn project(&self, schedule_id: &str, schedule_type: ScheduleType) -> Project {
        let mut project = Project::new(schedule_id, schedule_type);
        project.project_name = self.project_name.clone();
        project.start_date = self.start_date;
        match schedule_type {
            ScheduleType::Target => project.end_date = self.end_date,
            ScheduleType::InProgress => project.reference_date = self.reference_date,
        }
        project
    }

    fn check_percent_done(&self) -> Result<()> {
        for task in &self.tasks {
            if let Some(percent) = task.percent_done {
                if !(0.0..=100.0).contains(&percent) {
                    return Err(Error::InvalidInput(format!(
                        "Task {} has percent_done {} outside 0..=100",
                        task.task_id, percent
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.task_id.is_empty() {
                return Err(Error::InvalidInput("Task with empty task_id".to_string()));
            }
            if !seen.insert(task.task_id.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "Duplicate task_id in schedule file: {}",
                    task.task_id
                )));
            }
        }
        Ok(())
    }
}
