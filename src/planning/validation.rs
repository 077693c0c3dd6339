//! Input checks run before any planning artifact is generated.
//!
//! A failed check aborts the compile for the whole schedule; nothing is
//! written or registered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::names::collision_key;
use crate::models::Task;
use crate::{Error, Result};

/// How to treat a task that has only one of its two baseline dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselinePolicy {
    /// Reject the schedule
    #[default]
    Strict,
    /// Fill the missing side from the actual start/finish, then reject if
    /// the pair is still incomplete
    FallbackToActual,
}

impl BaselinePolicy {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "fallback-to-actual" | "fallback" | "actual" => Some(Self::FallbackToActual),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::FallbackToActual => "fallback-to-actual",
        }
    }
}

impl fmt::Display for BaselinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Apply `policy` to the baseline pairs in place.
pub fn normalize_baselines(tasks: &mut [Task], policy: BaselinePolicy) -> Result<()> {
    if policy == BaselinePolicy::FallbackToActual {
        for task in tasks.iter_mut().filter(|t| t.has_partial_baseline()) {
            if task.baseline_start.is_none() {
                task.baseline_start = task.actual_start;
            }
            if task.baseline_finish.is_none() {
                task.baseline_finish = task.actual_finish;
            }
        }
    }
    check_baselines(tasks)
}

/// Reject any task with exactly one baseline date.
pub fn check_baselines(tasks: &[Task]) -> Result<()> {
    match tasks.iter().find(|t| t.has_partial_baseline()) {
        Some(task) => {
            let (present, missing) = if task.baseline_start.is_some() {
                ("start", "finish")
            } else {
                ("finish", "start")
            };
            Err(Error::Validation(format!(
                "Task {} has a baseline {} but no baseline {}",
                task.task_id, present, missing
            )))
        }
        None => Ok(()),
    }
}

/// Reject duplicate task IDs and IDs that collide once turned into
/// planner identifiers.
pub fn check_identifiers(tasks: &[Task]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for task in tasks {
        if let Some(previous) = seen.insert(collision_key(&task.task_id), &task.task_id) {
            let msg = if previous == task.task_id {
                format!("Duplicate task id: {}", task.task_id)
            } else {
                format!(
                    "Task ids {} and {} map to the same planner identifier",
                    previous, task.task_id
                )
            };
            return Err(Error::Validation(msg));
        }
    }
    Ok(())
}

/// Reject an empty task set for a schedule-wide operation.
pub fn check_not_empty(schedule_id: &str, tasks: &[Task]) -> Result<()> {
    if tasks.is_empty() {
        return Err(Error::Validation(format!(
            "No target tasks found for schedule {}",
            schedule_id
        )));
    }
    Ok(())
}
