//! Baseline progress analysis.
//!
//! Compares an in-progress snapshot against the target schedule. Each
//! matched task's reported `percent_done` is checked against the share of
//! its baseline window that has elapsed on the reference day.

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::Result;
use crate::dates::days_between;
use crate::models::{ScheduleType, Task};
use crate::storage::ScheduleSource;

/// Message used when every matched task is on pace.
pub const NO_DEVIATIONS: &str = "No major schedule deviations detected.";

/// Expected completion in [0, 100] on `reference_day`.
///
/// Missing dates give 0. An interval with `finish <= start` counts as
/// already complete.
pub fn expected_percent_done(
    baseline_start: Option<NaiveDateTime>,
    baseline_finish: Option<NaiveDateTime>,
    reference_day: NaiveDateTime,
) -> f64 {
    let (Some(start), Some(finish)) = (baseline_start, baseline_finish) else {
        return 0.0;
    };
    if finish <= start {
        return 100.0;
    }
    if reference_day < start {
        return 0.0;
    }
    if reference_day >= finish {
        return 100.0;
    }

    let elapsed = days_between(&start, &reference_day);
    let total = days_between(&start, &finish);
    (100.0 * elapsed / total).clamp(0.0, 100.0)
}

/// Kind of deviation an insight reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Behind,
    Ahead,
    /// Nothing to report
    Info,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Behind => "behind",
            Self::Ahead => "ahead",
            Self::Info => "info",
        };
        write!(f, "{}", s)
    }
}

/// One line of analysis output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
    pub message: String,
}

impl Insight {
    fn deviation(kind: InsightKind, task: &Task, name: &str, actual: f64, expected: f64) -> Self {
        let direction = match kind {
            InsightKind::Ahead => "ahead of",
            _ => "behind",
        };
        Self {
            kind,
            task_id: Some(task.task_id.clone()),
            actual: Some(actual),
            expected: Some(expected),
            message: format!(
                "Task '{}' is {} schedule (progress: {:.1}%, expected: {:.1}%).",
                name, direction, actual, expected
            ),
        }
    }

    fn no_deviations() -> Self {
        Self {
            kind: InsightKind::Info,
            task_id: None,
            actual: None,
            expected: None,
            message: NO_DEVIATIONS.to_string(),
        }
    }
}

/// Result of [`analyze_progress`].
///
/// Missing schedule halves are reported as `Failed` rather than as an
/// error, and serialize as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProgressOutcome {
    Report {
        schedule_id: String,
        reference_day: NaiveDateTime,
        insights: Vec<Insight>,
    },
    Failed {
        error: String,
    },
}

impl ProgressOutcome {
    /// Whether this outcome is a failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Compare target and in-progress task sets for a schedule.
///
/// The reference day is the in-progress project's `reference_date`, or the
/// current time when unset. Insights follow target order; tasks missing
/// from the in-progress set are skipped.
///
/// # Errors
/// Only backend failures. Missing schedule halves produce
/// [`ProgressOutcome::Failed`].
pub fn analyze_progress(source: &dyn ScheduleSource, schedule_id: &str) -> Result<ProgressOutcome> {
    analyze_progress_at(source, schedule_id, Utc::now().naive_utc())
}

/// [`analyze_progress`] with an explicit fallback for the reference day.
pub fn analyze_progress_at(
    source: &dyn ScheduleSource,
    schedule_id: &str,
    now: NaiveDateTime,
) -> Result<ProgressOutcome> {
    let target = source.load_tasks(schedule_id, ScheduleType::Target)?;
    let progress = source.load_tasks(schedule_id, ScheduleType::InProgress)?;
    if target.is_empty() || progress.is_empty() {
        tracing::debug!(
            schedule_id,
            target = target.len(),
            in_progress = progress.len(),
            "cannot analyze: missing schedule half"
        );
        return Ok(ProgressOutcome::Failed {
            error: format!("Target or in-progress schedule not found for {}", schedule_id),
        });
    }

    let reference_day = source
        .get_project(schedule_id, ScheduleType::InProgress)?
        .and_then(|p| p.reference_date)
        .unwrap_or(now);

    let insights = compare(&target, &progress, reference_day);
    tracing::debug!(schedule_id, %reference_day, insights = insights.len(), "analyzed progress");

    Ok(ProgressOutcome::Report {
        schedule_id: schedule_id.to_string(),
        reference_day,
        insights,
    })
}

/// Deviation insights for `progress` against `target`, never empty.
pub fn compare(target: &[Task], progress: &[Task], reference_day: NaiveDateTime) -> Vec<Insight> {
    let by_id: HashMap<&str, &Task> = progress.iter().map(|t| (t.task_id.as_str(), t)).collect();

    let mut insights = Vec::new();
    for planned in target {
        let Some(current) = by_id.get(planned.task_id.as_str()) else {
            continue;
        };
        let expected =
            expected_percent_done(planned.baseline_start, planned.baseline_finish, reference_day);
        let actual = current.progress();
        let name = current.task_name.as_deref().unwrap_or(planned.display_name());

        if actual < expected {
            insights.push(Insight::deviation(InsightKind::Behind, planned, name, actual, expected));
        } else if actual > expected {
            insights.push(Insight::deviation(InsightKind::Ahead, planned, name, actual, expected));
        }
    }

    if insights.is_empty() {
        insights.push(Insight::no_deviations());
    }
    insights
}
