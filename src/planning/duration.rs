//! Task duration resolution.
//!
//! Durative actions with zero or negative length are rejected by temporal
//! planners, so every task must resolve to a strictly positive duration.

use crate::dates::days_between;
use crate::models::Task;

/// Duration used when neither an explicit duration nor a usable baseline
/// window is available.
pub const DEFAULT_DURATION_DAYS: f64 = 1.0;

/// Resolve a task's duration in days using [`DEFAULT_DURATION_DAYS`].
pub fn resolve_duration(task: &Task) -> f64 {
    resolve_duration_with_default(task, DEFAULT_DURATION_DAYS)
}

/// Resolve a task's duration in days.
///
/// 1. An explicit positive `duration` is returned unchanged.
/// 2. Otherwise a baseline window with `finish > start` gives its length.
/// 3. Otherwise `default_days`.
///
/// A non-positive `default_days` is replaced by [`DEFAULT_DURATION_DAYS`],
/// so the result is always finite and > 0.
pub fn resolve_duration_with_default(task: &Task, default_days: f64) -> f64 {
    if let Some(d) = task.duration.filter(|d| is_positive(*d)) {
        return d;
    }

    if let (Some(start), Some(finish)) = (&task.baseline_start, &task.baseline_finish) {
        let days = days_between(start, finish);
        if is_positive(days) {
            return days;
        }
    }

    if is_positive(default_days) {
        default_days
    } else {
        DEFAULT_DURATION_DAYS
    }
}

/// Write the resolved duration into every task.
pub fn resolve_durations(tasks: &mut [Task], default_days: f64) {
    for task in tasks.iter_mut() {
        task.duration = Some(resolve_duration_with_default(task, default_days));
    }
}

fn is_positive(d: f64) -> bool {
    d.is_finite() && d > 0.0
}
