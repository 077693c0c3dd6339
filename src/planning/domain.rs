//! Planning domain generation.
//!
//! The domain declares the `task`/`chunk` types, the three predicates and
//! one durative action per leaf task. Summary tasks are left out so their
//! aggregate work is not booked twice.

use std::fmt::Write;

use super::duration::resolve_duration;
use super::names::{action_name, format_days, task_object};
use super::validation::{check_baselines, check_identifiers};
use crate::models::{Task, leaf_tasks};
use crate::{Error, Result};

/// Name of the generated domain.
pub const DOMAIN_NAME: &str = "construction";

/// Render the planning domain for a chunk-assigned task set.
///
/// Output depends only on `tasks`: the same input always yields the same
/// bytes.
///
/// # Errors
/// - `Validation` if a task has exactly one baseline date or two task ids
///   collide as planner identifiers
/// - `InvalidInput` if a leaf task has no chunk assignment
pub fn compile_domain(tasks: &[Task]) -> Result<String> {
    check_baselines(tasks)?;
    check_identifiers(tasks)?;

    let mut out = String::new();
    let _ = writeln!(out, "(define (domain {})", DOMAIN_NAME);
    out.push_str("  (:requirements :typing :durative-actions :fluents :negative-preconditions)\n");
    out.push_str("  (:types task chunk)\n");
    out.push_str("  (:predicates\n");
    out.push_str("    (done ?t - task)\n");
    out.push_str("    (in-chunk ?t - task ?c - chunk)\n");
    out.push_str("    (chunk-order ?c1 - chunk ?c2 - chunk)\n");
    out.push_str("  )\n");

    for task in leaf_tasks(tasks) {
        let chunk = task.chunk.ok_or_else(|| {
            Error::InvalidInput(format!("Task {} has no chunk assignment", task.task_id))
        })?;
        let object = task_object(&task.task_id);

        let _ = writeln!(out, "  (:durative-action {}", action_name(&task.task_id));
        out.push_str("    :parameters ()\n");
        let _ = writeln!(
            out,
            "    :duration (= ?duration {})",
            format_days(resolve_duration(task))
        );
        out.push_str("    :condition (and\n");
        let _ = writeln!(out, "      (at start (in-chunk {} {}))", object, chunk);
        let _ = writeln!(out, "      (at start (not (done {})))", object);
        out.push_str("    )\n");
        let _ = writeln!(out, "    :effect (at end (done {}))", object);
        out.push_str("  )\n");
    }

    out.push_str(")\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkId;
    use crate::test_utils::task;

    fn chunked(id: &str, start: &str, finish: &str, chunk: u32) -> Task {
        let mut t = task(id, start, finish);
        t.chunk = Some(ChunkId(chunk));
        t
    }

    #[test]
    fn test_header_declares_types_and_predicates() {
        let domain = compile_domain(&[chunked("T1", "2025-03-01", "2025-03-05", 0)]).unwrap();
        assert!(domain.starts_with("(define (domain construction)"));
        assert!(domain.contains(":durative-actions"));
        assert!(domain.contains(":fluents"));
        assert!(domain.contains("(:types task chunk)"));
        assert!(domain.contains("(done ?t - task)"));
        assert!(domain.contains("(in-chunk ?t - task ?c - chunk)"));
        assert!(domain.contains("(chunk-order ?c1 - chunk ?c2 - chunk)"));
    }

    #[test]
    fn test_one_action_per_leaf() {
        let mut parent = chunked("P", "2025-03-01", "2025-03-10", 0);
        parent.duration = Some(9.0);
        let mut a = chunked("A", "2025-03-01", "2025-03-05", 0);
        a.parent_id = Some("P".to_string());
        let mut b = chunked("B", "2025-03-30", "2025-04-02", 1);
        b.parent_id = Some("P".to_string());

        let domain = compile_domain(&[parent, a, b]).unwrap();
        assert_eq!(domain.matches("(:durative-action ").count(), 2);
        assert!(!domain.contains("do_P"));
        assert!(domain.contains("(:durative-action do_A"));
        assert!(domain.contains("(at start (in-chunk t_B chunk_1))"));
    }

    #[test]
    fn test_action_body() {
        let domain = compile_domain(&[chunked("T1", "2025-03-01", "2025-03-05", 0)]).unwrap();
        let expected = concat!(
            "  (:durative-action do_T1\n",
            "    :parameters ()\n",
            "    :duration (= ?duration 4)\n",
            "    :condition (and\n",
            "      (at start (in-chunk t_T1 chunk_0))\n",
            "      (at start (not (done t_T1)))\n",
            "    )\n",
            "    :effect (at end (done t_T1))\n",
            "  )\n",
        );
        assert!(domain.contains(expected), "{domain}");
    }

    #[test]
    fn test_short_windows_never_render_zero_duration() {
        let mut seconds = Task::new("S");
        seconds.baseline_start = crate::dates::parse_user_date("2025-03-01 00:00:00");
        seconds.baseline_finish = crate::dates::parse_user_date("2025-03-01 00:00:03");
        seconds.chunk = Some(ChunkId(0));
        let mut tiny = Task::new("X");
        tiny.duration = Some(0.00001);
        tiny.chunk = Some(ChunkId(0));

        let domain = compile_domain(&[seconds, tiny]).unwrap();
        assert!(!domain.contains("(= ?duration 0)"), "{domain}");
        assert!(domain.contains("(= ?duration 0.00001)"));
    }

    #[test]
    fn test_missing_dates_use_default_duration() {
        let mut t = Task::new("T9");
        t.chunk = Some(ChunkId(0));
        let domain = compile_domain(&[t]).unwrap();
        assert!(domain.contains("(= ?duration 1)"));
    }

    #[test]
    fn test_byte_identical_on_repeat() {
        let tasks = vec![
            chunked("T1", "2025-03-01", "2025-03-05", 0),
            chunked("T2", "2025-03-06", "2025-03-10", 0),
        ];
        assert_eq!(compile_domain(&tasks).unwrap(), compile_domain(&tasks).unwrap());
    }

    #[test]
    fn test_partial_baseline_is_validation_error() {
        let mut t = chunked("T1", "2025-03-01", "2025-03-05", 0);
        t.baseline_finish = None;
        assert!(matches!(compile_domain(&[t]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unassigned_chunk_rejected() {
        let t = task("T1", "2025-03-01", "2025-03-05");
        assert!(matches!(compile_domain(&[t]), Err(Error::InvalidInput(_))));
    }
}
