//! Per-chunk planning problem generation.
//!
//! A problem for chunk `k` treats every task in an earlier chunk as already
//! done, makes the tasks of chunk `k` the goal, and leaves later chunks out
//! entirely. Recompiling chunk by chunk therefore grows a solved prefix plus
//! one live horizon, and each planner call stays bounded in size.

use std::fmt::Write;

use super::domain::DOMAIN_NAME;
use super::names::{problem_name, task_object};
use super::validation::check_identifiers;
use crate::models::{ChunkId, Task, leaf_tasks};
use crate::{Error, Result};

/// Leaf tasks split around a target chunk.
#[derive(Debug)]
pub struct ProblemScope<'a> {
    /// Tasks in chunks strictly before the target, asserted done
    pub done: Vec<&'a Task>,
    /// Tasks in the target chunk, the goal
    pub live: Vec<&'a Task>,
    /// Chunks up to and including the target, ascending
    pub chunks: Vec<ChunkId>,
}

/// Split the leaf tasks of `tasks` around `target`.
///
/// # Errors
/// - `InvalidInput` if `target` is not one of `chunks`, or a leaf task has
///   no chunk assignment
pub fn scope_problem<'a>(
    tasks: &'a [Task],
    chunks: &[ChunkId],
    target: ChunkId,
) -> Result<ProblemScope<'a>> {
    if !chunks.contains(&target) {
        return Err(Error::InvalidInput(format!(
            "{} is not an assigned chunk",
            target
        )));
    }

    let mut done = Vec::new();
    let mut live = Vec::new();
    for task in leaf_tasks(tasks) {
        let chunk = task.chunk.ok_or_else(|| {
            Error::InvalidInput(format!("Task {} has no chunk assignment", task.task_id))
        })?;
        if chunk < target {
            done.push(task);
        } else if chunk == target {
            live.push(task);
        }
    }

    let mut included: Vec<ChunkId> = chunks.iter().copied().filter(|c| *c <= target).collect();
    included.sort();
    included.dedup();

    Ok(ProblemScope {
        done,
        live,
        chunks: included,
    })
}

/// Render the planning problem for `target`.
///
/// # Errors
/// - `Validation` if two task ids collide as planner identifiers
/// - `InvalidInput` as for [`scope_problem`]
pub fn compile_problem(
    schedule_id: &str,
    tasks: &[Task],
    chunks: &[ChunkId],
    target: ChunkId,
) -> Result<String> {
    check_identifiers(tasks)?;
    let scope = scope_problem(tasks, chunks, target)?;

    let mut out = String::new();
    let _ = writeln!(out, "(define (problem {})", problem_name(schedule_id, target));
    let _ = writeln!(out, "  (:domain {})", DOMAIN_NAME);

    out.push_str("  (:objects\n");
    for task in scope.done.iter().chain(scope.live.iter()) {
        let _ = writeln!(out, "    {} - task", task_object(&task.task_id));
    }
    for chunk in &scope.chunks {
        let _ = writeln!(out, "    {} - chunk", chunk);
    }
    out.push_str("  )\n");

    out.push_str("  (:init\n");
    for task in &scope.done {
        let _ = writeln!(out, "    (done {})", task_object(&task.task_id));
    }
    for task in &scope.live {
        let _ = writeln!(out, "    (in-chunk {} {})", task_object(&task.task_id), target);
    }
    for pair in scope.chunks.windows(2) {
        let _ = writeln!(out, "    (chunk-order {} {})", pair[0], pair[1]);
    }
    out.push_str("  )\n");

    out.push_str("  (:goal (and\n");
    for task in &scope.live {
        let _ = writeln!(out, "    (done {})", task_object(&task.task_id));
    }
    out.push_str("  ))\n");
    out.push_str(")\n");

    tracing::debug!(
        schedule_id,
        chunk = %target,
        done = scope.done.len(),
        live = scope.live.len(),
        "compiled problem"
    );
    Ok(out)
}
