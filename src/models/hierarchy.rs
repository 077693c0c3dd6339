//! Parent/child structure of a task set.
//!
//! Summary tasks are not flagged in the source data. A task is a summary
//! task exactly when some other task names it as `parent_id`, so the set is
//! recomputed from the backlinks every time it is needed.

use std::collections::HashSet;

use super::Task;

/// IDs of every task that is referenced as a parent by another task.
pub fn summary_task_ids(tasks: &[Task]) -> HashSet<&str> {
    tasks
        .iter()
        .filter_map(|t| {
            // A self-reference does not make a task its own summary
            t.parent_id.as_deref().filter(|p| *p != t.task_id)
        })
        .collect()
}

/// Leaf tasks (tasks with no children), in input order.
pub fn leaf_tasks(tasks: &[Task]) -> Vec<&Task> {
    let summaries = summary_task_ids(tasks);
    tasks
        .iter()
        .filter(|t| !summaries.contains(t.task_id.as_str()))
        .collect()
}
