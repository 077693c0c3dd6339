//! Chunk assignment.
//!
//! Tasks are bucketed into fixed-length windows counted from the anchor,
//! the earliest baseline start in the set. A task's chunk is
//! `floor(days(anchor, baseline_start) / chunk_length_days)`.

use chrono::NaiveDateTime;
use std::collections::BTreeSet;

use crate::dates::days_between;
use crate::models::{ChunkId, Task};

/// Default chunk length in days.
pub const DEFAULT_CHUNK_LENGTH_DAYS: u32 = 28;

/// Earliest baseline start among tasks that have one.
pub fn schedule_anchor(tasks: &[Task]) -> Option<NaiveDateTime> {
    tasks.iter().filter_map(|t| t.baseline_start).min()
}

/// Chunk index of `at` relative to `anchor`. Instants before the anchor
/// fall into chunk 0.
pub fn chunk_for(anchor: &NaiveDateTime, at: &NaiveDateTime, chunk_length_days: u32) -> ChunkId {
    let length = f64::from(chunk_length_days.max(1));
    let index = (days_between(anchor, at) / length).floor();
    if index <= 0.0 {
        ChunkId(0)
    } else {
        ChunkId(index.min(f64::from(u32::MAX)) as u32)
    }
}

/// Assign a chunk to every task and return the distinct chunks used, in
/// ascending order.
///
/// Tasks without a baseline start land in chunk 0. When no task has one,
/// `now` stands in as the anchor and everything is chunk 0.
pub fn assign_chunks(
    tasks: &mut [Task],
    chunk_length_days: u32,
    now: NaiveDateTime,
) -> Vec<ChunkId> {
    let anchor = schedule_anchor(tasks);
    if anchor.is_none() && !tasks.is_empty() {
        tracing::debug!(anchor = %now, "no baseline start found; all tasks in chunk 0");
    }
    let anchor = anchor.unwrap_or(now);

    let mut used = BTreeSet::new();
    for task in tasks.iter_mut() {
        let chunk = match &task.baseline_start {
            Some(start) => chunk_for(&anchor, start, chunk_length_days),
            None => ChunkId(0),
        };
        task.chunk = Some(chunk);
        used.insert(chunk);
    }

    tracing::debug!(
        %anchor,
        chunk_length_days,
        tasks = tasks.len(),
        chunks = used.len(),
        "assigned chunks"
    );
    used.into_iter().collect()
}

/// The chunk that is live on `reference_day`.
///
/// This is the largest used chunk whose index does not exceed the
/// reference day's bucket, or the first used chunk when the reference day
/// precedes all of them. Returns `None` only when `chunks` is empty.
pub fn current_chunk(
    anchor: &NaiveDateTime,
    reference_day: &NaiveDateTime,
    chunk_length_days: u32,
    chunks: &[ChunkId],
) -> Option<ChunkId> {
    let bucket = chunk_for(anchor, reference_day, chunk_length_days);
    chunks
        .iter()
        .copied()
        .filter(|c| *c <= bucket)
        .max()
        .or_else(|| chunks.iter().copied().min())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{day, task};

    #[test]
    fn test_both_tasks_in_first_chunk() {
        let mut tasks = vec![
            task("T1", "2025-03-01", "2025-03-05"),
            task("T2", "2025-03-06", "2025-03-10"),
        ];
        let chunks = assign_chunks(&mut tasks, 28, day("2030-01-01"));
        assert_eq!(chunks, vec![ChunkId(0)]);
        assert_eq!(tasks[0].chunk, Some(ChunkId(0)));
        assert_eq!(tasks[1].chunk, Some(ChunkId(0)));
    }

    #[test]
    fn test_floor_of_days_over_length() {
        let mut tasks = vec![
            task("A", "2025-01-01", "2025-01-02"),
            task("B", "2025-01-07", "2025-01-08"),
            task("C", "2025-01-08", "2025-01-09"),
            task("D", "2025-01-29", "2025-01-30"),
        ];
        let chunks = assign_chunks(&mut tasks, 7, day("2030-01-01"));
        let got: Vec<u32> = tasks.iter().map(|t| t.chunk.unwrap().index()).collect();
        assert_eq!(got, vec![0, 0, 1, 4]);
        assert_eq!(chunks, vec![ChunkId(0), ChunkId(1), ChunkId(4)]);
    }

    #[test]
    fn test_anchor_is_minimum_regardless_of_order() {
        let mut tasks = vec![
            task("late", "2025-03-30", "2025-04-02"),
            task("early", "2025-03-01", "2025-03-02"),
        ];
        assign_chunks(&mut tasks, 28, day("2030-01-01"));
        assert_eq!(tasks[0].chunk, Some(ChunkId(1)));
        assert_eq!(tasks[1].chunk, Some(ChunkId(0)));
    }

    #[test]
    fn test_tasks_without_start_default_to_zero() {
        let mut tasks = vec![task("A", "2025-03-01", "2025-03-02"), Task::new("B")];
        let mut undated = Task::new("C");
        undated.baseline_finish = Some(day("2025-12-01"));
        tasks.push(undated);
        assign_chunks(&mut tasks, 28, day("2030-01-01"));
        assert_eq!(tasks[1].chunk, Some(ChunkId(0)));
        assert_eq!(tasks[2].chunk, Some(ChunkId(0)));
    }

    #[test]
    fn test_no_baseline_anywhere_uses_now() {
        let mut tasks = vec![Task::new("A"), Task::new("B")];
        let chunks = assign_chunks(&mut tasks, 28, day("2025-01-01"));
        assert_eq!(chunks, vec![ChunkId(0)]);
        assert!(tasks.iter().all(|t| t.chunk == Some(ChunkId(0))));
    }

    #[test]
    fn test_empty_task_set() {
        let mut tasks: Vec<Task> = Vec::new();
        assert!(assign_chunks(&mut tasks, 28, day("2025-01-01")).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            vec![
                task("A", "2025-01-01", "2025-01-02"),
                task("B", "2025-02-15", "2025-02-20"),
                task("C", "2025-05-01", "2025-05-03"),
            ]
        };
        let mut first = build();
        let mut second = build();
        let a = assign_chunks(&mut first, 14, day("2030-01-01"));
        let b = assign_chunks(&mut second, 14, day("2031-06-01"));
        assert_eq!(a, b);
        assert_eq!(first, second);
    }

    #[test]
    fn test_current_chunk() {
        let anchor = day("2025-01-01");
        let chunks = [ChunkId(0), ChunkId(2), ChunkId(5)];
        assert_eq!(current_chunk(&anchor, &day("2025-01-10"), 7, &chunks), Some(ChunkId(0)));
        assert_eq!(current_chunk(&anchor, &day("2025-01-20"), 7, &chunks), Some(ChunkId(2)));
        assert_eq!(current_chunk(&anchor, &day("2025-01-30"), 7, &chunks), Some(ChunkId(2)));
        assert_eq!(current_chunk(&anchor, &day("2026-01-01"), 7, &chunks), Some(ChunkId(5)));
        assert_eq!(current_chunk(&anchor, &day("2024-12-01"), 7, &chunks), Some(ChunkId(0)));
        assert_eq!(current_chunk(&anchor, &day("2025-01-10"), 7, &[]), None);
    }

    #[test]
    fn test_current_chunk_before_first_used() {
        let anchor = day("2025-01-01");
        let chunks = [ChunkId(3)];
        assert_eq!(current_chunk(&anchor, &day("2025-01-02"), 7, &chunks), Some(ChunkId(3)));
    }
}
