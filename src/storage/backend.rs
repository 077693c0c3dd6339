//! Storage traits consumed by the compilers and the analyzer.
//!
//! - `MappingRegistry` - `(schedule_id, chunk) -> artifact files`, upserted
//! - `ScheduleSource` - read access to stored task sets and project dates
//!
//! `Storage` implements both on SQLite; `MemoryStore` implements both in
//! memory for library callers and tests.

use crate::models::{ChunkId, Mapping, Project, ScheduleType, Task};
use crate::{Error, Result};

/// Registry of generated domain/problem files.
///
/// Rows are keyed by `(schedule_id, chunk)`; `chunk == None` is the
/// domain-only row. Upserts are last-writer-wins and never leave two rows
/// for the same key.
pub trait MappingRegistry {
    /// Get the row for a key, if any.
    fn get_mapping(&self, schedule_id: &str, chunk: Option<ChunkId>) -> Result<Option<Mapping>>;

    /// Insert or replace the row for `mapping`'s key.
    fn upsert_mapping(&mut self, mapping: &Mapping) -> Result<()>;

    /// All rows for a schedule, domain row first, then chunks ascending.
    fn list_mappings(&self, schedule_id: &str) -> Result<Vec<Mapping>>;

    /// Get the row for a key or fail with `NotFound`.
    fn require_mapping(&self, schedule_id: &str, chunk: Option<ChunkId>) -> Result<Mapping> {
        self.get_mapping(schedule_id, chunk)?.ok_or_else(|| {
            let key = chunk.map_or_else(|| "domain".to_string(), |c| c.to_string());
            Error::NotFound(format!("No mapping for schedule {} ({})", schedule_id, key))
        })
    }
}

/// Read access to stored schedules.
pub trait ScheduleSource {
    /// Tasks of one schedule half in ingestion order. Empty when absent.
    fn load_tasks(&self, schedule_id: &str, schedule_type: ScheduleType) -> Result<Vec<Task>>;

    /// Project metadata of one schedule half, if stored.
    fn get_project(&self, schedule_id: &str, schedule_type: ScheduleType)
    -> Result<Option<Project>>;
}

/// Order rows as `list_mappings` promises: domain row, then chunks.
pub(crate) fn sort_mappings(rows: &mut [Mapping]) {
    rows.sort_by_key(|m| m.chunk.map_or(-1, |c| i64::from(c.index())));
}
