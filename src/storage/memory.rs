//! In-memory storage.
//!
//! Holds schedules and mapping rows in plain maps. Useful for library
//! callers that drive the compilers without a workspace, and for tests.

use std::collections::HashMap;

use super::backend::{MappingRegistry, ScheduleSource, sort_mappings};
use crate::Result;
use crate::models::{ChunkId, Mapping, Project, ScheduleType, Task};

type ScheduleKey = (String, ScheduleType);

/// Schedules and mapping rows kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: HashMap<ScheduleKey, Vec<Task>>,
    projects: HashMap<ScheduleKey, Project>,
    mappings: HashMap<(String, Option<ChunkId>), Mapping>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one schedule half wholesale.
    pub fn replace_schedule(&mut self, project: Project, tasks: Vec<Task>) {
        let key = (project.schedule_id.clone(), project.schedule_type);
        self.tasks.insert(key.clone(), tasks);
        self.projects.insert(key, project);
    }
}

impl MappingRegistry for MemoryStore {
    fn get_mapping(&self, schedule_id: &str, chunk: Option<ChunkId>) -> Result<Option<Mapping>> {
        Ok(self.mappings.get(&(schedule_id.to_string(), chunk)).cloned())
    }

    fn upsert_mapping(&mut self, mapping: &Mapping) -> Result<()> {
        self.mappings.insert(
            (mapping.schedule_id.clone(), mapping.chunk),
            mapping.clone(),
        );
        Ok(())
    }

    fn list_mappings(&self, schedule_id: &str) -> Result<Vec<Mapping>> {
        let mut rows: Vec<Mapping> = self
            .mappings
            .values()
            .filter(|m| m.schedule_id == schedule_id)
            .cloned()
            .collect();
        sort_mappings(&mut rows);
        Ok(rows)
    }
}

impl ScheduleSource for MemoryStore {
    fn load_tasks(&self, schedule_id: &str, schedule_type: ScheduleType) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .get(&(schedule_id.to_string(), schedule_type))
            .cloned()
            .unwrap_or_default())
    }

    fn get_project(
        &self,
        schedule_id: &str,
        schedule_type: ScheduleType,
    ) -> Result<Option<Project>> {
        Ok(self
            .projects
            .get(&(schedule_id.to_string(), schedule_type))
            .cloned())
    }
}
