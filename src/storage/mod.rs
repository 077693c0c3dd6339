//! Storage layer for Groundwork data.
//!
//! A workspace is a directory holding:
//! - `groundwork.db` - SQLite database with schedules, projects and the
//!   artifact mapping registry
//! - `pddl/` - generated domain and problem files
//! - `groundwork.toml` - optional workspace configuration
//! - `actions.jsonl` - command audit trail
//!
//! Schedules are replaced wholesale on re-ingestion; mapping rows are
//! upserted by `(schedule_id, chunk)`.

pub mod backend;
pub mod memory;

pub use backend::{MappingRegistry, ScheduleSource};
pub use memory::MemoryStore;

use backend::sort_mappings;

use crate::dates::{STORAGE_FORMAT, format_datetime};
use crate::models::{ChunkId, Mapping, Project, ScheduleType, Task};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Database file name inside a workspace.
pub const DB_FILE: &str = "groundwork.db";

/// Directory for generated artifacts inside a workspace.
pub const ARTIFACT_DIR: &str = "pddl";

/// Storage manager for a single workspace.
pub struct Storage {
    /// Workspace directory
    pub root: PathBuf,
    /// SQLite connection
    conn: Connection,
}

/// One stored schedule half, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub schedule_id: String,
    pub schedule_type: ScheduleType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub task_count: usize,
}

impl Storage {
    /// Open storage for an initialized workspace.
    pub fn open(workspace: &Path) -> Result<Self> {
        let db_path = workspace.join(DB_FILE);
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: workspace.to_path_buf(),
            conn,
        })
    }

    /// Initialize storage for a workspace. Safe to call on an existing one.
    pub fn init(workspace: &Path) -> Result<Self> {
        fs::create_dir_all(workspace.join(ARTIFACT_DIR))?;

        let conn = Connection::open(workspace.join(DB_FILE))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: workspace.to_path_buf(),
            conn,
        })
    }

    /// Check if a workspace has been initialized.
    pub fn exists(workspace: &Path) -> bool {
        workspace.join(DB_FILE).exists()
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                schedule_id TEXT NOT NULL,
                schedule_type TEXT NOT NULL,
                project_name TEXT,
                start_date TEXT,
                end_date TEXT,
                reference_date TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (schedule_id, schedule_type)
            );

            CREATE TABLE IF NOT EXISTS tasks (
                schedule_id TEXT NOT NULL,
                schedule_type TEXT NOT NULL,
                position INTEGER NOT NULL,
                task_id TEXT NOT NULL,
                task_name TEXT,
                parent_id TEXT,
                baseline_start TEXT,
                baseline_finish TEXT,
                actual_start TEXT,
                actual_finish TEXT,
                percent_done REAL,
                duration REAL,
                PRIMARY KEY (schedule_id, schedule_type, task_id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_schedule
                ON tasks(schedule_id, schedule_type, position);

            CREATE TABLE IF NOT EXISTS pddl_mappings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                schedule_id TEXT NOT NULL,
                chunk INTEGER,
                domain_file TEXT NOT NULL,
                problem_file TEXT,
                digest TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_key
                ON pddl_mappings(schedule_id, IFNULL(chunk, -1));
            "#,
        )?;
        Ok(())
    }

    /// Get the workspace root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory generated artifacts are written to.
    pub fn artifact_dir(&self) -> PathBuf {
        self.root.join(ARTIFACT_DIR)
    }

    // === Schedule Operations ===

    /// Replace one schedule half wholesale.
    ///
    /// All tasks of `(project.schedule_id, project.schedule_type)` are
    /// deleted and `tasks` reinserted in order, and the project row is
    /// replaced, in a single transaction.
    pub fn replace_schedule(&mut self, project: &Project, tasks: &[Task]) -> Result<()> {
        let schedule_type = project.schedule_type.as_str();
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM tasks WHERE schedule_id = ?1 AND schedule_type = ?2",
            params![project.schedule_id, schedule_type],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (schedule_id, schedule_type, position, task_id, task_name,
                    parent_id, baseline_start, baseline_finish, actual_start, actual_finish,
                    percent_done, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for (position, task) in tasks.iter().enumerate() {
                stmt.execute(params![
                    project.schedule_id,
                    schedule_type,
                    position as i64,
                    task.task_id,
                    task.task_name,
                    task.parent_id,
                    date_text(&task.baseline_start),
                    date_text(&task.baseline_finish),
                    date_text(&task.actual_start),
                    date_text(&task.actual_finish),
                    task.percent_done,
                    task.duration,
                ])?;
            }
        }

        upsert_project(&tx, project)?;
        tx.commit()?;

        tracing::debug!(
            schedule_id = %project.schedule_id,
            schedule_type,
            tasks = tasks.len(),
            "replaced schedule"
        );
        Ok(())
    }

    /// Update project dates.
    ///
    /// `start`/`end` go on the target row and `reference` on the
    /// in-progress row; missing rows are created. `None` leaves a field as is.
    pub fn set_project_dates(
        &mut self,
        schedule_id: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        reference: Option<NaiveDateTime>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        if start.is_some() || end.is_some() {
            let mut project = query_project(&tx, schedule_id, ScheduleType::Target)?
                .unwrap_or_else(|| Project::new(schedule_id, ScheduleType::Target));
            if start.is_some() {
                project.start_date = start;
            }
            if end.is_some() {
                project.end_date = end;
            }
            upsert_project(&tx, &project)?;
        }

        if reference.is_some() {
            let mut project = query_project(&tx, schedule_id, ScheduleType::InProgress)?
                .unwrap_or_else(|| Project::new(schedule_id, ScheduleType::InProgress));
            project.reference_date = reference;
            upsert_project(&tx, &project)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// List all stored schedule halves.
    pub fn list_schedules(&self) -> Result<Vec<ScheduleSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.schedule_id, p.schedule_type, p.project_name,
                (SELECT COUNT(*) FROM tasks t
                 WHERE t.schedule_id = p.schedule_id AND t.schedule_type = p.schedule_type)
             FROM projects p
             ORDER BY p.schedule_id, p.schedule_type DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(schedule_id, schedule_type, project_name, count)| {
                Ok(ScheduleSummary {
                    schedule_type: parse_schedule_type(&schedule_type)?,
                    schedule_id,
                    project_name,
                    task_count: count.max(0) as usize,
                })
            })
            .collect()
    }
}

impl ScheduleSource for Storage {
    fn load_tasks(&self, schedule_id: &str, schedule_type: ScheduleType) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_id, task_name, parent_id, baseline_start, baseline_finish,
                actual_start, actual_finish, percent_done, duration
             FROM tasks
             WHERE schedule_id = ?1 AND schedule_type = ?2
             ORDER BY position",
        )?;
        let tasks = stmt
            .query_map(params![schedule_id, schedule_type.as_str()], |row| {
                Ok(Task {
                    task_id: row.get(0)?,
                    task_name: row.get(1)?,
                    parent_id: row.get(2)?,
                    baseline_start: date_column(row, 3)?,
                    baseline_finish: date_column(row, 4)?,
                    actual_start: date_column(row, 5)?,
                    actual_finish: date_column(row, 6)?,
                    percent_done: row.get(7)?,
                    duration: row.get(8)?,
                    chunk: None,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn get_project(
        &self,
        schedule_id: &str,
        schedule_type: ScheduleType,
    ) -> Result<Option<Project>> {
        query_project(&self.conn, schedule_id, schedule_type)
    }
}

impl MappingRegistry for Storage {
    fn get_mapping(&self, schedule_id: &str, chunk: Option<ChunkId>) -> Result<Option<Mapping>> {
        let mapping = self
            .conn
            .query_row(
                "SELECT schedule_id, chunk, domain_file, problem_file, digest, created_at
                 FROM pddl_mappings
                 WHERE schedule_id = ?1 AND chunk IS ?2",
                params![schedule_id, chunk.map(|c| c.index())],
                mapping_from_row,
            )
            .optional()?;
        Ok(mapping)
    }

    fn upsert_mapping(&mut self, mapping: &Mapping) -> Result<()> {
        let chunk = mapping.chunk.map(|c| c.index());
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM pddl_mappings WHERE schedule_id = ?1 AND chunk IS ?2",
            params![mapping.schedule_id, chunk],
        )?;
        tx.execute(
            "INSERT INTO pddl_mappings
                (schedule_id, chunk, domain_file, problem_file, digest, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                mapping.schedule_id,
                chunk,
                mapping.domain_file.to_string_lossy().into_owned(),
                mapping.problem_file.as_ref().map(|p| p.to_string_lossy().into_owned()),
                mapping.digest,
                mapping.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_mappings(&self, schedule_id: &str) -> Result<Vec<Mapping>> {
        let mut stmt = self.conn.prepare(
            "SELECT schedule_id, chunk, domain_file, problem_file, digest, created_at
             FROM pddl_mappings
             WHERE schedule_id = ?1",
        )?;
        let mut rows = stmt
            .query_map([schedule_id], mapping_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        sort_mappings(&mut rows);
        Ok(rows)
    }
}

fn upsert_project(conn: &Connection, project: &Project) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO projects
            (schedule_id, schedule_type, project_name, start_date, end_date, reference_date,
             created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            project.schedule_id,
            project.schedule_type.as_str(),
            project.project_name,
            date_text(&project.start_date),
            date_text(&project.end_date),
            date_text(&project.reference_date),
            project.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn query_project(
    conn: &Connection,
    schedule_id: &str,
    schedule_type: ScheduleType,
) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT project_name, start_date, end_date, reference_date, created_at
             FROM projects
             WHERE schedule_id = ?1 AND schedule_type = ?2",
            params![schedule_id, schedule_type.as_str()],
            |row| {
                Ok(Project {
                    schedule_id: schedule_id.to_string(),
                    schedule_type,
                    project_name: row.get(0)?,
                    start_date: date_column(row, 1)?,
                    end_date: date_column(row, 2)?,
                    reference_date: date_column(row, 3)?,
                    created_at: timestamp_column(row, 4)?,
                })
            },
        )
        .optional()?;
    Ok(project)
}

fn mapping_from_row(row: &Row<'_>) -> rusqlite::Result<Mapping> {
    Ok(Mapping {
        schedule_id: row.get(0)?,
        chunk: row.get::<_, Option<u32>>(1)?.map(ChunkId),
        domain_file: PathBuf::from(row.get::<_, String>(2)?),
        problem_file: row.get::<_, Option<String>>(3)?.map(PathBuf::from),
        digest: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

fn date_text(value: &Option<NaiveDateTime>) -> Option<String> {
    value.as_ref().map(format_datetime)
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| {
            NaiveDateTime::parse_from_str(&text, STORAGE_FORMAT)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
                })
        })
        .transpose()
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_schedule_type(text: &str) -> Result<ScheduleType> {
    ScheduleType::parse(text)
        .ok_or_else(|| Error::Other(format!("Unknown schedule type in database: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{day, task};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::init(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    fn mapping(chunk: Option<u32>, domain: &str) -> Mapping {
        Mapping {
            schedule_id: "S1".to_string(),
            chunk: chunk.map(ChunkId),
            domain_file: PathBuf::from(domain),
            problem_file: chunk.map(|c| PathBuf::from(format!("p{c}.pddl"))),
            digest: "d".repeat(64),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!Storage::exists(temp_dir.path()));
        assert!(matches!(Storage::open(temp_dir.path()), Err(Error::NotInitialized)));

        Storage::init(temp_dir.path()).unwrap();
        assert!(Storage::exists(temp_dir.path()));
        assert!(temp_dir.path().join(ARTIFACT_DIR).is_dir());
        assert!(Storage::open(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_replace_schedule_round_trips_in_order() {
        let (_tmp, mut storage) = create_test_storage();
        let mut b = task("B", "2025-03-06", "2025-03-10");
        b.parent_id = Some("A".to_string());
        b.percent_done = Some(40.0);
        b.actual_start = Some(day("2025-03-07"));
        let tasks = vec![
            task("Z", "2025-03-01", "2025-03-05"),
            b.clone(),
            task("A", "2025-03-01", "2025-03-10"),
        ];

        let project = Project::new("S1", ScheduleType::InProgress);
        storage.replace_schedule(&project, &tasks).unwrap();

        let loaded = storage.load_tasks("S1", ScheduleType::InProgress).unwrap();
        let ids: Vec<&str> = loaded.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "B", "A"]);
        assert_eq!(loaded[1], b);
        assert!(storage.load_tasks("S1", ScheduleType::Target).unwrap().is_empty());
    }

    #[test]
    fn test_replace_schedule_drops_old_tasks() {
        let (_tmp, mut storage) = create_test_storage();
        let project = Project::new("S1", ScheduleType::Target);
        let first = [
            task("A", "2025-01-01", "2025-01-02"),
            task("B", "2025-01-01", "2025-01-02"),
        ];
        storage.replace_schedule(&project, &first).unwrap();
        storage.replace_schedule(&project, &[task("C", "2025-01-01", "2025-01-02")]).unwrap();

        let loaded = storage.load_tasks("S1", ScheduleType::Target).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].task_id, "C");
    }

    #[test]
    fn test_set_project_dates_targets_correct_rows() {
        let (_tmp, mut storage) = create_test_storage();
        storage
            .set_project_dates("S1", Some(day("2025-01-01")), None, Some(day("2025-02-01")))
            .unwrap();
        storage.set_project_dates("S1", None, Some(day("2025-12-31")), None).unwrap();

        let target = storage.get_project("S1", ScheduleType::Target).unwrap().unwrap();
        assert_eq!(target.start_date, Some(day("2025-01-01")));
        assert_eq!(target.end_date, Some(day("2025-12-31")));
        assert_eq!(target.reference_date, None);

        let progress = storage.get_project("S1", ScheduleType::InProgress).unwrap().unwrap();
        assert_eq!(progress.reference_date, Some(day("2025-02-01")));
        assert_eq!(progress.start_date, None);
    }

    #[test]
    fn test_list_schedules_counts_tasks() {
        let (_tmp, mut storage) = create_test_storage();
        let mut project = Project::new("S1", ScheduleType::Target);
        project.project_name = Some("Depot".to_string());
        let target = [
            task("A", "2025-01-01", "2025-01-02"),
            task("B", "2025-01-03", "2025-01-04"),
        ];
        storage.replace_schedule(&project, &target).unwrap();
        storage
            .replace_schedule(
                &Project::new("S1", ScheduleType::InProgress),
                &[task("A", "2025-01-01", "2025-01-02")],
            )
            .unwrap();

        let schedules = storage.list_schedules().unwrap();
        assert_eq!(schedules.len(), 2);
        assert_eq!(schedules[0].schedule_type, ScheduleType::Target);
        assert_eq!(schedules[0].task_count, 2);
        assert_eq!(schedules[0].project_name.as_deref(), Some("Depot"));
        assert_eq!(schedules[1].schedule_type, ScheduleType::InProgress);
        assert_eq!(schedules[1].task_count, 1);
    }

    #[test]
    fn test_domain_row_is_unique() {
        let (_tmp, mut storage) = create_test_storage();
        storage.upsert_mapping(&mapping(None, "d1.pddl")).unwrap();
        storage.upsert_mapping(&mapping(None, "d2.pddl")).unwrap();

        let rows = storage.list_mappings("S1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].domain_file, PathBuf::from("d2.pddl"));
        assert!(rows[0].problem_file.is_none());
    }

    #[test]
    fn test_chunk_rows_upsert_and_order() {
        let (_tmp, mut storage) = create_test_storage();
        storage.upsert_mapping(&mapping(Some(1), "d.pddl")).unwrap();
        storage.upsert_mapping(&mapping(Some(0), "d.pddl")).unwrap();
        storage.upsert_mapping(&mapping(None, "d.pddl")).unwrap();
        storage.upsert_mapping(&mapping(Some(1), "d2.pddl")).unwrap();

        let rows = storage.list_mappings("S1").unwrap();
        let chunks: Vec<Option<ChunkId>> = rows.iter().map(|m| m.chunk).collect();
        assert_eq!(chunks, vec![None, Some(ChunkId(0)), Some(ChunkId(1))]);
        assert_eq!(rows[2].domain_file, PathBuf::from("d2.pddl"));

        let got = storage.get_mapping("S1", Some(ChunkId(0))).unwrap().unwrap();
        assert_eq!(got.problem_file, Some(PathBuf::from("p0.pddl")));
        assert!(storage.get_mapping("S1", Some(ChunkId(5))).unwrap().is_none());
        assert!(storage.get_mapping("other", None).unwrap().is_none());
    }

    #[test]
    fn test_mappings_survive_reopen() {
        let (tmp, mut storage) = create_test_storage();
        storage.upsert_mapping(&mapping(None, "d.pddl")).unwrap();
        drop(storage);

        let storage = Storage::open(tmp.path()).unwrap();
        assert_eq!(storage.list_mappings("S1").unwrap().len(), 1);
    }
}
