//! Command implementations for the Groundwork CLI.
//!
//! Each command returns a result struct implementing [`Output`], so the
//! binary can print it as JSON (default) or as text (`-H`):
//! - `init` - create a workspace
//! - `ingest` - replace a schedule half, then compile
//! - `compile_*` - generate and register planning artifacts
//! - `chunks` / `mappings` / `schedules` - inspection
//! - `analyze` - progress against the baseline
//! - `plan` - run the external planner

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::analysis::{self, ProgressOutcome};
use crate::config::{Resolved, ResolvedConfig, write_default_config};
use crate::dates::{format_datetime, parse_user_date};
use crate::models::{ChunkId, Mapping, ScheduleFile, ScheduleType, summary_task_ids};
use crate::planner::{Plan, Planner};
use crate::planning::{CompiledArtifact, PlanningSession, PreparedSchedule};
use crate::storage::{MappingRegistry, ScheduleSource, ScheduleSummary, Storage};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

fn optional_date(value: &Option<NaiveDateTime>) -> String {
    value.as_ref().map_or_else(|| "-".to_string(), format_datetime)
}

fn parse_schedule_type(text: &str) -> Result<ScheduleType> {
    ScheduleType::parse(text).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unknown schedule type: {} (expected target or in-progress)",
            text
        ))
    })
}

fn parse_date_arg(flag: &str, value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    value
        .map(|text| {
            parse_user_date(text).ok_or_else(|| {
                Error::InvalidInput(format!("Invalid date for --{}: {}", flag, text))
            })
        })
        .transpose()
}

/// The in-progress reference date, or now.
fn reference_day(storage: &Storage, schedule_id: &str) -> Result<NaiveDateTime> {
    Ok(storage
        .get_project(schedule_id, ScheduleType::InProgress)?
        .and_then(|p| p.reference_date)
        .unwrap_or_else(|| Utc::now().naive_utc()))
}

/// Load and prepare the target task set of a schedule.
fn prepare_target(
    storage: &Storage,
    schedule_id: &str,
    config: &ResolvedConfig,
) -> Result<PreparedSchedule> {
    let tasks = storage.load_tasks(schedule_id, ScheduleType::Target)?;
    PreparedSchedule::prepare(
        schedule_id,
        tasks,
        &config.compile_options(),
        Utc::now().naive_utc(),
    )
}

/// Resolve an explicit chunk or the one live on the reference day.
fn select_chunk(
    storage: &Storage,
    prepared: &PreparedSchedule,
    chunk: Option<u32>,
    config: &ResolvedConfig,
) -> Result<ChunkId> {
    if let Some(index) = chunk {
        return Ok(ChunkId(index));
    }
    let day = reference_day(storage, &prepared.schedule_id)?;
    prepared
        .current_chunk(&day, config.chunk_length_days.value)
        .ok_or_else(|| {
            Error::Validation(format!(
                "No chunks assigned for schedule {}",
                prepared.schedule_id
            ))
        })
}

// === Init ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub workspace: PathBuf,
    pub created: bool,
    pub config_written: bool,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        if self.created {
            let _ = writeln!(out, "Initialized workspace at {}", self.workspace.display());
        } else {
            let _ = writeln!(out, "Workspace already initialized at {}", self.workspace.display());
        }
        if self.config_written {
            let _ = write!(out, "Wrote default groundwork.toml");
        }
        out.trim_end().to_string()
    }
}

/// Create a workspace. Re-running on an existing one is harmless.
pub fn init(workspace: &Path) -> Result<InitResult> {
    let created = !Storage::exists(workspace);
    Storage::init(workspace)?;
    let config_written = write_default_config(workspace)?;
    tracing::info!(workspace = %workspace.display(), created, "initialized workspace");

    Ok(InitResult {
        workspace: workspace.to_path_buf(),
        created,
        config_written,
    })
}

// === Ingest ===

#[derive(Debug, Serialize)]
pub struct IngestResult {
    pub schedule_id: String,
    pub schedule_type: ScheduleType,
    pub tasks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_chunk: Option<ChunkId>,
    pub artifacts: Vec<CompiledArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Output for IngestResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Ingested {} {} task(s) for {}",
            self.tasks, self.schedule_type, self.schedule_id
        );
        if let Some(chunk) = self.current_chunk {
            let _ = writeln!(out, "Current chunk: {}", chunk);
        }
        for artifact in &self.artifacts {
            let _ = writeln!(out, "{}", artifact_line(artifact));
        }
        if let Some(ref note) = self.note {
            let _ = writeln!(out, "{}", note);
        }
        out.trim_end().to_string()
    }
}

/// Replace one schedule half from a file, then compile.
///
/// Target schedules are validated before anything is stored so a rejected
/// schedule never replaces a good one. After storing, the compiler is
/// called directly: target gets its domain, in-progress gets the domain
/// plus the problem for the chunk live on its reference date.
pub fn ingest(
    workspace: &Path,
    config: &ResolvedConfig,
    file: &Path,
    schedule_id: &str,
    schedule_type: &str,
    no_compile: bool,
) -> Result<IngestResult> {
    let schedule_type = parse_schedule_type(schedule_type)?;
    let mut storage = Storage::open(workspace)?;
    let schedule = ScheduleFile::load(file)?;

    let prepared = if schedule_type == ScheduleType::Target && !no_compile {
        Some(PreparedSchedule::prepare(
            schedule_id,
            schedule.tasks.clone(),
            &config.compile_options(),
            Utc::now().naive_utc(),
        )?)
    } else {
        None
    };

    let project = schedule.project(schedule_id, schedule_type);
    storage.replace_schedule(&project, &schedule.tasks)?;
    tracing::info!(schedule_id, %schedule_type, tasks = schedule.tasks.len(), "ingested schedule");

    let mut result = IngestResult {
        schedule_id: schedule_id.to_string(),
        schedule_type,
        tasks: schedule.tasks.len(),
        current_chunk: None,
        artifacts: Vec::new(),
        note: None,
    };
    if no_compile {
        return Ok(result);
    }

    match schedule_type {
        ScheduleType::Target => {
            if let Some(prepared) = prepared {
                let dir = storage.artifact_dir();
                let mut session =
                    PlanningSession::new(&mut storage, &dir, config.compile_options());
                result.artifacts.push(session.ensure_domain(&prepared)?);
            }
        }
        ScheduleType::InProgress => {
            if storage.load_tasks(schedule_id, ScheduleType::Target)?.is_empty() {
                tracing::warn!(schedule_id, "no target schedule yet; skipping compile");
                result.note = Some(format!(
                    "No target schedule for {}; nothing compiled",
                    schedule_id
                ));
                return Ok(result);
            }
            let prepared = prepare_target(&storage, schedule_id, config)?;
            let chunk = select_chunk(&storage, &prepared, None, config)?;
            result.current_chunk = Some(chunk);

            let dir = storage.artifact_dir();
            let mut session = PlanningSession::new(&mut storage, &dir, config.compile_options());
            result.artifacts.push(session.ensure_domain(&prepared)?);
            result.artifacts.push(session.ensure_problem(&prepared, chunk)?);
        }
    }

    Ok(result)
}

// === Schedules ===

#[derive(Debug, Serialize)]
pub struct SchedulesResult {
    pub schedules: Vec<ScheduleSummary>,
}

impl Output for SchedulesResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.schedules.is_empty() {
            return "No schedules.".to_string();
        }
        let mut out = String::new();
        for s in &self.schedules {
            let _ = write!(
                out,
                "{:<20} {:<12} {:>5} task(s)",
                s.schedule_id, s.schedule_type, s.task_count
            );
            if let Some(ref name) = s.project_name {
                let _ = write!(out, "  {}", name);
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

/// List stored schedule halves.
pub fn schedules(workspace: &Path) -> Result<SchedulesResult> {
    let storage = Storage::open(workspace)?;
    Ok(SchedulesResult {
        schedules: storage.list_schedules()?,
    })
}

// === Project dates ===

#[derive(Debug, Serialize)]
pub struct ProjectDatesResult {
    pub schedule_id: String,
    #[serde(with = "crate::dates::opt_datetime")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(with = "crate::dates::opt_datetime")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(with = "crate::dates::opt_datetime")]
    pub reference_date: Option<NaiveDateTime>,
}

impl Output for ProjectDatesResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "{}\n  start:     {}\n  end:       {}\n  reference: {}",
            self.schedule_id,
            optional_date(&self.start_date),
            optional_date(&self.end_date),
            optional_date(&self.reference_date)
        )
    }
}

/// Set project dates; start/end on the target half, reference on the
/// in-progress half.
pub fn set_project_dates(
    workspace: &Path,
    schedule_id: &str,
    start: Option<&str>,
    end: Option<&str>,
    reference: Option<&str>,
) -> Result<ProjectDatesResult> {
    let start = parse_date_arg("start", start)?;
    let end = parse_date_arg("end", end)?;
    let reference = parse_date_arg("reference", reference)?;
    if start.is_none() && end.is_none() && reference.is_none() {
        return Err(Error::InvalidInput(
            "Nothing to set: pass --start, --end or --reference".to_string(),
        ));
    }
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(Error::InvalidInput("--end is before --start".to_string()));
        }
    }

    let mut storage = Storage::open(workspace)?;
    storage.set_project_dates(schedule_id, start, end, reference)?;

    let target = storage.get_project(schedule_id, ScheduleType::Target)?;
    let progress = storage.get_project(schedule_id, ScheduleType::InProgress)?;
    Ok(ProjectDatesResult {
        schedule_id: schedule_id.to_string(),
        start_date: target.as_ref().and_then(|p| p.start_date),
        end_date: target.as_ref().and_then(|p| p.end_date),
        reference_date: progress.and_then(|p| p.reference_date),
    })
}

// === Compile ===

#[derive(Debug, Serialize)]
pub struct CompileResult {
    pub schedule_id: String,
    pub artifacts: Vec<CompiledArtifact>,
}

impl Output for CompileResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        for artifact in &self.artifacts {
            let _ = writeln!(out, "{}", artifact_line(artifact));
        }
        out.trim_end().to_string()
    }
}

fn artifact_line(artifact: &CompiledArtifact) -> String {
    let status = match artifact.status {
        crate::planning::ArtifactStatus::Generated => "generated",
        crate::planning::ArtifactStatus::Reused => "reused",
    };
    match (&artifact.mapping.chunk, &artifact.mapping.problem_file) {
        (Some(chunk), Some(problem)) => {
            format!("{:<9} {:<9} {}", status, chunk.to_string(), problem.display())
        }
        _ => format!("{:<9} {:<9} {}", status, "domain", artifact.mapping.domain_file.display()),
    }
}

/// Compile and register the domain of a schedule's target tasks.
pub fn compile_domain(
    workspace: &Path,
    config: &ResolvedConfig,
    schedule_id: &str,
) -> Result<CompileResult> {
    let mut storage = Storage::open(workspace)?;
    let prepared = prepare_target(&storage, schedule_id, config)?;

    let dir = storage.artifact_dir();
    let mut session = PlanningSession::new(&mut storage, &dir, config.compile_options());
    let artifact = session.ensure_domain(&prepared)?;

    Ok(CompileResult {
        schedule_id: schedule_id.to_string(),
        artifacts: vec![artifact],
    })
}

/// Compile and register one chunk problem (explicit, or the one live on
/// the reference date) or all of them.
pub fn compile_problem(
    workspace: &Path,
    config: &ResolvedConfig,
    schedule_id: &str,
    chunk: Option<u32>,
    all: bool,
) -> Result<CompileResult> {
    let mut storage = Storage::open(workspace)?;
    let prepared = prepare_target(&storage, schedule_id, config)?;
    let selected = if all {
        None
    } else {
        Some(select_chunk(&storage, &prepared, chunk, config)?)
    };

    let dir = storage.artifact_dir();
    let mut session = PlanningSession::new(&mut storage, &dir, config.compile_options());
    let artifacts = match selected {
        Some(chunk) => vec![session.ensure_problem(&prepared, chunk)?],
        None => session.ensure_all_problems(&prepared)?,
    };

    Ok(CompileResult {
        schedule_id: schedule_id.to_string(),
        artifacts,
    })
}

// === Chunks ===

#[derive(Debug, Serialize)]
pub struct ChunkRow {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    pub chunk: ChunkId,
    pub duration: f64,
    /// Summary tasks get no action and appear in no problem
    pub summary: bool,
}

#[derive(Debug, Serialize)]
pub struct ChunksResult {
    pub schedule_id: String,
    pub anchor: NaiveDateTime,
    pub chunk_length_days: u32,
    pub chunks: Vec<ChunkId>,
    pub current_chunk: Option<ChunkId>,
    pub tasks: Vec<ChunkRow>,
}

impl Output for ChunksResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {} chunk(s) of {} day(s) from {}",
            self.schedule_id,
            self.chunks.len(),
            self.chunk_length_days,
            format_datetime(&self.anchor)
        );
        if let Some(chunk) = self.current_chunk {
            let _ = writeln!(out, "Current: {}", chunk);
        }
        for row in &self.tasks {
            let marker = if row.summary { " (summary)" } else { "" };
            let _ = writeln!(
                out,
                "  {:<10} {:<16} {:>8} d  {}{}",
                row.chunk.to_string(),
                row.task_id,
                crate::planning::names::format_days(row.duration),
                row.task_name.as_deref().unwrap_or(""),
                marker
            );
        }
        out.trim_end().to_string()
    }
}

/// Show how a schedule's target tasks fall into chunks.
pub fn chunks(
    workspace: &Path,
    config: &ResolvedConfig,
    schedule_id: &str,
) -> Result<ChunksResult> {
    let storage = Storage::open(workspace)?;
    let prepared = prepare_target(&storage, schedule_id, config)?;
    let day = reference_day(&storage, schedule_id)?;
    let summaries = summary_task_ids(&prepared.tasks);

    let tasks = prepared
        .tasks
        .iter()
        .map(|t| ChunkRow {
            task_id: t.task_id.clone(),
            task_name: t.task_name.clone(),
            chunk: t.chunk.unwrap_or(ChunkId(0)),
            duration: t.duration.unwrap_or(config.default_duration_days.value),
            summary: summaries.contains(t.task_id.as_str()),
        })
        .collect();

    Ok(ChunksResult {
        schedule_id: schedule_id.to_string(),
        anchor: prepared.anchor,
        chunk_length_days: config.chunk_length_days.value,
        current_chunk: prepared.current_chunk(&day, config.chunk_length_days.value),
        chunks: prepared.chunks.clone(),
        tasks,
    })
}

// === Mappings ===

#[derive(Debug, Serialize)]
pub struct MappingsResult {
    pub schedule_id: String,
    pub mappings: Vec<Mapping>,
}

impl Output for MappingsResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.mappings.is_empty() {
            return format!("No artifacts registered for {}.", self.schedule_id);
        }
        let mut out = String::new();
        for m in &self.mappings {
            let key = m.chunk.map_or_else(|| "domain".to_string(), |c| c.to_string());
            let file = m.problem_file.as_ref().unwrap_or(&m.domain_file);
            let created = m.created_at.format("%Y-%m-%d %H:%M");
            let _ = writeln!(out, "{:<10} {}  {}", key, file.display(), created);
        }
        out.trim_end().to_string()
    }
}

/// List registered artifacts.
pub fn mappings(workspace: &Path, schedule_id: &str) -> Result<MappingsResult> {
    let storage = Storage::open(workspace)?;
    Ok(MappingsResult {
        schedule_id: schedule_id.to_string(),
        mappings: storage.list_mappings(schedule_id)?,
    })
}

// === Analyze ===

impl Output for ProgressOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self {
            ProgressOutcome::Failed { error } => format!("Error: {}", error),
            ProgressOutcome::Report {
                schedule_id,
                reference_day,
                insights,
            } => {
                let mut out = String::new();
                let _ = writeln!(out, "{} as of {}", schedule_id, format_datetime(reference_day));
                for insight in insights {
                    let _ = writeln!(out, "  [{}] {}", insight.kind, insight.message);
                }
                out.trim_end().to_string()
            }
        }
    }
}

/// Compare in-progress against target.
pub fn analyze(workspace: &Path, schedule_id: &str) -> Result<ProgressOutcome> {
    let storage = Storage::open(workspace)?;
    analysis::analyze_progress(&storage, schedule_id)
}

// === Plan ===

#[derive(Debug, Serialize)]
pub struct PlanResult {
    pub schedule_id: String,
    pub chunk: ChunkId,
    pub domain_file: PathBuf,
    pub problem_file: PathBuf,
    pub plan: Plan,
}

impl Output for PlanResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        let steps = self.plan.steps.len();
        let _ = writeln!(out, "{} {}: {} step(s)", self.schedule_id, self.chunk, steps);
        if self.plan.steps.is_empty() {
            let _ = writeln!(out, "{}", self.plan.text.trim_end());
        }
        for step in &self.plan.steps {
            let _ = writeln!(
                out,
                "  {:>10.3}  {:<30} [{:.3}]",
                step.start, step.action, step.duration
            );
        }
        out.trim_end().to_string()
    }
}

/// Make sure the chunk problem is registered, then run the planner on it.
pub fn plan(
    workspace: &Path,
    config: &ResolvedConfig,
    planner: &dyn Planner,
    schedule_id: &str,
    chunk: Option<u32>,
) -> Result<PlanResult> {
    let mut storage = Storage::open(workspace)?;
    let prepared = prepare_target(&storage, schedule_id, config)?;
    let chunk = select_chunk(&storage, &prepared, chunk, config)?;

    let dir = storage.artifact_dir();
    let mut session = PlanningSession::new(&mut storage, &dir, config.compile_options());
    let mapping = session.ensure_problem(&prepared, chunk)?.mapping;
    let problem_file = mapping
        .problem_file
        .ok_or_else(|| Error::NotFound(format!("No problem file for {} {}", schedule_id, chunk)))?;

    let plan = planner.plan(&mapping.domain_file, &problem_file)?;
    Ok(PlanResult {
        schedule_id: schedule_id.to_string(),
        chunk,
        domain_file: mapping.domain_file,
        problem_file,
        plan,
    })
}

// === Config ===

impl Output for ResolvedConfig {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        setting(&mut out, "chunk_length_days", &self.chunk_length_days);
        setting(&mut out, "default_duration_days", &self.default_duration_days);
        setting(&mut out, "baseline_policy", &self.baseline_policy);
        setting(&mut out, "action_log", &self.action_log);
        setting(&mut out, "planner.command", &self.planner_command);
        let args = &self.planner_args;
        let _ = writeln!(out, "{:<21} = {:?} ({})", "planner.args", args.value, args.source);
        setting(&mut out, "planner.timeout_secs", &self.planner_timeout_secs);
        out.trim_end().to_string()
    }
}

fn setting<T: std::fmt::Display>(out: &mut String, key: &str, resolved: &Resolved<T>) {
    let _ = writeln!(out, "{:<21} = {} ({})", key, resolved.value, resolved.source);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::PlanStep;
    use crate::planning::ArtifactStatus;
    use crate::test_utils::TestEnv;
    use std::fs;

    const TARGET: &str = r#"{
        "project_name": "Depot",
        "tasks": [
            {"task_id": "T1", "task_name": "Excavation",
             "bl_start": "2025-03-01", "bl_finish": "2025-03-05"},
            {"task_id": "T2", "task_name": "Footings",
             "bl_start": "2025-03-06", "bl_finish": "2025-03-10"},
            {"task_id": "T3", "task_name": "Framing",
             "bl_start": "2025-04-02", "bl_finish": "2025-04-12"}
        ]
    }"#;

    const PROGRESS: &str = r#"{
        "reference_date": "2025-04-05",
        "tasks": [
            {"task_id": "T1", "task_name": "Excavation", "percent_done": 100},
            {"task_id": "T2", "task_name": "Footings", "percent_done": 100},
            {"task_id": "T3", "task_name": "Framing", "percent_done": 0}
        ]
    }"#;

    struct FakePlanner;

    impl Planner for FakePlanner {
        fn plan(&self, domain: &Path, problem: &Path) -> Result<Plan> {
            assert!(domain.exists());
            assert!(problem.exists());
            Ok(Plan::from_text("0.000: (do_t3) [10.000]\n".to_string()))
        }
    }

    fn setup() -> (TestEnv, ResolvedConfig) {
        let env = TestEnv::new();
        init(env.path()).unwrap();
        fs::write(env.path().join("target.json"), TARGET).unwrap();
        fs::write(env.path().join("progress.json"), PROGRESS).unwrap();
        (env, ResolvedConfig::default())
    }

    fn ingest_file(
        env: &TestEnv,
        config: &ResolvedConfig,
        file: &str,
        schedule_type: &str,
        no_compile: bool,
    ) -> Result<IngestResult> {
        let path = env.path().join(file);
        ingest(env.path(), config, &path, "S1", schedule_type, no_compile)
    }

    #[test]
    fn test_init_is_repeatable() {
        let env = TestEnv::new();
        let first = init(env.path()).unwrap();
        assert!(first.created);
        assert!(first.config_written);
        let second = init(env.path()).unwrap();
        assert!(!second.created);
        assert!(!second.config_written);
    }

    #[test]
    fn test_commands_require_init() {
        let env = TestEnv::new();
        assert!(matches!(schedules(env.path()), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_ingest_target_compiles_domain() {
        let (env, config) = setup();
        let result = ingest_file(&env, &config, "target.json", "target", false).unwrap();
        assert_eq!(result.tasks, 3);
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.artifacts[0].status, ArtifactStatus::Generated);
        assert!(result.artifacts[0].mapping.domain_file.exists());

        let again = ingest_file(&env, &config, "target.json", "target", false).unwrap();
        assert_eq!(again.artifacts[0].status, ArtifactStatus::Reused);
        assert_eq!(mappings(env.path(), "S1").unwrap().mappings.len(), 1);
    }

    #[test]
    fn test_ingest_in_progress_compiles_current_chunk() {
        let (env, config) = setup();
        ingest_file(&env, &config, "target.json", "target", false).unwrap();
        let result = ingest_file(&env, &config, "progress.json", "in-progress", false).unwrap();

        assert_eq!(result.current_chunk, Some(ChunkId(1)));
        assert_eq!(result.artifacts.len(), 2);
        let rows = mappings(env.path(), "S1").unwrap().mappings;
        let keys: Vec<Option<ChunkId>> = rows.iter().map(|m| m.chunk).collect();
        assert_eq!(keys, vec![None, Some(ChunkId(1))]);
    }

    #[test]
    fn test_ingest_in_progress_without_target() {
        let (env, config) = setup();
        let result = ingest_file(&env, &config, "progress.json", "in-progress", false).unwrap();
        assert!(result.artifacts.is_empty());
        assert!(result.note.is_some());
    }

    #[test]
    fn test_invalid_target_is_not_stored() {
        let (env, config) = setup();
        let bad = r#"[{"task_id": "T1", "bl_start": "2025-03-01"}]"#;
        fs::write(env.path().join("bad.json"), bad).unwrap();

        let err = ingest_file(&env, &config, "bad.json", "target", false).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(schedules(env.path()).unwrap().schedules.is_empty());
        assert!(mappings(env.path(), "S1").unwrap().mappings.is_empty());
    }

    #[test]
    fn test_unknown_schedule_type() {
        let (env, config) = setup();
        let err = ingest_file(&env, &config, "target.json", "draft", false).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_compile_problem_all_and_chunks() {
        let (env, config) = setup();
        ingest_file(&env, &config, "target.json", "target", true).unwrap();

        let all = compile_problem(env.path(), &config, "S1", None, true).unwrap();
        assert_eq!(all.artifacts.len(), 2);

        let table = chunks(env.path(), &config, "S1").unwrap();
        assert_eq!(table.chunks, vec![ChunkId(0), ChunkId(1)]);
        assert_eq!(table.tasks[2].chunk, ChunkId(1));
        assert_eq!(table.tasks[2].duration, 10.0);
        assert!(!table.tasks[0].summary);
    }

    #[test]
    fn test_compile_domain_without_target_fails() {
        let (env, config) = setup();
        let err = compile_domain(env.path(), &config, "missing").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_set_project_dates_moves_current_chunk() {
        let (env, config) = setup();
        ingest_file(&env, &config, "target.json", "target", true).unwrap();

        let dates = set_project_dates(env.path(), "S1", None, None, Some("3/3/2025")).unwrap();
        assert_eq!(dates.reference_date, parse_user_date("2025-03-03"));
        let table = chunks(env.path(), &config, "S1").unwrap();
        assert_eq!(table.current_chunk, Some(ChunkId(0)));

        assert!(set_project_dates(env.path(), "S1", None, None, None).is_err());
        assert!(set_project_dates(env.path(), "S1", Some("someday"), None, None).is_err());
    }

    #[test]
    fn test_analyze_outcomes() {
        let (env, config) = setup();
        ingest_file(&env, &config, "target.json", "target", true).unwrap();
        assert!(analyze(env.path(), "S1").unwrap().is_failed());

        ingest_file(&env, &config, "progress.json", "in-progress", true).unwrap();
        let outcome = analyze(env.path(), "S1").unwrap();
        let human = outcome.to_human();
        assert!(human.contains("Framing"));
        assert!(human.contains("behind schedule"));
    }

    #[test]
    fn test_plan_uses_registered_problem() {
        let (env, config) = setup();
        ingest_file(&env, &config, "target.json", "target", true).unwrap();

        let result = plan(env.path(), &config, &FakePlanner, "S1", Some(1)).unwrap();
        assert_eq!(result.chunk, ChunkId(1));
        assert_eq!(
            result.plan.steps,
            vec![PlanStep { start: 0.0, action: "do_t3".to_string(), duration: 10.0 }]
        );
        assert_eq!(mappings(env.path(), "S1").unwrap().mappings.len(), 2);
    }
}
