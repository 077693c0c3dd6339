//! Compile-and-register pipeline.
//!
//! A `PlanningSession` turns a stored target task set into domain and
//! problem files and records them in a [`MappingRegistry`]. Generation is
//! idempotent: when the registry already points at files holding exactly
//! the text that would be generated, nothing is written and no row is
//! touched.

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::artifacts::{digest, domain_file_name, problem_file_name, write_artifact};
use super::chunks::{DEFAULT_CHUNK_LENGTH_DAYS, assign_chunks, current_chunk, schedule_anchor};
use super::domain::compile_domain;
use super::duration::{DEFAULT_DURATION_DAYS, resolve_durations};
use super::problem::compile_problem;
use super::validation::{BaselinePolicy, check_identifiers, check_not_empty, normalize_baselines};
use crate::Result;
use crate::models::{ChunkId, Mapping, Task};
use crate::storage::MappingRegistry;

/// Knobs that shape generated artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompileOptions {
    pub chunk_length_days: u32,
    pub default_duration_days: f64,
    pub baseline_policy: BaselinePolicy,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            chunk_length_days: DEFAULT_CHUNK_LENGTH_DAYS,
            default_duration_days: DEFAULT_DURATION_DAYS,
            baseline_policy: BaselinePolicy::default(),
        }
    }
}

/// A validated task set with durations and chunks filled in.
#[derive(Debug, Clone)]
pub struct PreparedSchedule {
    pub schedule_id: String,
    pub tasks: Vec<Task>,
    /// Distinct chunks in use, ascending
    pub chunks: Vec<ChunkId>,
    /// Earliest baseline start, or the preparation time when none exists
    pub anchor: NaiveDateTime,
}

impl PreparedSchedule {
    /// Validate and derive everything the compilers need.
    ///
    /// # Errors
    /// `Validation` for an empty task set, partial baseline pairs (after
    /// applying the policy) and colliding task ids.
    pub fn prepare(
        schedule_id: &str,
        mut tasks: Vec<Task>,
        options: &CompileOptions,
        now: NaiveDateTime,
    ) -> Result<Self> {
        check_not_empty(schedule_id, &tasks)?;
        normalize_baselines(&mut tasks, options.baseline_policy)?;
        check_identifiers(&tasks)?;
        resolve_durations(&mut tasks, options.default_duration_days);
        let chunks = assign_chunks(&mut tasks, options.chunk_length_days, now);
        let anchor = schedule_anchor(&tasks).unwrap_or(now);

        Ok(Self {
            schedule_id: schedule_id.to_string(),
            tasks,
            chunks,
            anchor,
        })
    }

    /// The chunk live on `reference_day`.
    pub fn current_chunk(
        &self,
        reference_day: &NaiveDateTime,
        chunk_length_days: u32,
    ) -> Option<ChunkId> {
        current_chunk(&self.anchor, reference_day, chunk_length_days, &self.chunks)
    }
}

/// Whether an artifact was written or an existing one reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Generated,
    Reused,
}

/// Outcome of one `ensure_*` call.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledArtifact {
    pub status: ArtifactStatus,
    pub mapping: Mapping,
}

/// Compiles artifacts for schedules and registers them.
pub struct PlanningSession<'r> {
    registry: &'r mut dyn MappingRegistry,
    artifact_dir: PathBuf,
    options: CompileOptions,
}

impl<'r> PlanningSession<'r> {
    /// Create a session writing artifacts into `artifact_dir`.
    pub fn new(
        registry: &'r mut dyn MappingRegistry,
        artifact_dir: &Path,
        options: CompileOptions,
    ) -> Self {
        Self {
            registry,
            artifact_dir: artifact_dir.to_path_buf(),
            options,
        }
    }

    /// Options this session compiles with.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Validate and prepare a task set with this session's options.
    pub fn prepare(&self, schedule_id: &str, tasks: Vec<Task>) -> Result<PreparedSchedule> {
        PreparedSchedule::prepare(schedule_id, tasks, &self.options, Utc::now().naive_utc())
    }

    /// Make sure the domain file for `prepared` exists and is registered.
    pub fn ensure_domain(&mut self, prepared: &PreparedSchedule) -> Result<CompiledArtifact> {
        let text = compile_domain(&prepared.tasks)?;
        self.store_domain(&prepared.schedule_id, &text)
    }

    /// Make sure the problem for `chunk` (and the domain it refers to)
    /// exist and are registered.
    ///
    /// Both texts are rendered before anything is written, so a compile
    /// error leaves the registry and the artifact directory untouched.
    pub fn ensure_problem(
        &mut self,
        prepared: &PreparedSchedule,
        chunk: ChunkId,
    ) -> Result<CompiledArtifact> {
        let domain_text = compile_domain(&prepared.tasks)?;
        let problem_text =
            compile_problem(&prepared.schedule_id, &prepared.tasks, &prepared.chunks, chunk)?;

        let domain = self.store_domain(&prepared.schedule_id, &domain_text)?;
        self.store_problem(&prepared.schedule_id, chunk, &domain.mapping.domain_file, &problem_text)
    }

    /// Ensure problems for every chunk in use, ascending.
    pub fn ensure_all_problems(
        &mut self,
        prepared: &PreparedSchedule,
    ) -> Result<Vec<CompiledArtifact>> {
        // Render everything up front so a failure in a late chunk writes nothing
        let domain_text = compile_domain(&prepared.tasks)?;
        let problems = prepared
            .chunks
            .iter()
            .map(|chunk| {
                compile_problem(&prepared.schedule_id, &prepared.tasks, &prepared.chunks, *chunk)
                    .map(|text| (*chunk, text))
            })
            .collect::<Result<Vec<_>>>()?;

        let domain = self.store_domain(&prepared.schedule_id, &domain_text)?;
        problems
            .iter()
            .map(|(chunk, text)| {
                self.store_problem(&prepared.schedule_id, *chunk, &domain.mapping.domain_file, text)
            })
            .collect()
    }

    fn store_domain(&mut self, schedule_id: &str, text: &str) -> Result<CompiledArtifact> {
        let digest = digest(text);

        let previous = self.registry.get_mapping(schedule_id, None)?;
        if let Some(ref existing) = previous {
            if existing.digest == digest && existing.domain_file.exists() {
                tracing::debug!(
                    schedule_id,
                    file = %existing.domain_file.display(),
                    "reusing domain"
                );
                return Ok(CompiledArtifact {
                    status: ArtifactStatus::Reused,
                    mapping: existing.clone(),
                });
            }
        } else {
            tracing::debug!(schedule_id, "no domain mapping registered; compiling from scratch");
        }

        let path = write_artifact(
            &self.artifact_dir,
            &domain_file_name(schedule_id, &digest),
            text,
        )?;
        let mapping = Mapping {
            schedule_id: schedule_id.to_string(),
            chunk: None,
            domain_file: path,
            problem_file: None,
            digest,
            created_at: Utc::now(),
        };
        self.registry.upsert_mapping(&mapping)?;
        tracing::info!(schedule_id, file = %mapping.domain_file.display(), "generated domain");
        if let Some(previous) = previous {
            self.release_files(schedule_id, &previous)?;
        }

        Ok(CompiledArtifact {
            status: ArtifactStatus::Generated,
            mapping,
        })
    }

    fn store_problem(
        &mut self,
        schedule_id: &str,
        chunk: ChunkId,
        domain_file: &Path,
        text: &str,
    ) -> Result<CompiledArtifact> {
        let digest = digest(text);

        let previous = self.registry.get_mapping(schedule_id, Some(chunk))?;
        if let Some(ref existing) = previous {
            let files_present = existing.domain_file.exists()
                && existing.problem_file.as_deref().is_some_and(Path::exists);
            if existing.digest == digest && existing.domain_file == domain_file && files_present {
                tracing::debug!(schedule_id, chunk = %chunk, "reusing problem");
                return Ok(CompiledArtifact {
                    status: ArtifactStatus::Reused,
                    mapping: existing.clone(),
                });
            }
        } else {
            tracing::debug!(
                schedule_id,
                chunk = %chunk,
                "no problem mapping registered; compiling from scratch"
            );
        }

        let path = write_artifact(
            &self.artifact_dir,
            &problem_file_name(schedule_id, chunk, &digest),
            text,
        )?;
        let mapping = Mapping {
            schedule_id: schedule_id.to_string(),
            chunk: Some(chunk),
            domain_file: domain_file.to_path_buf(),
            problem_file: Some(path),
            digest,
            created_at: Utc::now(),
        };
        self.registry.upsert_mapping(&mapping)?;
        tracing::info!(schedule_id, chunk = %chunk, "generated problem");
        if let Some(previous) = previous {
            self.release_files(schedule_id, &previous)?;
        }

        Ok(CompiledArtifact {
            status: ArtifactStatus::Generated,
            mapping,
        })
    }

    /// Delete the files of a replaced row that no remaining row refers to.
    ///
    /// Only files inside the artifact directory are touched. A failed
    /// removal is logged; the new row is already registered.
    fn release_files(&self, schedule_id: &str, previous: &Mapping) -> Result<()> {
        let rows = self.registry.list_mappings(schedule_id)?;
        let candidates =
            std::iter::once(&previous.domain_file).chain(previous.problem_file.as_ref());

        for path in candidates {
            if !path.starts_with(&self.artifact_dir) {
                continue;
            }
            let in_use = rows
                .iter()
                .any(|m| &m.domain_file == path || m.problem_file.as_ref() == Some(path));
            if in_use {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => tracing::debug!(file = %path.display(), "removed superseded artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "could not remove artifact")
                }
            }
        }
        Ok(())
    }
}
