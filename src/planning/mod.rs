//! Planning artifact generation.
//!
//! Turns a target schedule into a temporal-planning domain (one durative
//! action per leaf task) and per-chunk problems:
//! - `duration` - total duration resolution
//! - `chunks` - fixed-length time buckets anchored at the earliest baseline
//! - `domain` / `problem` - pure text renderers
//! - `session` - validate, render, write and register, idempotently

pub mod artifacts;
pub mod chunks;
pub mod domain;
pub mod duration;
pub mod names;
pub mod problem;
pub mod session;
pub mod validation;

pub use chunks::{DEFAULT_CHUNK_LENGTH_DAYS, assign_chunks, current_chunk, schedule_anchor};
pub use domain::compile_domain;
pub use duration::{DEFAULT_DURATION_DAYS, resolve_duration};
pub use problem::compile_problem;
pub use session::{
    ArtifactStatus, CompileOptions, CompiledArtifact, PlanningSession, PreparedSchedule,
};
pub use validation::BaselinePolicy;
