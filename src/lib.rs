//! Groundwork - construction schedule compiler and progress tracker.
//!
//! This library provides the core functionality for the `gw` CLI tool:
//! chunked planning-domain/problem generation from a target schedule,
//! a persistent artifact registry, and baseline progress analysis.

pub mod action_log;
pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod models;
pub mod planner;
pub mod planning;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::NaiveDateTime;
    use std::path::Path;
    use tempfile::TempDir;

    use crate::models::Task;
    use crate::storage::Storage;

    /// Test environment with an isolated workspace directory.
    pub struct TestEnv {
        /// Workspace holding the database, config and generated artifacts
        pub workspace: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with an empty workspace.
        pub fn new() -> Self {
            Self {
                workspace: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the workspace.
        pub fn path(&self) -> &Path {
            self.workspace.path()
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init(self.path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Parse a `YYYY-MM-DD` date as midnight.
    pub fn day(s: &str) -> NaiveDateTime {
        crate::dates::parse_user_date(s).unwrap()
    }

    /// Build a task with a baseline window.
    pub fn task(id: &str, start: &str, finish: &str) -> Task {
        let mut t = Task::new(id);
        t.baseline_start = Some(day(start));
        t.baseline_finish = Some(day(finish));
        t
    }
}

/// Library-level error type for Groundwork operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `gw init` first")]
    NotInitialized,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Planner failed: {0}")]
    Planner(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Groundwork operations.
pub type Result<T> = std::result::Result<T, Error>;
