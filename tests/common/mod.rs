//! Common test utilities for groundwork integration tests.
//!
//! Provides `TestEnv` for isolated workspaces that never touch the user's
//! `~/.config/groundwork/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Target schedule spanning two 28-day chunks.
pub const TARGET_SCHEDULE: &str = r#"{
    "project_name": "Depot",
    "start_date": "2025-03-01",
    "end_date": "2025-04-30",
    "tasks": [
        {"task_id": "T1", "task_name": "Excavation",
         "bl_start": "2025-03-01", "bl_finish": "2025-03-05"},
        {"task_id": "T2", "task_name": "Footings",
         "bl_start": "2025-03-06", "bl_finish": "2025-03-10"},
        {"task_id": "T3", "task_name": "Framing",
         "bl_start": "2025-04-02", "bl_finish": "2025-04-12"}
    ]
}"#;

/// In-progress snapshot of [`TARGET_SCHEDULE`] as of 2025-03-03.
pub const PROGRESS_SCHEDULE: &str = r#"{
    "reference_date": "2025-03-03",
    "tasks": [
        {"task_id": "T1", "task_name": "Excavation", "percent_done": 10},
        {"task_id": "T2", "task_name": "Footings", "percent_done": 0},
        {"task_id": "T3", "task_name": "Framing", "percent_done": 0}
    ]
}"#;

/// A test environment with an isolated workspace and config home.
///
/// The `gw()` method returns a `Command` that points `GW_WORKSPACE` and
/// `XDG_CONFIG_HOME` at temporary directories per-invocation, making tests
/// parallel-safe.
pub struct TestEnv {
    pub workspace: TempDir,
    pub config_home: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            workspace: TempDir::new().unwrap(),
            config_home: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `gw init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.gw().arg("init").assert().success();
        env
    }

    /// Get a Command for the gw binary bound to this workspace.
    pub fn gw(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gw"));
        cmd.current_dir(self.workspace.path());
        cmd.env("GW_WORKSPACE", self.workspace.path());
        cmd.env("XDG_CONFIG_HOME", self.config_home.path());
        cmd.env_remove("GW_CHUNK_LENGTH_DAYS");
        cmd.env_remove("GW_BASELINE_POLICY");
        cmd.env_remove("GW_PLANNER");
        cmd.env_remove("GW_LOG");
        cmd
    }

    /// Get the path to the workspace.
    pub fn path(&self) -> &Path {
        self.workspace.path()
    }

    /// Write a file into the workspace and return its path.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.workspace.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Ingest a schedule file, asserting success.
    pub fn ingest(&self, name: &str, contents: &str, schedule_type: &str) -> serde_json::Value {
        let path = self.write_file(name, contents);
        let output = self
            .gw()
            .arg("ingest")
            .arg(&path)
            .args(["--schedule", "S1", "--type", schedule_type])
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "ingest failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        parse_json(&output.stdout)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse command stdout as JSON.
pub fn parse_json(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).unwrap()
}
