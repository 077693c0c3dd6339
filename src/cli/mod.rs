//! CLI argument definitions for Groundwork.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `gw --version` output: package version plus the commit and build time
/// injected by the build script.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("GW_GIT_COMMIT"),
    "\nbuilt:  ",
    env!("GW_BUILD_TIMESTAMP")
);

/// Groundwork - compile construction schedules into chunked planning problems.
///
/// Start with `gw init`, load a target schedule with `gw ingest`, then use
/// `gw compile` and `gw analyze`.
#[derive(Parser, Debug)]
#[command(name = "gw")]
#[command(
    author,
    version,
    long_version = LONG_VERSION,
    about = "Compile construction schedules into chunked planning problems and track progress",
    long_about = None
)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Workspace directory holding the database, config and artifacts.
    /// Defaults to the current directory.
    #[arg(short = 'W', long = "workspace", global = true, env = "GW_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Chunk length in days (overrides config and GW_CHUNK_LENGTH_DAYS)
    #[arg(long, global = true)]
    pub chunk_length_days: Option<u32>,

    /// Baseline policy: strict or fallback-to-actual
    #[arg(long, global = true)]
    pub baseline_policy: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a workspace (database, artifact directory, groundwork.toml)
    Init,

    /// Load a schedule file, replacing the stored half, then compile
    ///
    /// Target schedules get their domain compiled; in-progress schedules
    /// also get the problem for the chunk live on the reference date.
    Ingest {
        /// JSON schedule file (object with "tasks" or a bare task array)
        file: PathBuf,

        /// Schedule ID
        #[arg(short, long)]
        schedule: String,

        /// Schedule half: target or in-progress
        #[arg(short = 't', long = "type", default_value = "target")]
        schedule_type: String,

        /// Store only; skip compilation
        #[arg(long)]
        no_compile: bool,
    },

    /// List stored schedules
    Schedules,

    /// Project metadata commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Generate planning artifacts
    Compile {
        #[command(subcommand)]
        command: CompileCommands,
    },

    /// Show the chunk assignment of a target schedule
    Chunks {
        /// Schedule ID
        schedule: String,
    },

    /// Show registered artifacts for a schedule
    Mappings {
        /// Schedule ID
        schedule: String,
    },

    /// Compare in-progress against target and report deviations
    Analyze {
        /// Schedule ID
        schedule: String,
    },

    /// Run the planner on registered artifacts
    Plan {
        /// Schedule ID
        schedule: String,

        /// Chunk to plan (default: the chunk live on the reference date)
        #[arg(short, long)]
        chunk: Option<u32>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Set project dates (YYYY-MM-DD, M/D/YYYY, ...)
    SetDates {
        /// Schedule ID
        schedule: String,

        /// Project start (target)
        #[arg(long)]
        start: Option<String>,

        /// Project end (target)
        #[arg(long)]
        end: Option<String>,

        /// Reference "as-of" date for progress analysis (in-progress)
        #[arg(long)]
        reference: Option<String>,
    },
}

/// Compile subcommands
#[derive(Subcommand, Debug)]
pub enum CompileCommands {
    /// Compile and register the domain
    Domain {
        /// Schedule ID
        schedule: String,
    },

    /// Compile and register a chunk problem
    Problem {
        /// Schedule ID
        schedule: String,

        /// Chunk index (default: the chunk live on the reference date)
        #[arg(short, long, conflicts_with = "all")]
        chunk: Option<u32>,

        /// Compile every chunk
        #[arg(long)]
        all: bool,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "gw", "-H", "ingest", "plan.json", "--schedule", "S1", "--type", "in-progress",
        ])
        .unwrap();
        assert!(cli.human_readable);
        match cli.command {
            Commands::Ingest { file, schedule, schedule_type, no_compile } => {
                assert_eq!(file, PathBuf::from("plan.json"));
                assert_eq!(schedule, "S1");
                assert_eq!(schedule_type, "in-progress");
                assert!(!no_compile);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_chunk_and_all_conflict() {
        let result =
            Cli::try_parse_from(["gw", "compile", "problem", "S1", "--chunk", "1", "--all"]);
        assert!(result.is_err());
    }
}
