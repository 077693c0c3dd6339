//! Groundwork CLI - construction schedules in, chunked planning problems out.

use clap::Parser;
use groundwork::action_log;
use groundwork::cli::{Cli, Commands, CompileCommands, ConfigCommands, ProjectCommands};
use groundwork::commands::{self, Output};
use groundwork::config::{ConfigOverrides, ResolvedConfig, parse_policy, resolve_config};
use groundwork::storage::Storage;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GW_LOG";

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine workspace: --workspace flag > GW_WORKSPACE env > cwd
    let workspace = resolve_workspace(cli.workspace.clone(), human);

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(&cli, &workspace, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Only initialized workspaces get an audit log
    if Storage::exists(&workspace) && action_log_enabled(&workspace) {
        action_log::log_action(&workspace, &cmd_name, args_json, success, error, duration);
    }

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("groundwork=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the workspace directory.
///
/// An explicit path must exist or have an existing parent directory.
fn resolve_workspace(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            // A missing leaf is fine; `init` creates it
            let parent_ok = path.parent().is_none_or(|p| p.as_os_str().is_empty() || p.exists());
            if path.exists() || parent_ok {
                return path;
            }
            let message = format!("Workspace path does not exist: {}", path.display());
            if human {
                eprintln!("Error: {}", message);
            } else {
                eprintln!("{}", serde_json::json!({ "error": message }));
            }
            process::exit(1);
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Whether the workspace config allows audit logging. A broken config
/// falls back to the default (enabled).
fn action_log_enabled(workspace: &Path) -> bool {
    resolve_config(workspace, &ConfigOverrides::new())
        .map(|config| config.action_log_enabled())
        .unwrap_or_else(|_| ResolvedConfig::default().action_log_enabled())
}

fn overrides(cli: &Cli) -> Result<ConfigOverrides, groundwork::Error> {
    let mut overrides = ConfigOverrides::new();
    if let Some(days) = cli.chunk_length_days {
        overrides = overrides.with_chunk_length_days(days);
    }
    if let Some(ref raw) = cli.baseline_policy {
        overrides = overrides.with_baseline_policy(parse_policy(raw)?);
    }
    Ok(overrides)
}

fn run_command(cli: &Cli, workspace: &Path, human: bool) -> Result<(), groundwork::Error> {
    let config =
        || -> groundwork::Result<ResolvedConfig> { resolve_config(workspace, &overrides(cli)?) };

    match &cli.command {
        Commands::Init => output(&commands::init(workspace)?, human),

        Commands::Ingest {
            file,
            schedule,
            schedule_type,
            no_compile,
        } => {
            let result = commands::ingest(
                workspace,
                &config()?,
                file,
                schedule,
                schedule_type,
                *no_compile,
            );
            match result {
                Ok(result) => output(&result, human),
                Err(groundwork::Error::NotInitialized) => not_initialized(workspace, human),
                Err(e) => return Err(e),
            }
        }

        Commands::Schedules => output(&commands::schedules(workspace)?, human),

        Commands::Project { command } => match command {
            ProjectCommands::SetDates {
                schedule,
                start,
                end,
                reference,
            } => {
                let result = commands::set_project_dates(
                    workspace,
                    schedule,
                    start.as_deref(),
                    end.as_deref(),
                    reference.as_deref(),
                )?;
                output(&result, human);
            }
        },

        Commands::Compile { command } => match command {
            CompileCommands::Domain { schedule } => {
                output(&commands::compile_domain(workspace, &config()?, schedule)?, human);
            }
            CompileCommands::Problem { schedule, chunk, all } => {
                let result =
                    commands::compile_problem(workspace, &config()?, schedule, *chunk, *all)?;
                output(&result, human);
            }
        },

        Commands::Chunks { schedule } => {
            output(&commands::chunks(workspace, &config()?, schedule)?, human);
        }

        Commands::Mappings { schedule } => output(&commands::mappings(workspace, schedule)?, human),

        Commands::Analyze { schedule } => {
            // A missing schedule half is a reported outcome, not a command error
            output(&commands::analyze(workspace, schedule)?, human);
        }

        Commands::Plan { schedule, chunk } => {
            let config = config()?;
            let planner = config.planner();
            output(&commands::plan(workspace, &config, &planner, schedule, *chunk)?, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&config()?, human),
        },
    }

    Ok(())
}

/// Print a hint for commands run outside a workspace, then exit.
fn not_initialized(workspace: &Path, human: bool) -> ! {
    if human {
        eprintln!("Error: No groundwork workspace found.\n");
        eprintln!("To initialize one:");
        eprintln!("    gw init");
        eprintln!("Workspace location: {}", workspace.display());
    } else {
        let err = serde_json::json!({
            "error": "No groundwork workspace found",
            "hint": "Run 'gw init' in the workspace directory",
            "path": workspace
        });
        eprintln!("{}", err);
    }
    process::exit(1);
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Serialize a command to its name and arguments for the audit log.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    match command {
        Commands::Init => ("init".to_string(), serde_json::json!({})),

        Commands::Ingest {
            file,
            schedule,
            schedule_type,
            no_compile,
        } => (
            "ingest".to_string(),
            serde_json::json!({
                "file": file,
                "schedule": schedule,
                "type": schedule_type,
                "no_compile": no_compile,
            }),
        ),

        Commands::Schedules => ("schedules".to_string(), serde_json::json!({})),

        Commands::Project { command } => match command {
            ProjectCommands::SetDates {
                schedule,
                start,
                end,
                reference,
            } => (
                "project set-dates".to_string(),
                serde_json::json!({
                    "schedule": schedule,
                    "start": start,
                    "end": end,
                    "reference": reference,
                }),
            ),
        },

        Commands::Compile { command } => match command {
            CompileCommands::Domain { schedule } => (
                "compile domain".to_string(),
                serde_json::json!({ "schedule": schedule }),
            ),
            CompileCommands::Problem { schedule, chunk, all } => (
                "compile problem".to_string(),
                serde_json::json!({ "schedule": schedule, "chunk": chunk, "all": all }),
            ),
        },

        Commands::Chunks { schedule } => (
            "chunks".to_string(),
            serde_json::json!({ "schedule": schedule }),
        ),

        Commands::Mappings { schedule } => (
            "mappings".to_string(),
            serde_json::json!({ "schedule": schedule }),
        ),

        Commands::Analyze { schedule } => (
            "analyze".to_string(),
            serde_json::json!({ "schedule": schedule }),
        ),

        Commands::Plan { schedule, chunk } => (
            "plan".to_string(),
            serde_json::json!({ "schedule": schedule, "chunk": chunk }),
        ),

        Commands::Config { command } => match command {
            ConfigCommands::Show => ("config show".to_string(), serde_json::json!({})),
        },
    }
}
