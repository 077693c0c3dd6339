//! External planner invocation.
//!
//! The planner is a separate program (OPTIC by default) handed a domain
//! and a problem file. It is run once per call with a timeout; a non-zero
//! exit, a timeout or empty output is a failure. Nothing is retried.

use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::{Error, Result};

/// Default planner program.
pub const DEFAULT_PLANNER_COMMAND: &str = "optic";

/// Default planner arguments.
pub const DEFAULT_PLANNER_ARGS: &[&str] = &["-d", "{domain}", "-p", "{problem}"];

/// Default planner timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// One timed action of a plan, as printed by temporal planners:
/// `0.000: (do_t_a) [4.000]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub start: f64,
    pub action: String,
    pub duration: f64,
}

/// Planner output.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// Raw standard output
    pub text: String,
    /// Steps recognised in `text`, in output order
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Wrap raw planner output.
    pub fn from_text(text: String) -> Self {
        let steps = parse_steps(&text);
        Self { text, steps }
    }
}

/// Something that can solve a domain/problem pair.
pub trait Planner {
    /// Run the planner on the given files.
    fn plan(&self, domain: &Path, problem: &Path) -> Result<Plan>;
}

/// Runs an external program.
#[derive(Debug, Clone)]
pub struct CommandPlanner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPlanner {
    /// Create a planner. `{domain}` and `{problem}` in `args` are replaced
    /// by the file paths at call time.
    pub fn new(command: &str, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            args,
            timeout,
        }
    }

    /// Arguments for one call.
    fn render_args(&self, domain: &Path, problem: &Path) -> Vec<String> {
        let domain = domain.display().to_string();
        let problem = problem.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{domain}", &domain).replace("{problem}", &problem))
            .collect()
    }
}

impl Planner for CommandPlanner {
    fn plan(&self, domain: &Path, problem: &Path) -> Result<Plan> {
        let args = self.render_args(domain, problem);
        tracing::info!(command = %self.command, ?args, "running planner");

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Planner(format!("Failed to run {}: {}", self.command, e)))?;

        // Drain both pipes so a chatty planner cannot block on a full buffer
        let stdout = child.stdout.take().map(|pipe| thread::spawn(move || drain(pipe)));
        let stderr = child.stderr.take().map(|pipe| thread::spawn(move || drain(pipe)));

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(
                    command = %self.command,
                    timeout = ?self.timeout,
                    "planner timed out"
                );
                return Err(Error::Planner(format!(
                    "{} timed out after {}s",
                    self.command,
                    self.timeout.as_secs_f64()
                )));
            }
        };

        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        tracing::debug!(code = ?status.code(), stdout_len = stdout.len(), "planner exited");

        if !status.success() {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(Error::Planner(format!(
                "{} exited with {}: {}",
                self.command,
                status.code().map_or_else(|| "signal".to_string(), |c| c.to_string()),
                detail
            )));
        }
        if stdout.trim().is_empty() {
            return Err(Error::Planner(format!("{} produced no output", self.command)));
        }

        Ok(Plan::from_text(stdout))
    }
}

fn drain(mut pipe: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Extract `start: (action) [duration]` lines.
pub fn parse_steps(text: &str) -> Vec<PlanStep> {
    text.lines().filter_map(parse_step).collect()
}

fn parse_step(line: &str) -> Option<PlanStep> {
    let (start, rest) = line.trim().split_once(':')?;
    let start = start.trim().parse::<f64>().ok()?;

    let rest = rest.trim().strip_prefix('(')?;
    let (action, rest) = rest.split_once(')')?;
    let duration = rest.trim().strip_prefix('[')?.strip_suffix(']')?;
    let duration = duration.trim().parse::<f64>().ok()?;

    Some(PlanStep {
        start,
        action: action.trim().to_string(),
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let text = "; Plan found\n\
                    0.000: (do_t_a)  [4.000]\n\
                    4.001: (do_t_b) [2.500]\n\
                    ; Cost: 6.501\n\
                    garbage line\n";
        let steps = parse_steps(text);
        assert_eq!(
            steps,
            vec![
                PlanStep { start: 0.0, action: "do_t_a".to_string(), duration: 4.0 },
                PlanStep { start: 4.001, action: "do_t_b".to_string(), duration: 2.5 },
            ]
        );
    }

    #[test]
    fn test_render_args() {
        let planner = CommandPlanner::new(
            "optic",
            DEFAULT_PLANNER_ARGS.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(1),
        );
        let args = planner.render_args(Path::new("/w/d.pddl"), Path::new("/w/p.pddl"));
        assert_eq!(args, vec!["-d", "/w/d.pddl", "-p", "/w/p.pddl"]);
    }

    #[test]
    fn test_missing_program_is_planner_error() {
        let planner = CommandPlanner::new("gw-no-such-planner", vec![], Duration::from_secs(1));
        let err = planner.plan(Path::new("d"), Path::new("p")).unwrap_err();
        assert!(matches!(err, Error::Planner(_)));
    }

    #[cfg(unix)]
    fn sh(script: &str, timeout: Duration) -> CommandPlanner {
        CommandPlanner::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_returns_stdout() {
        let planner = sh(
            "echo \"0.000: (do_t_x) [1.000]\"; echo {problem}",
            Duration::from_secs(10),
        );
        let plan = planner.plan(Path::new("d.pddl"), Path::new("p.pddl")).unwrap();
        assert!(plan.text.contains("p.pddl"));
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, "do_t_x");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let planner = sh("echo 'bad domain' >&2; exit 3", Duration::from_secs(10));
        let err = planner.plan(Path::new("d"), Path::new("p")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exited with 3"));
        assert!(msg.contains("bad domain"));
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_is_failure() {
        let planner = sh("true", Duration::from_secs(10));
        assert!(matches!(
            planner.plan(Path::new("d"), Path::new("p")),
            Err(Error::Planner(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_planner() {
        let planner = sh("sleep 5", Duration::from_millis(200));
        let err = planner.plan(Path::new("d"), Path::new("p")).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
