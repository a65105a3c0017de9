//! Bounded-timeout executor for the external launch program.
//!
//! The launch program is an opaque script invoked with a single verb
//! (`start` or `stop`). The executor enforces the timeout itself, since
//! the program is not trusted to, and captures exit code, stdout, and stderr
//! for the state machine's logs. Invocations are serialized: the executor
//! is never run concurrently with itself.

use async_trait::async_trait;
use sp_protocol::command_models::{CommandOutcome, CommandVerb};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors raised by the preflight check.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The launch program is missing or not executable.
    #[error("Launch command not available at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        source: which::Error,
    },
}

/// Runs the external launch program.
///
/// Behind a trait so the state machine can be exercised with a scripted
/// fake in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Verify the launch program exists and is executable.
    fn preflight(&self) -> Result<(), CommandError>;

    /// Invoke the launch program with `verb`, killing it if it outlives
    /// `limit`. Never returns an error: every way the invocation can go
    /// wrong is a [`CommandOutcome`] variant.
    async fn run(&self, verb: CommandVerb, limit: Duration) -> CommandOutcome;
}

/// The working directory the supervisor runs launch commands from: the
/// directory holding the supervisor binary itself, falling back to the
/// current directory.
pub fn supervisor_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Executor invoking a launch script on disk.
pub struct ScriptRunner {
    command_path: PathBuf,
    working_dir: PathBuf,
    run_lock: tokio::sync::Mutex<()>,
}

impl ScriptRunner {
    /// Create a runner for `command_path`, executed from `working_dir`.
    pub fn new<P: AsRef<Path>, W: AsRef<Path>>(command_path: P, working_dir: W) -> Self {
        Self {
            command_path: command_path.as_ref().to_path_buf(),
            working_dir: working_dir.as_ref().to_path_buf(),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptRunner {
    fn preflight(&self) -> Result<(), CommandError> {
        which::which(&self.command_path)
            .map(|_| ())
            .map_err(|source| CommandError::Unavailable {
                path: self.command_path.clone(),
                source,
            })
    }

    async fn run(&self, verb: CommandVerb, limit: Duration) -> CommandOutcome {
        let _guard = self.run_lock.lock().await;

        debug!(
            "Running {} {} (timeout {}s)",
            self.command_path.display(),
            verb,
            limit.as_secs()
        );

        let mut cmd = Command::new(&self.command_path);
        cmd.arg(verb.as_arg());
        cmd.current_dir(&self.working_dir);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // A timed-out invocation is dropped mid-wait; this makes the drop
        // kill the child instead of leaking it.
        cmd.kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CommandOutcome::SpawnFailed {
                    reason: e.to_string(),
                }
            }
        };

        match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => CommandOutcome::Completed {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(Err(e)) => CommandOutcome::SpawnFailed {
                reason: e.to_string(),
            },
            Err(_) => {
                warn!(
                    "{} {} exceeded its {}s timeout and was killed",
                    self.command_path.display(),
                    verb,
                    limit.as_secs()
                );
                CommandOutcome::TimedOut {
                    waited_secs: limit.as_secs(),
                }
            }
        }
    }
}
