//! Deterministic doubles for the supervisor's collaborators.

use async_trait::async_trait;
use sp_core::command::{CommandError, CommandRunner};
use sp_core::hardware::StatusIndicator;
use sp_core::process::{IdentityStatus, ProcessProbe};
use sp_protocol::command_models::{CommandOutcome, CommandVerb};
use sp_protocol::stream_models::IndicatorMode;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted command invocation.
pub struct ScriptedRun {
    /// Simulated execution time before the outcome is reported.
    pub delay: Duration,
    /// The outcome to report.
    pub outcome: CommandOutcome,
    /// Record file the fake "external command" writes on this run, the
    /// way the real start script persists the stream PID.
    pub write_record: Option<(PathBuf, u32)>,
}

/// A command runner that replays scripted outcomes.
///
/// Runs beyond the scripted queue succeed with exit code 0 and no
/// side effects.
pub struct MockRunner {
    script: Mutex<VecDeque<ScriptedRun>>,
    calls: Mutex<Vec<CommandVerb>>,
    preflight_fails: bool,
}

#[allow(dead_code)]
impl MockRunner {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            preflight_fails: false,
        }
    }

    /// A runner whose preflight always fails.
    pub fn unavailable() -> Self {
        Self {
            preflight_fails: true,
            ..Self::new()
        }
    }

    pub fn queue(&self, run: ScriptedRun) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(run);
    }

    /// Queue a zero-exit run that writes `pid` into the record file.
    pub fn queue_success_with_record(&self, path: PathBuf, pid: u32) {
        self.queue(ScriptedRun {
            delay: Duration::ZERO,
            outcome: ok_outcome(),
            write_record: Some((path, pid)),
        });
    }

    /// Queue a zero-exit run without side effects.
    pub fn queue_success(&self) {
        self.queue(ScriptedRun {
            delay: Duration::ZERO,
            outcome: ok_outcome(),
            write_record: None,
        });
    }

    /// Queue a non-zero exit.
    pub fn queue_exit(&self, exit_code: i32) {
        self.queue(ScriptedRun {
            delay: Duration::ZERO,
            outcome: CommandOutcome::Completed {
                exit_code,
                stdout: String::new(),
                stderr: format!("scripted failure {exit_code}"),
            },
            write_record: None,
        });
    }

    /// Queue a timed-out invocation.
    pub fn queue_timeout(&self) {
        self.queue(ScriptedRun {
            delay: Duration::ZERO,
            outcome: CommandOutcome::TimedOut { waited_secs: 1 },
            write_record: None,
        });
    }

    /// Queue a slow success that also writes the record, for tests that
    /// need to observe the transitional state.
    pub fn queue_delayed_success_with_record(&self, delay: Duration, path: PathBuf, pid: u32) {
        self.queue(ScriptedRun {
            delay,
            outcome: ok_outcome(),
            write_record: Some((path, pid)),
        });
    }

    /// The verbs of every invocation so far.
    pub fn calls(&self) -> Vec<CommandVerb> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }
}

fn ok_outcome() -> CommandOutcome {
    CommandOutcome::Completed {
        exit_code: 0,
        stdout: String::new(),
        stderr: String::new(),
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    fn preflight(&self) -> Result<(), CommandError> {
        if self.preflight_fails {
            Err(CommandError::Unavailable {
                path: PathBuf::from("./missing-launch.sh"),
                source: which::Error::CannotFindBinaryPath,
            })
        } else {
            Ok(())
        }
    }

    async fn run(&self, verb: CommandVerb, _limit: Duration) -> CommandOutcome {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(verb);

        let scripted = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front();

        match scripted {
            Some(run) => {
                if run.delay > Duration::ZERO {
                    tokio::time::sleep(run.delay).await;
                }
                if let Some((path, pid)) = run.write_record {
                    std::fs::write(path, format!("{pid}\n")).expect("mock record write failed");
                }
                run.outcome
            }
            None => ok_outcome(),
        }
    }
}

/// A process probe answering from an in-memory process table.
pub struct MockProbe {
    statuses: Mutex<HashMap<u32, IdentityStatus>>,
    family: Mutex<Vec<u32>>,
    killed: Mutex<Vec<u32>>,
    /// When false, `terminate` reports success but leaves the family
    /// untouched (a stubborn orphan).
    kill_removes: bool,
}

#[allow(dead_code)]
impl MockProbe {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            family: Mutex::new(Vec::new()),
            killed: Mutex::new(Vec::new()),
            kill_removes: true,
        }
    }

    /// A probe whose family members survive termination attempts.
    pub fn with_stubborn_family() -> Self {
        Self {
            kill_removes: false,
            ..Self::new()
        }
    }

    pub fn set_status(&self, pid: u32, status: IdentityStatus) {
        self.statuses
            .lock()
            .expect("statuses lock poisoned")
            .insert(pid, status);
    }

    pub fn set_alive(&self, pid: u32) {
        self.set_status(pid, IdentityStatus::Alive);
    }

    pub fn add_family(&self, pid: u32) {
        self.family
            .lock()
            .expect("family lock poisoned")
            .push(pid);
    }

    /// PIDs terminated so far.
    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().expect("killed lock poisoned").clone()
    }
}

impl ProcessProbe for MockProbe {
    fn status_of(&self, pid: u32) -> IdentityStatus {
        self.statuses
            .lock()
            .expect("statuses lock poisoned")
            .get(&pid)
            .copied()
            .unwrap_or(IdentityStatus::Missing)
    }

    fn find_family(&self) -> Vec<u32> {
        self.family.lock().expect("family lock poisoned").clone()
    }

    fn terminate(&self, pid: u32) -> bool {
        self.killed.lock().expect("killed lock poisoned").push(pid);
        if self.kill_removes {
            self.family
                .lock()
                .expect("family lock poisoned")
                .retain(|p| *p != pid);
            self.statuses
                .lock()
                .expect("statuses lock poisoned")
                .insert(pid, IdentityStatus::Missing);
        }
        true
    }
}

/// An indicator that records every mode it is asked to show.
pub struct RecordingIndicator {
    history: Mutex<Vec<IndicatorMode>>,
}

#[allow(dead_code)]
impl RecordingIndicator {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn last(&self) -> Option<IndicatorMode> {
        self.history
            .lock()
            .expect("history lock poisoned")
            .last()
            .copied()
    }

    pub fn history(&self) -> Vec<IndicatorMode> {
        self.history.lock().expect("history lock poisoned").clone()
    }
}

#[async_trait]
impl StatusIndicator for RecordingIndicator {
    async fn set_mode(&self, mode: IndicatorMode) {
        self.history
            .lock()
            .expect("history lock poisoned")
            .push(mode);
    }
}
