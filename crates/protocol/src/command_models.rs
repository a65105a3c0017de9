//! Launch command models.
//!
//! The external launch program is invoked with a single verb argument and
//! reports back through its exit code and captured output. These types
//! carry that boundary; the executor that enforces the timeout lives in
//! `sp-core`.

use serde::{Deserialize, Serialize};

/// The verb passed to the external launch program.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandVerb {
    /// Start the stream.
    Start,
    /// Stop the stream.
    Stop,
}

impl CommandVerb {
    /// The literal argument handed to the launch program.
    pub fn as_arg(self) -> &'static str {
        match self {
            CommandVerb::Start => "start",
            CommandVerb::Stop => "stop",
        }
    }
}

impl std::fmt::Display for CommandVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

/// Result of one launch command invocation.
///
/// The caller enforces the timeout; the external program is not assumed
/// to enforce its own.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The program ran to completion within the timeout.
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// The program was still running when the timeout elapsed and was
    /// killed.
    TimedOut { waited_secs: u64 },

    /// The program could not be spawned at all.
    SpawnFailed { reason: String },
}

impl CommandOutcome {
    /// Whether the invocation completed with exit code zero.
    pub fn success(&self) -> bool {
        matches!(self, CommandOutcome::Completed { exit_code: 0, .. })
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            CommandOutcome::Completed { exit_code, .. } => {
                format!("exited with code {exit_code}")
            }
            CommandOutcome::TimedOut { waited_secs } => {
                format!("timed out after {waited_secs}s")
            }
            CommandOutcome::SpawnFailed { reason } => {
                format!("failed to spawn: {reason}")
            }
        }
    }
}
