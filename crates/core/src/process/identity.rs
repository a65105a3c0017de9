//! Process identity resolution.
//!
//! Given a persisted PID, decides whether the process it names still
//! exists, still looks like the supervised stream, and is still alive.
//! Also enumerates stray members of the stream family so forced cleanup
//! can terminate orphans the stop command missed.

use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// What the identity resolver concluded about a recorded PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStatus {
    /// No process with that PID exists.
    Missing,
    /// A process exists but its name/arguments do not carry the expected
    /// signature; it is somebody else's process.
    Foreign,
    /// The process exists and matches but the OS reports it dead/zombie.
    Dead,
    /// The process exists, matches, and is alive.
    Alive,
}

/// Read-and-kill access to the process table.
///
/// The supervisor and monitors depend on this trait rather than on
/// `sysinfo` directly so tests can substitute a deterministic probe.
pub trait ProcessProbe: Send + Sync {
    /// Resolve the status of the process identified by `pid`.
    fn status_of(&self, pid: u32) -> IdentityStatus;

    /// PIDs of every process whose name or argument content carries the
    /// stream signature, excluding the supervisor itself.
    fn find_family(&self) -> Vec<u32>;

    /// Terminate the process identified by `pid`. Returns whether the
    /// termination signal was delivered.
    fn terminate(&self, pid: u32) -> bool;
}

/// `sysinfo`-backed probe.
pub struct SysinfoProbe {
    signature: String,
    system: std::sync::Mutex<System>,
}

impl SysinfoProbe {
    /// Create a probe matching processes against `signature`.
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            system: std::sync::Mutex::new(System::new()),
        }
    }

    fn matches(&self, process: &Process) -> bool {
        if process.name().to_string_lossy().contains(&self.signature) {
            return true;
        }
        process
            .cmd()
            .iter()
            .any(|arg| arg.to_string_lossy().contains(&self.signature))
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always)
    }
}

impl ProcessProbe for SysinfoProbe {
    fn status_of(&self, pid: u32) -> IdentityStatus {
        let target = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            Self::refresh_kind(),
        );

        let Some(process) = system.process(target) else {
            return IdentityStatus::Missing;
        };

        if !self.matches(process) {
            debug!(
                "PID {pid} exists but does not look like '{}': {}",
                self.signature,
                process.name().to_string_lossy()
            );
            return IdentityStatus::Foreign;
        }

        match process.status() {
            ProcessStatus::Zombie | ProcessStatus::Dead => IdentityStatus::Dead,
            _ => IdentityStatus::Alive,
        }
    }

    fn find_family(&self) -> Vec<u32> {
        let own_pid = std::process::id();
        let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, Self::refresh_kind());

        system
            .processes()
            .iter()
            .filter(|(pid, process)| pid.as_u32() != own_pid && self.matches(process))
            .map(|(pid, _)| pid.as_u32())
            .collect()
    }

    fn terminate(&self, pid: u32) -> bool {
        let target = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            Self::refresh_kind(),
        );

        match system.process(target) {
            Some(process) => process.kill(),
            None => false,
        }
    }
}
