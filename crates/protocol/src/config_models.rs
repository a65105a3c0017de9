//! Supervisor configuration models.
//!
//! This module defines the structure of the `streampilot.toml` configuration
//! file. Every field has a default, so a missing file or a partial file is
//! valid. The loader in `sp-core` applies `STREAMPILOT_*` environment
//! overrides on top of whatever the file provided.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved supervisor configuration.
///
/// Durations are stored in integral units (`_secs` / `_ms` suffix) so they
/// round-trip through TOML and the environment; the accessor methods hand
/// out [`Duration`] values to the rest of the system.
///
/// # Example
///
/// ```toml
/// # streampilot.toml
/// command_path = "./launch-stream.sh"
/// process_name = "moonlight"
/// max_start_attempts = 3
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// Log destination path.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Path of the persisted process record (a file holding the PID).
    #[serde(default = "default_record_file")]
    pub record_file: PathBuf,

    /// Channel identifier of the trigger input (e.g. a GPIO pin number for
    /// hardware-backed trigger sources).
    #[serde(default = "default_trigger_channel")]
    pub trigger_channel: u32,

    /// Channel identifier of the status indicator.
    #[serde(default = "default_indicator_channel")]
    pub indicator_channel: u32,

    /// The external launch program, invoked with a `start`/`stop` verb.
    #[serde(default = "default_command_path")]
    pub command_path: PathBuf,

    /// Name signature of the supervised process. A process belongs to the
    /// stream family when its name or argument content contains this.
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Host of the companion peer probed for reachability.
    #[serde(default = "default_peer_host")]
    pub peer_host: String,

    /// Port of the companion peer.
    #[serde(default = "default_peer_port")]
    pub peer_port: u16,

    /// Interval between health monitor ticks.
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,

    /// Timeout for the TCP reachability probe.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Consecutive start failures tolerated before the state machine
    /// escalates to the error state.
    #[serde(default = "default_max_start_attempts")]
    pub max_start_attempts: u32,

    /// Timeout for one `start` invocation of the launch program.
    #[serde(default = "default_start_timeout")]
    pub start_timeout_secs: u64,

    /// Interval between checks for the started process to appear.
    #[serde(default = "default_start_poll_interval")]
    pub start_poll_interval_secs: u64,

    /// How long to wait for the started process to appear before the
    /// attempt counts as failed.
    #[serde(default = "default_start_poll_timeout")]
    pub start_poll_timeout_secs: u64,

    /// Timeout for one `stop` invocation of the launch program.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Interval between checks that the stopped process is gone.
    #[serde(default = "default_stop_poll_interval")]
    pub stop_poll_interval_secs: u64,

    /// How long to wait for the stream family to disappear after a stop.
    #[serde(default = "default_stop_poll_timeout")]
    pub stop_poll_timeout_secs: u64,

    /// Interval between stuck-transition watchdog checks.
    #[serde(default = "default_stuck_interval")]
    pub stuck_interval_secs: u64,

    /// How long a start/stop may stay in flight before the watchdog
    /// forces a reset.
    #[serde(default = "default_stuck_timeout")]
    pub stuck_timeout_secs: u64,

    /// Minimum spacing between accepted trigger events.
    #[serde(default = "default_debounce_window")]
    pub debounce_window_ms: u64,

    /// CPU/memory/disk usage percentage above which the health monitor
    /// logs a warning.
    #[serde(default = "default_resource_threshold")]
    pub resource_threshold_pct: f32,

    /// Grace period granted to each background loop on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("./streampilot.log")
}

fn default_record_file() -> PathBuf {
    PathBuf::from("./stream.pid")
}

fn default_trigger_channel() -> u32 {
    17
}

fn default_indicator_channel() -> u32 {
    27
}

fn default_command_path() -> PathBuf {
    PathBuf::from("./launch-stream.sh")
}

fn default_process_name() -> String {
    "moonlight".to_string()
}

fn default_peer_host() -> String {
    "127.0.0.1".to_string()
}

fn default_peer_port() -> u16 {
    47989
}

fn default_health_interval() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_start_attempts() -> u32 {
    3
}

fn default_start_timeout() -> u64 {
    180
}

fn default_start_poll_interval() -> u64 {
    2
}

fn default_start_poll_timeout() -> u64 {
    60
}

fn default_stop_timeout() -> u64 {
    60
}

fn default_stop_poll_interval() -> u64 {
    1
}

fn default_stop_poll_timeout() -> u64 {
    30
}

fn default_stuck_interval() -> u64 {
    5
}

fn default_stuck_timeout() -> u64 {
    120
}

fn default_debounce_window() -> u64 {
    2000
}

fn default_resource_threshold() -> f32 {
    90.0
}

fn default_shutdown_grace() -> u64 {
    5
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            record_file: default_record_file(),
            trigger_channel: default_trigger_channel(),
            indicator_channel: default_indicator_channel(),
            command_path: default_command_path(),
            process_name: default_process_name(),
            peer_host: default_peer_host(),
            peer_port: default_peer_port(),
            health_interval_secs: default_health_interval(),
            connect_timeout_secs: default_connect_timeout(),
            max_start_attempts: default_max_start_attempts(),
            start_timeout_secs: default_start_timeout(),
            start_poll_interval_secs: default_start_poll_interval(),
            start_poll_timeout_secs: default_start_poll_timeout(),
            stop_timeout_secs: default_stop_timeout(),
            stop_poll_interval_secs: default_stop_poll_interval(),
            stop_poll_timeout_secs: default_stop_poll_timeout(),
            stuck_interval_secs: default_stuck_interval(),
            stuck_timeout_secs: default_stuck_timeout(),
            debounce_window_ms: default_debounce_window(),
            resource_threshold_pct: default_resource_threshold(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl SupervisorConfig {
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_secs(self.start_poll_interval_secs)
    }

    pub fn start_poll_timeout(&self) -> Duration {
        Duration::from_secs(self.start_poll_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stop_poll_interval_secs)
    }

    pub fn stop_poll_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_poll_timeout_secs)
    }

    pub fn stuck_interval(&self) -> Duration {
        Duration::from_secs(self.stuck_interval_secs)
    }

    pub fn stuck_timeout(&self) -> Duration {
        Duration::from_secs(self.stuck_timeout_secs)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
