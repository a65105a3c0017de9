//! Test fixtures: fast configurations and a wired state machine harness.

use crate::common::mocks::{MockProbe, MockRunner, RecordingIndicator};
use sp_core::process::RecordStore;
use sp_core::shutdown::ShutdownSignal;
use sp_core::state::machine::StateMachine;
use sp_protocol::config_models::SupervisorConfig;
use std::sync::Arc;
use tempfile::TempDir;

/// A configuration with timings shrunk so sequences settle in
/// milliseconds instead of minutes.
///
/// The peer points at a local port nothing listens on: the advisory probe
/// fails fast and exercises the warn-only path.
#[allow(dead_code)]
pub fn fast_config(dir: &TempDir) -> SupervisorConfig {
    SupervisorConfig {
        log_file: dir.path().join("test.log"),
        record_file: dir.path().join("stream.pid"),
        peer_host: "127.0.0.1".to_string(),
        peer_port: 1,
        connect_timeout_secs: 1,
        health_interval_secs: 1,
        max_start_attempts: 3,
        start_timeout_secs: 5,
        start_poll_interval_secs: 1,
        start_poll_timeout_secs: 0,
        stop_timeout_secs: 5,
        stop_poll_interval_secs: 1,
        stop_poll_timeout_secs: 0,
        stuck_interval_secs: 1,
        debounce_window_ms: 50,
        ..SupervisorConfig::default()
    }
}

/// A fully wired state machine with recording doubles.
#[allow(dead_code)]
pub struct Harness {
    pub machine: Arc<StateMachine>,
    pub runner: Arc<MockRunner>,
    pub probe: Arc<MockProbe>,
    pub records: RecordStore,
    pub indicator: Arc<RecordingIndicator>,
    pub shutdown: ShutdownSignal,
    pub config: SupervisorConfig,
}

#[allow(dead_code)]
pub fn build_harness(dir: &TempDir) -> Harness {
    build_harness_with(dir, MockRunner::new(), MockProbe::new(), fast_config(dir))
}

#[allow(dead_code)]
pub fn build_harness_with(
    _dir: &TempDir,
    runner: MockRunner,
    probe: MockProbe,
    config: SupervisorConfig,
) -> Harness {
    let runner = Arc::new(runner);
    let probe = Arc::new(probe);
    let indicator = Arc::new(RecordingIndicator::new());
    let records = RecordStore::new(&config.record_file);
    let shutdown = ShutdownSignal::new();

    let machine = Arc::new(StateMachine::new(
        config.clone(),
        runner.clone(),
        probe.clone(),
        records.clone(),
        indicator.clone(),
        shutdown.clone(),
    ));

    Harness {
        machine,
        runner,
        probe,
        records,
        indicator,
        shutdown,
        config,
    }
}
