//! Integration tests for the state machine core: trigger dispatch, the
//! start/stop sequences, and the retry policy.

mod common;

use common::*;
use sp_protocol::command_models::CommandVerb;
use sp_protocol::stream_models::{IndicatorMode, StreamState};
use std::time::Duration;

const STREAM_PID: u32 = 4321;

#[tokio::test]
async fn test_successful_start_reaches_running() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    harness
        .runner
        .queue_success_with_record(harness.config.record_file.clone(), STREAM_PID);
    harness.probe.set_alive(STREAM_PID);

    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Running);
    assert_eq!(harness.machine.start_failures().await, 0);
    assert_eq!(harness.indicator.last(), Some(IndicatorMode::SolidOn));
    assert_eq!(harness.runner.calls(), vec![CommandVerb::Start]);
    assert_eq!(
        harness.records.read().expect("Record should be readable"),
        Some(STREAM_PID)
    );
}

#[tokio::test]
async fn test_start_indicator_blinks_during_sequence() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    harness
        .runner
        .queue_success_with_record(harness.config.record_file.clone(), STREAM_PID);
    harness.probe.set_alive(STREAM_PID);

    harness.machine.handle_press().await;

    let history = harness.indicator.history();
    assert_eq!(
        history,
        vec![IndicatorMode::SlowBlink, IndicatorMode::SolidOn]
    );
}

#[tokio::test]
async fn test_start_failure_returns_to_idle_and_counts() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    harness.runner.queue_exit(1);

    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Idle);
    assert_eq!(harness.machine.start_failures().await, 1);
    assert_eq!(harness.indicator.last(), Some(IndicatorMode::Off));
}

#[tokio::test]
async fn test_start_timeout_counts_as_failure() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    harness.runner.queue_timeout();

    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Idle);
    assert_eq!(harness.machine.start_failures().await, 1);
}

#[tokio::test]
async fn test_start_without_appearing_process_counts_as_failure() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    // Command exits 0 but never writes a record.
    harness.runner.queue_success();

    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Idle);
    assert_eq!(harness.machine.start_failures().await, 1);
}

#[tokio::test]
async fn test_three_failures_reach_error_and_reset_counter() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    assert_eq!(harness.config.max_start_attempts, 3);

    for expected_failures in [1, 2] {
        harness.runner.queue_exit(1);
        harness.machine.handle_press().await;
        assert_eq!(harness.machine.current_state().await, StreamState::Idle);
        assert_eq!(
            harness.machine.start_failures().await,
            expected_failures
        );
    }

    harness.runner.queue_exit(1);
    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Error);
    assert_eq!(
        harness.machine.start_failures().await,
        0,
        "Counter must reset when the limit forces the error state"
    );
    assert_eq!(harness.indicator.last(), Some(IndicatorMode::VeryFastBlink));
}

#[tokio::test]
async fn test_successful_start_from_error_resets_streak() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);

    for _ in 0..3 {
        harness.runner.queue_exit(1);
        harness.machine.handle_press().await;
    }
    assert_eq!(harness.machine.current_state().await, StreamState::Error);

    harness
        .runner
        .queue_success_with_record(harness.config.record_file.clone(), STREAM_PID);
    harness.probe.set_alive(STREAM_PID);
    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Running);
    assert_eq!(harness.machine.start_failures().await, 0);

    // Stop the stream, then fail one start: the streak restarts at 1.
    harness.runner.queue_success();
    harness.machine.handle_press().await;
    assert_eq!(harness.machine.current_state().await, StreamState::Idle);

    harness.runner.queue_exit(1);
    harness.machine.handle_press().await;
    assert_eq!(harness.machine.start_failures().await, 1);
}

#[tokio::test]
async fn test_preflight_failure_aborts_attempt_without_running_command() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness_with(
        &dir,
        MockRunner::unavailable(),
        MockProbe::new(),
        fast_config(&dir),
    );

    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Idle);
    assert_eq!(harness.machine.start_failures().await, 1);
    assert_eq!(harness.runner.call_count(), 0);
}

#[tokio::test]
async fn test_stop_ends_idle_and_removes_record() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    harness
        .runner
        .queue_success_with_record(harness.config.record_file.clone(), STREAM_PID);
    harness.probe.set_alive(STREAM_PID);
    harness.machine.handle_press().await;
    assert_eq!(harness.machine.current_state().await, StreamState::Running);

    harness.probe.add_family(STREAM_PID);
    harness.runner.queue_success();
    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Idle);
    assert!(!harness.records.exists(), "Stop must remove the record");
    assert_eq!(harness.probe.killed(), vec![STREAM_PID]);
    assert_eq!(harness.indicator.last(), Some(IndicatorMode::Off));
    assert_eq!(
        harness.runner.calls(),
        vec![CommandVerb::Start, CommandVerb::Stop]
    );
}

#[tokio::test]
async fn test_stop_timeout_still_cleans_up_and_ends_idle() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    harness
        .runner
        .queue_success_with_record(harness.config.record_file.clone(), STREAM_PID);
    harness.probe.set_alive(STREAM_PID);
    harness.machine.handle_press().await;

    harness.probe.add_family(STREAM_PID);
    harness.runner.queue_timeout();
    harness.machine.handle_press().await;

    assert_eq!(harness.machine.current_state().await, StreamState::Idle);
    assert!(!harness.records.exists());
    assert_eq!(harness.probe.killed(), vec![STREAM_PID]);
}

#[tokio::test]
async fn test_stop_proceeds_when_orphan_survives_cleanup() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let probe = MockProbe::with_stubborn_family();
    let harness = build_harness_with(&dir, MockRunner::new(), probe, fast_config(&dir));
    harness
        .runner
        .queue_success_with_record(harness.config.record_file.clone(), STREAM_PID);
    harness.probe.set_alive(STREAM_PID);
    harness.machine.handle_press().await;

    harness.probe.add_family(STREAM_PID);
    harness.runner.queue_exit(1);
    harness.machine.handle_press().await;

    // The orphan survived, but the stop path still terminates in idle.
    assert_eq!(harness.machine.current_state().await, StreamState::Idle);
    assert!(!harness.records.exists());
    assert!(!harness.probe.killed().is_empty());
}

#[tokio::test]
async fn test_press_during_start_is_ignored() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let harness = build_harness(&dir);
    harness.runner.queue_delayed_success_with_record(
        Duration::from_millis(300),
        harness.config.record_file.clone(),
        STREAM_PID,
    );
    harness.probe.set_alive(STREAM_PID);

    let machine = harness.machine.clone();
    let start_task = tokio::spawn(async move { machine.handle_press().await });

    assert!(
        wait_for_state(&harness.machine, StreamState::Starting, Duration::from_secs(2)).await
    );

    // A direct press during the in-flight start is a logged no-op.
    harness.machine.handle_press().await;
    assert_eq!(harness.runner.call_count(), 1);

    start_task.await.expect("Start task should finish");
    assert_eq!(harness.machine.current_state().await, StreamState::Running);
}
