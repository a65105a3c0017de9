//! Common test utilities shared across integration tests.
//!
//! This module provides:
//! - Deterministic doubles for the command runner, process probe, and
//!   status indicator
//! - A harness bundling a fully wired state machine with its doubles
//! - Small async helpers for waiting on state changes

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
#[allow(unused_imports)]
pub use mocks::*;

use sp_core::state::machine::StateMachine;
use sp_protocol::stream_models::StreamState;
use std::sync::Arc;
use std::time::Duration;

/// Poll until the machine reaches `target` or `limit` elapses.
#[allow(dead_code)]
pub async fn wait_for_state(
    machine: &Arc<StateMachine>,
    target: StreamState,
    limit: Duration,
) -> bool {
    let deadline = std::time::Instant::now() + limit;
    loop {
        if machine.current_state().await == target {
            return true;
        }
        if std::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
