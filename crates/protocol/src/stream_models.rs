//! Stream lifecycle state models.
//!
//! This module defines the canonical lifecycle state of the supervised
//! stream process, the set of transitions the state machine core accepts,
//! and the mapping from each state to the status indicator's visual mode.

use serde::{Deserialize, Serialize};

/// Represents the current lifecycle state of the supervised stream.
///
/// Exactly one value is current at any instant. The value is owned
/// exclusively by the state machine core; monitors and trigger handlers
/// read and mutate it only through the core's serialized operations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamState {
    /// Nothing is believed to be running. Initial state.
    Idle,

    /// A start attempt is in flight: the launch command is running or the
    /// supervisor is waiting for the started process to appear.
    Starting,

    /// The stream process is believed to be running.
    Running,

    /// A stop attempt is in flight, including forced cleanup.
    Stopping,

    /// The configured maximum of consecutive start failures was reached.
    ///
    /// A later trigger event starts a fresh attempt; recovery is manual.
    Error,

    /// Reserved for probe-failure ambiguity. Not reached in normal
    /// operation.
    Unknown,
}

impl StreamState {
    /// Whether the state machine accepts a transition to `target`.
    ///
    /// Covers both trigger-driven transitions (`Idle|Error -> Starting`,
    /// `Running -> Stopping`), sequence outcomes (`Starting -> Running |
    /// Idle | Error`, `Stopping -> Idle`), and monitor corrections
    /// (`Running -> Idle`, `Idle|Error -> Running`). Same-state
    /// "transitions" are not valid; callers treat them as logged no-ops.
    pub fn can_transition_to(self, target: StreamState) -> bool {
        use StreamState::*;
        match (self, target) {
            (Idle, Starting) | (Error, Starting) => true,
            (Running, Stopping) => true,
            (Starting, Running) | (Starting, Idle) | (Starting, Error) => true,
            (Stopping, Idle) => true,
            // Monitor corrections toward observed reality.
            (Idle, Running) | (Error, Running) | (Running, Idle) => true,
            (Unknown, Idle) | (Unknown, Running) => true,
            _ => false,
        }
    }

    /// Whether a start or stop sequence is currently in flight.
    pub fn is_transitional(self) -> bool {
        matches!(self, StreamState::Starting | StreamState::Stopping)
    }

    /// The indicator mode that visually represents this state.
    pub fn indicator_mode(self) -> IndicatorMode {
        match self {
            StreamState::Idle => IndicatorMode::Off,
            StreamState::Starting => IndicatorMode::SlowBlink,
            StreamState::Running => IndicatorMode::SolidOn,
            StreamState::Stopping => IndicatorMode::FastBlink,
            StreamState::Error => IndicatorMode::VeryFastBlink,
            StreamState::Unknown => IndicatorMode::Off,
        }
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StreamState::Idle => "idle",
            StreamState::Starting => "starting",
            StreamState::Running => "running",
            StreamState::Stopping => "stopping",
            StreamState::Error => "error",
            StreamState::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Visual mode of the status indicator.
///
/// The blink periods are carried by the indicator implementation; the
/// supervisor only selects the mode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorMode {
    /// Indicator dark (Idle).
    Off,

    /// Blink with a period around 1s (Starting).
    SlowBlink,

    /// Continuously lit (Running).
    SolidOn,

    /// Blink with a period around 0.2s (Stopping).
    FastBlink,

    /// Blink with a period around 0.1s (Error).
    VeryFastBlink,
}

impl std::fmt::Display for IndicatorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndicatorMode::Off => "off",
            IndicatorMode::SlowBlink => "slow-blink",
            IndicatorMode::SolidOn => "solid-on",
            IndicatorMode::FastBlink => "fast-blink",
            IndicatorMode::VeryFastBlink => "very-fast-blink",
        };
        write!(f, "{name}")
    }
}
