//! Trigger event debouncer.
//!
//! Physical triggers fire arbitrarily often; only the first event in each
//! debounce window is forwarded, and nothing is forwarded while a start or
//! stop sequence is in flight.

use sp_protocol::stream_models::StreamState;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// What to do with an incoming press event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressDecision {
    /// Forward to the state machine's press handler.
    Forward,
    /// Dropped: arrived within the debounce window of the last accepted
    /// event.
    TooSoon,
    /// Dropped: a start/stop sequence is in flight.
    Busy,
}

/// Filters rapid and ill-timed trigger events.
pub struct Debouncer {
    window: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(None),
        }
    }

    /// Decide what to do with a press event arriving now, given the
    /// current stream state.
    ///
    /// Only a [`PressDecision::Forward`] outcome counts as accepted and
    /// re-anchors the debounce window; dropped events do not.
    pub async fn assess(&self, state: StreamState) -> PressDecision {
        let mut last = self.last_accepted.lock().await;

        if let Some(accepted_at) = *last {
            let since = accepted_at.elapsed();
            if since < self.window {
                debug!(
                    "Press ignored: {}ms since last accepted press (window {}ms)",
                    since.as_millis(),
                    self.window.as_millis()
                );
                return PressDecision::TooSoon;
            }
        }

        if state.is_transitional() {
            info!("Press ignored: busy ({state})");
            return PressDecision::Busy;
        }

        *last = Some(Instant::now());
        PressDecision::Forward
    }
}
