//! State machine core.
//!
//! Owns the canonical [`StreamState`] and the transition context behind a
//! single mutex, so trigger-driven transitions and monitor corrections
//! never interleave. The long-running parts of the start and stop
//! sequences (command invocation, appearance/disappearance polling, the
//! reachability probe) run outside the lock; only the state reads and
//! writes bracketing them are serialized.

use crate::checks;
use crate::command::CommandRunner;
use crate::hardware::StatusIndicator;
use crate::process::{IdentityStatus, ProcessProbe, RecordStore};
use crate::shutdown::ShutdownSignal;
use sp_protocol::command_models::{CommandOutcome, CommandVerb};
use sp_protocol::config_models::SupervisorConfig;
use sp_protocol::stream_models::StreamState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Ephemeral bookkeeping attached to the current state.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    /// When the state last changed.
    pub last_transition: Instant,
    /// When the last trigger event was accepted.
    pub last_trigger: Option<Instant>,
    /// Consecutive failed start attempts. Reset on success and when the
    /// configured maximum forces the error state.
    pub start_failures: u32,
}

impl TransitionContext {
    fn new() -> Self {
        Self {
            last_transition: Instant::now(),
            last_trigger: None,
            start_failures: 0,
        }
    }
}

struct CoreState {
    state: StreamState,
    ctx: TransitionContext,
}

/// The lifecycle state machine.
///
/// All mutation goes through `&self` methods that briefly take the inner
/// lock; the machine is shared between the press pump and both monitors
/// as an `Arc<StateMachine>`.
pub struct StateMachine {
    inner: Mutex<CoreState>,
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn ProcessProbe>,
    records: RecordStore,
    indicator: Arc<dyn StatusIndicator>,
    config: SupervisorConfig,
    shutdown: ShutdownSignal,
}

impl StateMachine {
    pub fn new(
        config: SupervisorConfig,
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn ProcessProbe>,
        records: RecordStore,
        indicator: Arc<dyn StatusIndicator>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            inner: Mutex::new(CoreState {
                state: StreamState::Idle,
                ctx: TransitionContext::new(),
            }),
            runner,
            probe,
            records,
            indicator,
            config,
            shutdown,
        }
    }

    /// The current lifecycle state.
    pub async fn current_state(&self) -> StreamState {
        self.inner.lock().await.state
    }

    /// Consecutive failed start attempts so far.
    pub async fn start_failures(&self) -> u32 {
        self.inner.lock().await.ctx.start_failures
    }

    /// Record that a trigger event was accepted.
    pub async fn note_trigger(&self) {
        self.inner.lock().await.ctx.last_trigger = Some(Instant::now());
    }

    /// Re-emit the indicator mode for the current state.
    pub async fn indicate_current(&self) {
        let mode = self.current_state().await.indicator_mode();
        self.indicator.set_mode(mode).await;
    }

    /// Turn the indicator off (used on supervisor shutdown).
    pub async fn clear_indicator(&self) {
        self.indicator
            .set_mode(sp_protocol::stream_models::IndicatorMode::Off)
            .await;
    }

    /// Dispatch an accepted trigger event.
    ///
    /// `Running` stops the stream, `Idle`/`Error` starts it. Transitional
    /// states are logged as busy (the debouncer normally filters these
    /// before they get here); anything else is an unexpected-state log.
    pub async fn handle_press(&self) {
        match self.current_state().await {
            StreamState::Running => self.stop_sequence().await,
            StreamState::Idle | StreamState::Error => self.start_sequence().await,
            state @ (StreamState::Starting | StreamState::Stopping) => {
                info!("Trigger ignored: busy ({state})");
            }
            state => warn!("Trigger in unexpected state {state}, no action"),
        }
    }

    /// Attempt a transition to `target`.
    ///
    /// Same-state transitions are logged no-ops; invalid transitions are
    /// refused with a warning. On success the transition timestamp and
    /// the indicator are updated.
    async fn transition(&self, target: StreamState) -> bool {
        let from = {
            let mut inner = self.inner.lock().await;
            if inner.state == target {
                debug!("Ignoring transition to current state {target}");
                return false;
            }
            if !inner.state.can_transition_to(target) {
                warn!("Refusing invalid transition {} -> {target}", inner.state);
                return false;
            }
            let from = inner.state;
            inner.state = target;
            inner.ctx.last_transition = Instant::now();
            from
        };

        info!("State transition: {from} -> {target}");
        self.indicator.set_mode(target.indicator_mode()).await;
        true
    }

    // ---- start path -----------------------------------------------------

    /// Run one start attempt: preflight, launch command, wait for the
    /// stream process to appear.
    async fn start_sequence(&self) {
        if !self.transition(StreamState::Starting).await {
            return;
        }

        if let Err(e) = self.runner.preflight() {
            error!("Start aborted: {e}");
            self.register_start_failure(&e.to_string()).await;
            return;
        }

        match checks::probe_peer(
            &self.config.peer_host,
            self.config.peer_port,
            self.config.connect_timeout(),
        )
        .await
        {
            Ok(()) => debug!(
                "Peer {}:{} reachable before start",
                self.config.peer_host, self.config.peer_port
            ),
            Err(e) => warn!(
                "Peer {}:{} not reachable before start: {e}",
                self.config.peer_host, self.config.peer_port
            ),
        }

        let outcome = self
            .runner
            .run(CommandVerb::Start, self.config.start_timeout())
            .await;

        if !outcome.success() {
            if let CommandOutcome::Completed { stderr, .. } = &outcome {
                if !stderr.trim().is_empty() {
                    warn!("Start command stderr: {}", stderr.trim());
                }
            }
            self.register_start_failure(&outcome.describe()).await;
            return;
        }

        if let Some(pid) = self.await_stream_appearance().await {
            self.finish_start_success(pid).await;
        } else if self.shutdown.is_requested() {
            warn!("Shutdown during start poll; leaving state to the monitors");
        } else {
            let waited = self.config.start_poll_timeout_secs;
            self.register_start_failure(&format!(
                "stream process did not appear within {waited}s"
            ))
            .await;
        }
    }

    /// Poll for a matching process record after a successful start
    /// command. Returns the PID when one appears in time.
    async fn await_stream_appearance(&self) -> Option<u32> {
        let deadline = Instant::now() + self.config.start_poll_timeout();
        loop {
            if let Some(pid) = self.read_record_logged() {
                if self.probe.status_of(pid) == IdentityStatus::Alive {
                    return Some(pid);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            if !self
                .shutdown
                .sleep_cancellable(self.config.start_poll_interval())
                .await
            {
                return None;
            }
        }
    }

    async fn finish_start_success(&self, pid: u32) {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != StreamState::Starting {
                // A watchdog reset or monitor correction won the race.
                warn!(
                    "Start success for PID {pid} arrived in state {}, ignoring",
                    inner.state
                );
                return;
            }
            inner.state = StreamState::Running;
            inner.ctx.last_transition = Instant::now();
            inner.ctx.start_failures = 0;
        }

        info!("Stream started (PID {pid})");
        self.indicator
            .set_mode(StreamState::Running.indicator_mode())
            .await;
    }

    /// Account a failed start attempt and settle the resulting state:
    /// `Idle` below the attempt limit, `Error` once it is reached.
    async fn register_start_failure(&self, reason: &str) {
        let max = self.config.max_start_attempts;
        let target = {
            let mut inner = self.inner.lock().await;
            if inner.state != StreamState::Starting {
                warn!("Start failure ({reason}) arrived in state {}, ignoring", inner.state);
                return;
            }
            inner.ctx.start_failures += 1;
            let failures = inner.ctx.start_failures;
            let target = if failures >= max {
                error!(
                    "Start failed ({reason}); attempt limit {max} reached, entering error state"
                );
                inner.ctx.start_failures = 0;
                StreamState::Error
            } else {
                warn!(
                    "Start failed ({reason}); attempt {failures}/{max}, waiting for next trigger"
                );
                StreamState::Idle
            };
            inner.state = target;
            inner.ctx.last_transition = Instant::now();
            target
        };

        self.indicator.set_mode(target.indicator_mode()).await;
    }

    // ---- stop path ------------------------------------------------------

    /// Run the stop sequence. Ends in `Idle` no matter what the stop
    /// command does.
    async fn stop_sequence(&self) {
        if !self.transition(StreamState::Stopping).await {
            return;
        }

        let outcome = self
            .runner
            .run(CommandVerb::Stop, self.config.stop_timeout())
            .await;

        if outcome.success() {
            info!("Stop command completed");
        } else {
            warn!(
                "Stop command {}; running forced cleanup anyway",
                outcome.describe()
            );
        }

        self.forced_cleanup();
        self.await_stream_disappearance().await;

        if self.transition(StreamState::Idle).await {
            info!("Stream stopped");
        }
    }

    /// Unconditional cleanup: drop the record and terminate any stream
    /// family members the stop command missed.
    pub fn forced_cleanup(&self) {
        if let Err(e) = self.records.clear() {
            warn!("Forced cleanup could not remove process record: {e}");
        }

        for pid in self.probe.find_family() {
            if self.probe.terminate(pid) {
                warn!("Terminated orphan stream process {pid}");
            } else {
                warn!("Failed to terminate orphan stream process {pid}");
            }
        }
    }

    /// Poll until no stream family process remains. A leftover after the
    /// timeout is logged and otherwise ignored.
    async fn await_stream_disappearance(&self) {
        let deadline = Instant::now() + self.config.stop_poll_timeout();
        loop {
            let family = self.probe.find_family();
            if family.is_empty() {
                return;
            }
            if Instant::now() >= deadline {
                warn!(
                    "{} stream process(es) still present {}s after stop, proceeding",
                    family.len(),
                    self.config.stop_poll_timeout_secs
                );
                return;
            }
            if !self
                .shutdown
                .sleep_cancellable(self.config.stop_poll_interval())
                .await
            {
                return;
            }
        }
    }

    // ---- monitor entry points -------------------------------------------

    /// Correct the state toward observed reality.
    ///
    /// Transitional states are never corrected here; the stuck watchdog
    /// owns those. Returns whether a correction was applied.
    pub async fn correct_state(&self, target: StreamState, reason: &str) -> bool {
        let from = {
            let mut inner = self.inner.lock().await;
            if inner.state == target {
                return false;
            }
            if inner.state.is_transitional() {
                debug!(
                    "Skipping correction to {target} while {} is in flight",
                    inner.state
                );
                return false;
            }
            if !inner.state.can_transition_to(target) {
                warn!("Refusing state correction {} -> {target}", inner.state);
                return false;
            }
            let from = inner.state;
            inner.state = target;
            inner.ctx.last_transition = Instant::now();
            from
        };

        warn!("State corrected: {from} -> {target} ({reason})");
        self.indicator.set_mode(target.indicator_mode()).await;
        true
    }

    /// Force a transitional state held longer than `limit` back to
    /// `Idle`, dropping the process record. Returns whether a reset
    /// happened.
    pub async fn force_reset_if_stuck(&self, limit: Duration) -> bool {
        let from = {
            let mut inner = self.inner.lock().await;
            let held = inner.ctx.last_transition.elapsed();
            if !inner.state.is_transitional() || held <= limit {
                return false;
            }
            let from = inner.state;
            error!(
                "State {from} held for {}s (limit {}s), forcing reset to idle",
                held.as_secs(),
                limit.as_secs()
            );
            if let Err(e) = self.records.clear() {
                warn!("Stuck reset could not remove process record: {e}");
            }
            inner.state = StreamState::Idle;
            inner.ctx.last_transition = Instant::now();
            from
        };

        debug!("Stuck reset complete (was {from})");
        self.indicator
            .set_mode(StreamState::Idle.indicator_mode())
            .await;
        true
    }

    fn read_record_logged(&self) -> Option<u32> {
        match self.records.read() {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not read process record: {e}");
                None
            }
        }
    }
}
