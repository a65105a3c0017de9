//! Periodic health monitor.
//!
//! Reconciles the persisted process record against the processes actually
//! present, runs the advisory reachability and resource checks, and
//! corrects drifted state. Every sub-step failure is caught and logged;
//! the tick always completes and the loop always reschedules.

use crate::checks;
use crate::process::{IdentityStatus, ProcessProbe, RecordStore};
use crate::shutdown::ShutdownSignal;
use crate::state::machine::StateMachine;
use sp_protocol::config_models::SupervisorConfig;
use sp_protocol::stream_models::StreamState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Extra delay after a tick that failed in an unexpected way.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Periodically verifies that belief matches reality.
pub struct HealthMonitor {
    machine: Arc<StateMachine>,
    probe: Arc<dyn ProcessProbe>,
    records: RecordStore,
    config: SupervisorConfig,
    shutdown: ShutdownSignal,
}

impl HealthMonitor {
    pub fn new(
        machine: Arc<StateMachine>,
        probe: Arc<dyn ProcessProbe>,
        records: RecordStore,
        config: SupervisorConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            machine,
            probe,
            records,
            config,
            shutdown,
        }
    }

    /// Run until shutdown. The first tick happens immediately so a
    /// restarted supervisor re-adopts or discards a persisted record
    /// without waiting out a full interval.
    pub async fn run(self) {
        info!(
            "Health monitor started (interval {}s)",
            self.config.health_interval_secs
        );

        loop {
            if let Err(e) = self.tick().await {
                error!("Health check tick failed: {e:#}");
                if !self.shutdown.sleep_cancellable(ERROR_BACKOFF).await {
                    break;
                }
            }
            if !self
                .shutdown
                .sleep_cancellable(self.config.health_interval())
                .await
            {
                break;
            }
        }

        info!("Health monitor stopped");
    }

    /// One full reconciliation pass. Public so tests (and operators
    /// wiring their own schedules) can drive single passes directly.
    pub async fn tick(&self) -> anyhow::Result<()> {
        self.verify_identity()?;
        self.probe_reachability().await;
        self.check_resources().await;
        self.reconcile().await;
        Ok(())
    }

    /// Check the persisted record against the process table, dropping the
    /// record when the process it names is gone, foreign, or dead.
    fn verify_identity(&self) -> anyhow::Result<()> {
        let record = match self.records.read() {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not read process record: {e}");
                return Ok(());
            }
        };

        let Some(pid) = record else {
            return Ok(());
        };

        match self.probe.status_of(pid) {
            IdentityStatus::Alive => {}
            IdentityStatus::Missing => {
                warn!("Recorded process {pid} no longer exists, removing record");
                self.records.clear()?;
            }
            IdentityStatus::Foreign => {
                warn!("PID {pid} belongs to a foreign process, removing record");
                self.records.clear()?;
            }
            IdentityStatus::Dead => {
                warn!("Recorded process {pid} is dead or zombie, removing record");
                self.records.clear()?;
            }
        }
        Ok(())
    }

    async fn probe_reachability(&self) {
        match checks::probe_peer(
            &self.config.peer_host,
            self.config.peer_port,
            self.config.connect_timeout(),
        )
        .await
        {
            Ok(()) => debug!(
                "Peer {}:{} reachable",
                self.config.peer_host, self.config.peer_port
            ),
            Err(e) => warn!(
                "Peer {}:{} not reachable: {e}",
                self.config.peer_host, self.config.peer_port
            ),
        }
    }

    async fn check_resources(&self) {
        let threshold = self.config.resource_threshold_pct;
        let sample = checks::sample_resources().await;
        for (name, value) in sample.exceeding(threshold) {
            warn!("High {name} usage: {value:.1}% (threshold {threshold}%)");
        }
    }

    /// Correct state drift against reality.
    ///
    /// The record and the process table are re-read here rather than
    /// reusing the identity-check result: the advisory checks in between
    /// take long enough for a trigger-driven sequence to finish, and a
    /// correction must not act on a belief from before that.
    async fn reconcile(&self) {
        match self.machine.current_state().await {
            StreamState::Running => {
                if self.live_recorded_pid().is_none() {
                    self.machine
                        .correct_state(StreamState::Idle, "no live stream process found")
                        .await;
                }
            }
            StreamState::Idle | StreamState::Error => {
                if let Some(pid) = self.live_recorded_pid() {
                    self.machine
                        .correct_state(
                            StreamState::Running,
                            &format!("stream process {pid} is alive"),
                        )
                        .await;
                }
            }
            _ => {}
        }
    }

    /// The recorded PID, when it names a live matching process.
    fn live_recorded_pid(&self) -> Option<u32> {
        match self.records.read() {
            Ok(Some(pid)) if self.probe.status_of(pid) == IdentityStatus::Alive => Some(pid),
            _ => None,
        }
    }
}
