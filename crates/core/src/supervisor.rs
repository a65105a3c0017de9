//! Top-level supervisor.
//!
//! Wires the debouncer, state machine, and monitors together, pumps press
//! events, and owns graceful shutdown. Press handling is spawned onto its
//! own task so a minutes-long start sequence never blocks the debounce
//! check of the next trigger or the periodic monitors.

use crate::hardware::PressSource;
use crate::monitor::{HealthMonitor, StuckMonitor};
use crate::process::{ProcessProbe, RecordStore};
use crate::shutdown::ShutdownSignal;
use crate::state::debounce::{Debouncer, PressDecision};
use crate::state::machine::StateMachine;
use sp_protocol::config_models::SupervisorConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Errors that end the supervisor run loop abnormally.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The trigger source closed while the supervisor was still running.
    #[error("Trigger source closed while the supervisor was running")]
    TriggerClosed,
}

/// The top-level supervisor.
pub struct Supervisor {
    machine: Arc<StateMachine>,
    debouncer: Debouncer,
    press_source: Box<dyn PressSource>,
    health: HealthMonitor,
    stuck: StuckMonitor,
    shutdown: ShutdownSignal,
    grace: Duration,
}

impl Supervisor {
    /// Wire a supervisor from its parts.
    ///
    /// `machine`, `probe`, and `records` are shared with the monitors;
    /// `shutdown` must be the same signal handed to the state machine so
    /// one request stops everything.
    pub fn new(
        config: &SupervisorConfig,
        machine: Arc<StateMachine>,
        probe: Arc<dyn ProcessProbe>,
        records: RecordStore,
        press_source: Box<dyn PressSource>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let debouncer = Debouncer::new(config.debounce_window());
        let health = HealthMonitor::new(
            machine.clone(),
            probe,
            records,
            config.clone(),
            shutdown.clone(),
        );
        let stuck = StuckMonitor::new(machine.clone(), config.clone(), shutdown.clone());

        Self {
            machine,
            debouncer,
            press_source,
            health,
            stuck,
            shutdown,
            grace: config.shutdown_grace(),
        }
    }

    /// Handle to the shutdown signal, for wiring OS signal handlers.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Run until shutdown is requested.
    ///
    /// Returns an error only when the trigger source dies while the
    /// supervisor is still supposed to be running.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let Supervisor {
            machine,
            debouncer,
            mut press_source,
            health,
            stuck,
            shutdown,
            grace,
        } = self;

        info!("Supervisor started; waiting for trigger events");
        machine.indicate_current().await;

        let health_task = tokio::spawn(health.run());
        let stuck_task = tokio::spawn(stuck.run());

        // Subscribe before checking the flag: a request landing in between
        // is then seen by either the flag or the receiver, never neither.
        let mut shutdown_rx = shutdown.subscribe();
        let result = if shutdown.is_requested() {
            Ok(())
        } else {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break Ok(()),
                    press = press_source.next_press() => match press {
                        Some(_) => {
                            let state = machine.current_state().await;
                            if debouncer.assess(state).await == PressDecision::Forward {
                                machine.note_trigger().await;
                                let machine = machine.clone();
                                tokio::spawn(async move { machine.handle_press().await });
                            }
                        }
                        None if shutdown.is_requested() => break Ok(()),
                        None => {
                            error!("Trigger source closed unexpectedly");
                            break Err(SupervisorError::TriggerClosed);
                        }
                    },
                }
            }
        };

        // Make sure the loops see the shutdown even on the error path.
        shutdown.request();
        join_with_grace("health", health_task, grace).await;
        join_with_grace("stuck-transition", stuck_task, grace).await;

        machine.clear_indicator().await;
        info!("Supervisor stopped");
        result
    }
}

async fn join_with_grace(name: &str, handle: JoinHandle<()>, grace: Duration) {
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{name} monitor task failed: {e}"),
        Err(_) => warn!(
            "{name} monitor did not stop within {}s grace period",
            grace.as_secs()
        ),
    }
}
