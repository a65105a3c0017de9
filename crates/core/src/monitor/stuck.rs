//! Stuck-transition watchdog.
//!
//! A coarse, independent guard against start/stop sequences that hang
//! despite their own timeouts: any transitional state held past the
//! configured limit is forced back to idle.

use crate::shutdown::ShutdownSignal;
use crate::state::machine::StateMachine;
use sp_protocol::config_models::SupervisorConfig;
use std::sync::Arc;
use tracing::info;

/// Periodically resets transitional states held too long.
pub struct StuckMonitor {
    machine: Arc<StateMachine>,
    config: SupervisorConfig,
    shutdown: ShutdownSignal,
}

impl StuckMonitor {
    pub fn new(
        machine: Arc<StateMachine>,
        config: SupervisorConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            machine,
            config,
            shutdown,
        }
    }

    /// Run until shutdown.
    pub async fn run(self) {
        info!(
            "Stuck-transition monitor started (interval {}s, limit {}s)",
            self.config.stuck_interval_secs, self.config.stuck_timeout_secs
        );

        loop {
            if !self
                .shutdown
                .sleep_cancellable(self.config.stuck_interval())
                .await
            {
                break;
            }
            self.check().await;
        }

        info!("Stuck-transition monitor stopped");
    }

    /// One watchdog pass. Returns whether a stuck state was reset.
    pub async fn check(&self) -> bool {
        self.machine
            .force_reset_if_stuck(self.config.stuck_timeout())
            .await
    }
}
