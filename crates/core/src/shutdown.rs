//! Broadcast shutdown signal.
//!
//! One idempotent signal fans out to every background loop and to the
//! cancellable waits inside the start/stop sequences, so shutdown is
//! prompt instead of waiting out unconditional sleeps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Cloneable handle to the supervisor-wide shutdown signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            sender,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the signal. Receivers see at most one notification.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Request shutdown. Safe to call from any context, any number of
    /// times; only the first call notifies.
    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            debug!("Shutdown requested");
            let _ = self.sender.send(());
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `dur` unless shutdown arrives first.
    ///
    /// Returns `true` when the full duration elapsed and `false` when the
    /// wait was cut short by shutdown (or shutdown was already requested).
    pub async fn sleep_cancellable(&self, dur: Duration) -> bool {
        if self.is_requested() {
            return false;
        }
        let mut rx = self.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(dur) => true,
            _ = rx.recv() => false,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
