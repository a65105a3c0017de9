//! Interfaces to the physical transducers.
//!
//! The button and the status indicator are external collaborators; the
//! supervisor only knows "subscribe to press events" and "set indicator
//! mode". Concrete backends (OS signals, GPIO, test doubles) implement
//! these traits and are wired in by the binary.

use async_trait::async_trait;
use sp_protocol::stream_models::IndicatorMode;
use tokio::sync::mpsc;

/// A single trigger event: a user asked to toggle the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press;

/// Source of trigger events.
#[async_trait]
pub trait PressSource: Send {
    /// Wait for the next press event. `None` means the source closed and
    /// no further events will arrive.
    async fn next_press(&mut self) -> Option<Press>;
}

/// The status indicator output.
///
/// Setting a mode must not fail the supervisor; implementations log their
/// own delivery problems.
#[async_trait]
pub trait StatusIndicator: Send + Sync {
    /// Switch the indicator to `mode`.
    async fn set_mode(&self, mode: IndicatorMode);
}

/// A [`PressSource`] fed through an mpsc channel.
///
/// Backends that receive events asynchronously (OS signal handlers, GPIO
/// interrupt callbacks) push into the sender half; tests do the same.
pub struct ChannelPressSource {
    rx: mpsc::Receiver<Press>,
}

impl ChannelPressSource {
    /// Wrap an existing receiver.
    pub fn new(rx: mpsc::Receiver<Press>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/source pair.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Press>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

#[async_trait]
impl PressSource for ChannelPressSource {
    async fn next_press(&mut self) -> Option<Press> {
        self.rx.recv().await
    }
}
