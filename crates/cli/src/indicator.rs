//! File-backed status indicator.
//!
//! Mirrors every mode change into a small state file so the believed
//! stream state is readable without hardware. A GPIO-backed indicator
//! implements the same trait and takes this one's place when wired in.

use async_trait::async_trait;
use sp_core::hardware::StatusIndicator;
use sp_protocol::stream_models::IndicatorMode;
use std::path::PathBuf;
use tracing::{info, warn};

/// Indicator writing the current mode to a state file.
pub struct FileIndicator {
    path: PathBuf,
}

impl FileIndicator {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StatusIndicator for FileIndicator {
    async fn set_mode(&self, mode: IndicatorMode) {
        info!("Indicator mode: {mode}");
        if let Err(e) = tokio::fs::write(&self.path, format!("{mode}\n")).await {
            warn!(
                "Could not update indicator state file {}: {e}",
                self.path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_mode_writes_state_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("indicator.state");
        let indicator = FileIndicator::new(path.clone());

        indicator.set_mode(IndicatorMode::SolidOn).await;
        let content = std::fs::read_to_string(&path).expect("State file should exist");
        assert_eq!(content, "solid-on\n");

        indicator.set_mode(IndicatorMode::Off).await;
        let content = std::fs::read_to_string(&path).expect("State file should exist");
        assert_eq!(content, "off\n");
    }
}
