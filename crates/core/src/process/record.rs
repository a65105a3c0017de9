//! Persisted process record.
//!
//! A single file holding the decimal PID of the believed-running stream
//! process. The external start command writes it; the supervisor and its
//! monitors read, rewrite, and delete it. Absence is a valid value and
//! means "nothing known to be running". The file survives supervisor
//! restarts, which is what lets the health monitor re-adopt a stream that
//! was started by a previous incarnation.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the record store.
///
/// Corrupt content is not an error: it is treated as absence and the file
/// is removed on the spot.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Failed to read the record file.
    #[error("Failed to read process record at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the record file.
    #[error("Failed to write process record at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove the record file.
    #[error("Failed to remove process record at {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Durable single-value store for the stream process identifier.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Create a store backed by `path`. The file itself is created lazily
    /// by [`RecordStore::write`].
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a record file currently exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the recorded PID.
    ///
    /// Returns `Ok(None)` when no record exists. Non-numeric content is
    /// treated as absence: the corrupt file is removed and `Ok(None)` is
    /// returned.
    pub fn read(&self) -> Result<Option<u32>, RecordError> {
        if !self.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| RecordError::Read {
            path: self.path.clone(),
            source,
        })?;

        match contents.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                warn!(
                    "Process record at {} holds non-numeric content, removing it",
                    self.path.display()
                );
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// Write `pid` as the current record, replacing any previous value.
    pub fn write(&self, pid: u32) -> Result<(), RecordError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| RecordError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        fs::write(&self.path, format!("{pid}\n")).map_err(|source| RecordError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!("Process record written: {} (PID {})", self.path.display(), pid);
        Ok(())
    }

    /// Remove the record file. Removing an absent record is a no-op.
    pub fn clear(&self) -> Result<(), RecordError> {
        if !self.exists() {
            return Ok(());
        }

        fs::remove_file(&self.path).map_err(|source| RecordError::Remove {
            path: self.path.clone(),
            source,
        })?;

        info!("Process record removed: {}", self.path.display());
        Ok(())
    }
}
