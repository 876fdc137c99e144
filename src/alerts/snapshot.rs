//! Persisted alert snapshot
//!
//! The snapshot is a pretty-printed JSON array of [`Alert`] records. It is
//! always replaced whole through a temp file and rename, so a reader (or a
//! failed write) never sees a partial file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::Alert;
use crate::utils::error::PersistError;
use crate::utils::write_atomic;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `{path}.backup`
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Replace the snapshot with `alerts`
    pub fn save(&self, alerts: &[Alert]) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(alerts)?;
        write_atomic(&self.path, &json).map_err(|e| PersistError::io(&self.path, e))?;
        info!(path = %self.path.display(), alerts = alerts.len(), "Saved alert snapshot");
        Ok(())
    }

    /// Last persisted alerts; a missing file is an empty list
    pub fn load(&self) -> Result<Vec<Alert>, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PersistError::io(&self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| PersistError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Copy the current snapshot to [`Self::backup_path`].
    ///
    /// Returns `false` when there is no snapshot to copy.
    pub fn backup(&self) -> Result<bool, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(PersistError::io(&self.path, e)),
        };

        let backup = self.backup_path();
        write_atomic(&backup, &bytes).map_err(|e| PersistError::io(&backup, e))?;
        info!(path = %backup.display(), "Created snapshot backup");
        Ok(true)
    }
}
