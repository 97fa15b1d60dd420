//! Backup-guarded atomic file replacement
//!
//! The new content goes to a temp file in the target's directory and is
//! fsynced. The current file is then copied to
//! `<file>.bak.<YYYYmmdd_HHMMSS>`, and only then is the temp file renamed
//! over the target. If any step before the rename fails, the target is
//! untouched and the temp file is removed on drop.

use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{HarvestError, HarvestResult};

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone)]
pub struct AtomicFileUpdate {
    target: PathBuf,
    backup: bool,
}

impl AtomicFileUpdate {
    /// Replace `target`, backing up the current file first.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            backup: true,
        }
    }

    /// Replace `target` without keeping the previous version.
    pub fn without_backup(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            backup: false,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Write `contents`; returns the backup path when one was made.
    pub fn write(&self, contents: &[u8]) -> HarvestResult<Option<PathBuf>> {
        let dir = match self.target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| HarvestError::io(&dir, e))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| HarvestError::io(&dir, e))?;
        temp.write_all(contents)
            .and_then(|()| temp.flush())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| HarvestError::io(temp.path(), e))?;

        let backup = if self.backup && self.target.exists() {
            Some(backup_file(&self.target)?)
        } else {
            None
        };

        temp.persist(&self.target)
            .map_err(|e| HarvestError::io(&self.target, e.error))?;
        debug!("💾 Replaced {}", self.target.display());
        Ok(backup)
    }
}

/// Copy `path` to a timestamped sibling that doesn't exist yet.
pub fn backup_file(path: &Path) -> HarvestResult<PathBuf> {
    let stamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
    let file_name = path
        .file_name()
        .ok_or_else(|| HarvestError::persistence(path, "cannot back up a path without a file name"))?
        .to_string_lossy()
        .into_owned();

    let mut backup = path.with_file_name(format!("{file_name}.bak.{stamp}"));
    let mut suffix = 1;
    while backup.exists() {
        backup = path.with_file_name(format!("{file_name}.bak.{stamp}_{suffix}"));
        suffix += 1;
    }

    fs::copy(path, &backup).map_err(|e| {
        HarvestError::persistence(path, format!("backup to {} failed: {e}", backup.display()))
    })?;
    info!("🗂️ Backup written: {}", backup.display());
    Ok(backup)
}
