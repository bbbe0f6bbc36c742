//! Configuration persistence
//!
//! Owns the on-disk config file and its backups. Every overwrite first
//! copies the existing file to `<path>.bak.<timestamp>`; the timestamp
//! format sorts lexicographically. The write itself goes through a temp
//! file and an atomic rename, so a crash mid-save never corrupts the live
//! file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::schema::TraderConfig;
use crate::config::validation::{validate, Violation};
use crate::error::ConfigError;

/// Backup suffix inserted between the original file name and the timestamp
const BACKUP_TAG: &str = ".bak.";

/// Timestamp format for backup names; lexicographic order == time order
const BACKUP_STAMP: &str = "%Y%m%dT%H%M%S%3f";

/// Loads, validates, and saves the trading configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the live configuration file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration from disk
    pub fn load(&self) -> Result<TraderConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let cfg = toml::from_str(&content)?;
        debug!(path = %self.path.display(), "configuration loaded");
        Ok(cfg)
    }

    /// Validate a configuration, returning every violation found
    pub fn validate(cfg: &TraderConfig) -> Vec<Violation> {
        validate(cfg)
    }

    /// Persist the configuration, backing up the previous file first.
    ///
    /// A subsequent [`ConfigStore::load`] returns the saved value.
    pub fn save(&self, cfg: &TraderConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(cfg)?;

        if self.path.exists() {
            let backup = self.next_backup_path();
            fs::copy(&self.path, &backup)?;
            info!(backup = %backup.display(), "backed up previous configuration");
        }

        // Write-to-temp-then-rename so a crash mid-write cannot corrupt the
        // live file
        let tmp = self.path.with_extension("toml.tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&tmp, &content)?;
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    /// List existing backups of this config file, oldest first
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(Vec::new());
        };
        let Some(file_name) = self.path.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{}{}", file_name, BACKUP_TAG);

        let mut backups = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                backups.push(entry.path());
            }
        }
        backups.sort();
        Ok(backups)
    }

    /// Restore a backup over the live configuration file.
    ///
    /// The backup must parse as a configuration; the current file is backed
    /// up before being replaced.
    pub fn restore_backup(&self, backup: &Path) -> Result<TraderConfig, ConfigError> {
        if !backup.exists() {
            return Err(ConfigError::BackupNotFound(backup.to_path_buf()));
        }

        let content = fs::read_to_string(backup)?;
        let cfg: TraderConfig = toml::from_str(&content)?;

        if self.path.exists() {
            let pre_restore = self.next_backup_path();
            if let Err(e) = fs::copy(&self.path, &pre_restore) {
                warn!(error = %e, "failed to back up current config before restore");
            }
        }

        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, &content)?;
        fs::rename(&tmp, &self.path)?;

        info!(backup = %backup.display(), "configuration restored from backup");
        Ok(cfg)
    }

    fn next_backup_path(&self) -> PathBuf {
        let stamp = Utc::now().format(BACKUP_STAMP);
        PathBuf::from(format!(
            "{}{}{}",
            self.path.display(),
            BACKUP_TAG,
            stamp
        ))
    }
}
