//! User settings for Propdesk
//!
//! Manages backup retention, the restore upload ceiling and the fatal error
//! threshold. Every field has a serde default so older config files keep
//! loading.

use serde::{Deserialize, Serialize};

use super::paths::PropdeskPaths;
use crate::backup::SnapshotFormat;
use crate::error::PropdeskError;

/// Backup retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Number of daily snapshots to keep
    pub daily_count: u32,
    /// Number of monthly snapshots to keep
    pub monthly_count: u32,
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self {
            daily_count: 30,
            monthly_count: 12,
        }
    }
}

/// Snapshot and restore settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Retention policy for stored snapshot files
    #[serde(default)]
    pub retention: BackupRetention,

    /// Largest snapshot accepted for restore, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Record errors tolerated before a restore is rolled back
    #[serde(default = "default_fatal_error_threshold")]
    pub fatal_error_threshold: usize,

    /// Format used when writing snapshot files
    #[serde(default)]
    pub format: SnapshotFormat,

    /// Name stamped into `createdBy`; falls back to the login user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_fatal_error_threshold() -> usize {
    50
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            retention: BackupRetention::default(),
            max_upload_bytes: default_max_upload_bytes(),
            fatal_error_threshold: default_fatal_error_threshold(),
            format: SnapshotFormat::default(),
            created_by: None,
        }
    }
}

impl BackupSettings {
    /// Resolve the snapshot author: configured name, then `$USER`/`$USERNAME`
    pub fn resolve_created_by(&self) -> String {
        self.created_by
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "propdesk".to_string())
    }
}

/// User settings for Propdesk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Snapshot and restore settings
    #[serde(default)]
    pub backup: BackupSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup: BackupSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &PropdeskPaths) -> Result<Self, PropdeskError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                PropdeskError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                PropdeskError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &PropdeskPaths) -> Result<(), PropdeskError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            PropdeskError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| PropdeskError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
