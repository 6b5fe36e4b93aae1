//! Path management for Propdesk
//!
//! ## Path Resolution Order
//!
//! 1. `PROPDESK_DATA_DIR` environment variable (if set)
//! 2. The platform config directory (`$XDG_CONFIG_HOME/propdesk`,
//!    `~/Library/Application Support/propdesk`, `%APPDATA%\propdesk`)

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::PropdeskError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "PROPDESK_DATA_DIR";

/// Manages all paths used by Propdesk
#[derive(Debug, Clone)]
pub struct PropdeskPaths {
    /// Base directory for all Propdesk data
    base_dir: PathBuf,
}

impl PropdeskPaths {
    /// Create a new PropdeskPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined and the
    /// environment override is not set.
    pub fn new() -> Result<Self, PropdeskError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            BaseDirs::new()
                .map(|dirs| dirs.config_dir().join("propdesk"))
                .ok_or_else(|| {
                    PropdeskError::Config("Could not determine the home directory".into())
                })?
        };

        Ok(Self { base_dir })
    }

    /// Create PropdeskPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (<base>/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup directory (<base>/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Get the path to the record store
    pub fn store_file(&self) -> PathBuf {
        self.data_dir().join("store.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), PropdeskError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| PropdeskError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| PropdeskError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| PropdeskError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Check if Propdesk has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}
