//! Custom error types for Propdesk
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Snapshot validation failures (format,
//! version, size, integrity) each get their own variant so callers can reject
//! an upload without ever opening a transaction.

use thiserror::Error;

use crate::models::EntityType;

/// The main error type for Propdesk operations
#[derive(Error, Debug)]
pub enum PropdeskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(String),

    /// Validation errors for a single record
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// A record with the same natural key already exists
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: EntityType,
        identifier: String,
    },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A repository fetch failed while building a snapshot
    #[error("Failed to fetch {entity_type}: {message}")]
    Repository {
        entity_type: EntityType,
        message: String,
    },

    /// The uploaded snapshot is structurally malformed
    #[error("Malformed snapshot: {0}")]
    Format(String),

    /// The snapshot manifest carries an unsupported version
    #[error("Unsupported snapshot version '{found}' (supported: {supported})")]
    Version { found: String, supported: String },

    /// Declared record counts disagree with the data payload
    #[error("Snapshot integrity check failed for {entity_type}: manifest declares {declared} records, data holds {actual}")]
    Integrity {
        entity_type: String,
        declared: u64,
        actual: u64,
    },

    /// The uploaded snapshot exceeds the configured ceiling
    #[error("Snapshot is {size} bytes, above the {limit} byte limit")]
    Size { size: u64, limit: u64 },

    /// Too many record errors; the restore was rolled back
    #[error("Restore aborted: {errors} record errors exceed the threshold of {threshold}")]
    FatalThreshold { errors: usize, threshold: usize },

    /// Transaction lifecycle errors (begin/commit/rollback)
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl PropdeskError {
    /// Create a "not found" error for snapshot files
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a natural-key collision
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error was raised while validating a snapshot upload
    ///
    /// Such errors are always raised before a transaction is opened.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::Version { .. } | Self::Integrity { .. } | Self::Size { .. }
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for PropdeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PropdeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for PropdeskError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Result type alias for Propdesk operations
pub type PropdeskResult<T> = Result<T, PropdeskError>;
