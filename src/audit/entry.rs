//! Audit entry data structures
//!
//! One entry per record written by a restore, with redacted before/after
//! values so the log never holds what the snapshot itself wouldn't.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::EntityType;

/// Types of writes that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Record was inserted or appended
    Create,
    /// Record was merged into an existing one
    Update,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// When the write was staged (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    pub entity_type: EntityType,

    /// Surrogate id of the affected record
    pub entity_id: String,

    /// Natural key of the record, when it has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,

    /// Human-readable diff summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    /// Create a new audit entry for a created record
    pub fn create(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        natural_key: Option<String>,
        after: Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: Operation::Create,
            entity_type,
            entity_id: entity_id.into(),
            natural_key,
            before: None,
            after: Some(after),
            diff_summary: None,
        }
    }

    /// Create a new audit entry for an updated record
    pub fn update(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        natural_key: Option<String>,
        before: Value,
        after: Value,
        diff_summary: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: Operation::Update,
            entity_type,
            entity_id: entity_id.into(),
            natural_key,
            before: Some(before),
            after: Some(after),
            diff_summary,
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_type,
            self.entity_id
        );

        if let Some(key) = &self.natural_key {
            output.push_str(&format!(" ({})", key));
        }

        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}
