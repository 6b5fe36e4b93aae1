//! Restore outcome types

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::EntityType;

/// Provenance of the restored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// A single record that could not be stored
///
/// Record errors never stop a restore on their own; they only count towards
/// the fatal threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub entity_type: EntityType,
    /// Position of the record in the snapshot's list for its type
    pub index: usize,
    pub message: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.entity_type, self.index, self.message)
    }
}

/// Outcome of one restore invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub success: bool,
    pub rolled_back: bool,
    pub total_imported: u64,
    /// Records inserted, merged or appended, per entity type
    pub summary: BTreeMap<EntityType, u64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub backup_info: BackupInfo,
}

impl RestoreReport {
    /// Whether the restore reported any record errors or warnings
    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty() || !self.warnings.is_empty()
    }

    /// Number of per-record errors, without the trailing fatal message of a
    /// rolled-back restore
    pub fn record_error_count(&self) -> usize {
        if self.rolled_back {
            self.errors.len().saturating_sub(1)
        } else {
            self.errors.len()
        }
    }

    /// One-line description of the outcome
    pub fn summary_text(&self) -> String {
        if self.rolled_back {
            return format!(
                "Restore rolled back after {} error(s); no changes were made",
                self.record_error_count()
            );
        }

        let parts: Vec<String> = self
            .summary
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(entity_type, count)| format!("{} {}", count, entity_type))
            .collect();

        let imported = if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(", ")
        };

        format!(
            "Restored {} record(s): {} ({} warning(s), {} error(s))",
            self.total_imported,
            imported,
            self.warnings.len(),
            self.errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RestoreReport {
        RestoreReport {
            success: true,
            rolled_back: false,
            total_imported: 3,
            summary: BTreeMap::from([(EntityType::Users, 3), (EntityType::Customers, 0)]),
            errors: vec![],
            warnings: vec!["users: skipped existing record with key 'a@b.c'".into()],
            backup_info: BackupInfo {
                version: "2.0".into(),
                created_at: Utc::now(),
                created_by: "ana".into(),
            },
        }
    }

    #[test]
    fn test_record_error_display() {
        let err = RecordError {
            entity_type: EntityType::Properties,
            index: 7,
            message: "missing required field 'title'".into(),
        };
        assert_eq!(err.to_string(), "properties[7]: missing required field 'title'");
    }

    #[test]
    fn test_summary_text() {
        let text = report().summary_text();
        assert!(text.contains("Restored 3 record(s): 3 users"));
        assert!(!text.contains("customers"));
        assert!(text.contains("1 warning(s)"));
        assert_eq!(report().record_error_count(), 0);
    }

    #[test]
    fn test_rolled_back_summary_text() {
        let mut r = report();
        r.success = false;
        r.rolled_back = true;
        r.errors = vec!["x".into(); 4];
        r.errors.push("3 error(s) exceed the fatal threshold".into());
        assert_eq!(r.record_error_count(), 4);
        assert!(r.summary_text().contains("rolled back after 4 error(s)"));
    }

    #[test]
    fn test_report_wire_names() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(value["rolledBack"], false);
        assert_eq!(value["totalImported"], 3);
        assert_eq!(value["summary"]["users"], 3);
        assert_eq!(value["backupInfo"]["createdBy"], "ana");
        assert!(report().has_issues());
    }
}
