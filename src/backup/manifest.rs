//! Snapshot manifest and format versioning
//!
//! The manifest is the header of every snapshot document. Versions are an
//! explicit allow-list; anything else is rejected rather than parsed on a
//! best-effort basis.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PropdeskError, PropdeskResult};

use super::report::BackupInfo;

/// Version stamped on newly built snapshots
pub const CURRENT_SNAPSHOT_VERSION: &str = "2.0";

/// Versions accepted by restore, oldest first
///
/// `1.0` snapshots predate the `security` block.
pub const SUPPORTED_SNAPSHOT_VERSIONS: &[&str] = &["1.0", "2.0"];

/// Check a manifest version against the allow-list
pub fn is_supported_version(version: &str) -> bool {
    SUPPORTED_SNAPSHOT_VERSIONS.contains(&version)
}

/// Reject a version outside the allow-list
pub fn check_version(version: &str) -> PropdeskResult<()> {
    if is_supported_version(version) {
        Ok(())
    } else {
        Err(PropdeskError::Version {
            found: version.to_string(),
            supported: SUPPORTED_SNAPSHOT_VERSIONS.join(", "),
        })
    }
}

/// Redaction facts recorded in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityInfo {
    pub sensitive_data_filtered: bool,
    /// Entity types whose records had fields removed or carry a denylist
    pub entities_filtered: Vec<String>,
}

/// Snapshot header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    /// Declared record count per entity type name
    pub total_records: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityInfo>,
}

impl Manifest {
    /// Check fields whose presence depends on the version
    pub fn check_version_requirements(&self) -> PropdeskResult<()> {
        check_version(&self.version)?;

        if self.version != "1.0" && self.security.is_none() {
            return Err(PropdeskError::Format(format!(
                "manifest version {} requires a 'security' block",
                self.version
            )));
        }

        Ok(())
    }

    /// Compare declared counts with the data payload
    ///
    /// Every entity type named on either side is checked; a missing side
    /// counts as zero records.
    pub fn verify_counts(&self, data: &BTreeMap<String, Vec<Value>>) -> PropdeskResult<()> {
        let names: BTreeSet<&String> = self.total_records.keys().chain(data.keys()).collect();

        for name in names {
            let declared = self.total_records.get(name).copied().unwrap_or(0);
            let actual = data.get(name).map_or(0, |records| records.len() as u64);
            if declared != actual {
                return Err(PropdeskError::Integrity {
                    entity_type: name.clone(),
                    declared,
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Total declared records across all entity types
    pub fn record_count(&self) -> u64 {
        self.total_records.values().sum()
    }

    /// Provenance summary carried into restore reports
    pub fn backup_info(&self) -> BackupInfo {
        BackupInfo {
            version: self.version.clone(),
            created_at: self.created_at,
            created_by: self.created_by.clone(),
        }
    }
}
