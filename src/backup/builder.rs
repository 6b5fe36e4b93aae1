//! Snapshot builder
//!
//! Reads every registered entity type through a [`Repository`], redacts each
//! record and stamps a manifest. The build is all-or-nothing: the first
//! failed fetch aborts it and no snapshot is returned.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{PropdeskError, PropdeskResult};
use crate::models::EntityType;
use crate::registry::EntityRegistry;
use crate::storage::Repository;

use super::manifest::{Manifest, SecurityInfo, CURRENT_SNAPSHOT_VERSION};
use super::redact::{Redactor, RemovalReason};
use super::snapshot::Snapshot;

/// Fields removed by the substring heuristic alone, per entity type
///
/// These did not match any denylist entry; they may be false positives or
/// secrets the denylist is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionAudit {
    heuristic: BTreeMap<EntityType, BTreeSet<String>>,
}

impl RedactionAudit {
    pub fn is_empty(&self) -> bool {
        self.heuristic.is_empty()
    }

    /// Field paths per entity type, in registry order
    pub fn heuristic_removals(&self) -> &BTreeMap<EntityType, BTreeSet<String>> {
        &self.heuristic
    }

    /// Field paths removed heuristically from one entity type
    pub fn fields_for(&self, entity_type: EntityType) -> Option<&BTreeSet<String>> {
        self.heuristic.get(&entity_type)
    }
}

/// A built snapshot with its redaction audit
#[derive(Debug, Clone)]
pub struct SnapshotBuild {
    pub snapshot: Snapshot,
    pub redaction: RedactionAudit,
}

/// Builds snapshots from a repository
pub struct SnapshotBuilder<'a, R: Repository + ?Sized> {
    repository: &'a R,
    registry: &'a EntityRegistry,
    created_by: String,
}

impl<'a, R: Repository + ?Sized> SnapshotBuilder<'a, R> {
    pub fn new(repository: &'a R, registry: &'a EntityRegistry) -> Self {
        Self {
            repository,
            registry,
            created_by: "propdesk".to_string(),
        }
    }

    /// Set the name stamped into `createdBy`
    pub fn created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    /// Build a snapshot
    pub fn build(&self) -> PropdeskResult<Snapshot> {
        Ok(self.build_with_audit()?.snapshot)
    }

    /// Build a snapshot, also reporting heuristic-only redactions
    pub fn build_with_audit(&self) -> PropdeskResult<SnapshotBuild> {
        let mut data = BTreeMap::new();
        let mut total_records = BTreeMap::new();
        let mut entities_filtered = Vec::new();
        let mut audit = RedactionAudit::default();

        for descriptor in self.registry.descriptors() {
            let entity_type = descriptor.entity_type;
            let records = self.repository.fetch_all(entity_type).map_err(|e| {
                PropdeskError::Repository {
                    entity_type,
                    message: e.to_string(),
                }
            })?;

            let redactor = Redactor::for_descriptor(descriptor);
            let mut removed_any = false;
            let mut redacted = Vec::with_capacity(records.len());

            for record in &records {
                let (clean, removals) = redactor.redact_with_report(record);
                removed_any |= !removals.is_empty();
                for removal in removals {
                    if removal.reason == RemovalReason::Heuristic {
                        audit
                            .heuristic
                            .entry(entity_type)
                            .or_default()
                            .insert(removal.path);
                    }
                }
                redacted.push(clean);
            }

            if removed_any || !descriptor.denylist.is_empty() {
                entities_filtered.push(entity_type.to_string());
            }

            debug!(entity_type = %entity_type, records = redacted.len(), "captured entity type");
            total_records.insert(entity_type.to_string(), redacted.len() as u64);
            data.insert(entity_type, redacted);
        }

        for (entity_type, fields) in &audit.heuristic {
            warn!(
                entity_type = %entity_type,
                fields = ?fields,
                "fields removed only by the sensitive-name heuristic; review the denylist"
            );
        }

        let manifest = Manifest {
            version: CURRENT_SNAPSHOT_VERSION.to_string(),
            created_at: Utc::now(),
            created_by: self.created_by.clone(),
            total_records,
            security: Some(SecurityInfo {
                sensitive_data_filtered: true,
                entities_filtered,
            }),
        };

        let snapshot = Snapshot::new(manifest, data);
        info!(
            records = snapshot.record_count(),
            entity_types = snapshot.data().len(),
            "snapshot built"
        );

        Ok(SnapshotBuild {
            snapshot,
            redaction: audit,
        })
    }
}
