//! Snapshot restoration
//!
//! A restore runs through fixed phases:
//!
//! ```text
//! Idle -> Validating -> Importing -> Committing -> Done
//!                                 \-> Aborting -> RolledBack
//! ```
//!
//! Validation (size, format, version, integrity) finishes before a
//! transaction is opened, so a rejected snapshot never touches the store.
//! Importing runs in one transaction, parent entity types before the types
//! referencing them. A failed record is recorded and skipped; once the
//! number of failed records exceeds the fatal threshold the whole
//! transaction is rolled back.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::audit::{generate_diff, AuditEntry, AuditLogger};
use crate::config::settings::BackupSettings;
use crate::error::{PropdeskError, PropdeskResult};
use crate::models::record::scalar_to_string;
use crate::models::{EntityType, Record};
use crate::registry::{EntityDescriptor, EntityRegistry};
use crate::storage::{Transaction, TransactionManager};

use super::conflict::{ConflictResolver, Resolution};
use super::manifest::{check_version, Manifest};
use super::redact::Redactor;
use super::report::{BackupInfo, RecordError, RestoreReport};
use super::snapshot::{Snapshot, SnapshotDocument, SnapshotFormat};

/// Limits applied to a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Largest accepted snapshot, in bytes
    pub max_upload_bytes: u64,
    /// Record errors tolerated before the restore is rolled back
    pub fatal_error_threshold: usize,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self::from(&BackupSettings::default())
    }
}

impl From<&BackupSettings> for RestoreOptions {
    fn from(settings: &BackupSettings) -> Self {
        Self {
            max_upload_bytes: settings.max_upload_bytes,
            fatal_error_threshold: settings.fatal_error_threshold,
        }
    }
}

/// Restore state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    Idle,
    Validating,
    Importing,
    Committing,
    Done,
    Aborting,
    RolledBack,
}

impl fmt::Display for RestorePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestorePhase::Idle => "idle",
            RestorePhase::Validating => "validating",
            RestorePhase::Importing => "importing",
            RestorePhase::Committing => "committing",
            RestorePhase::Done => "done",
            RestorePhase::Aborting => "aborting",
            RestorePhase::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

fn log_transition(from: RestorePhase, to: RestorePhase) {
    debug!(from = %from, to = %to, "restore phase");
}

/// A snapshot that passed every validation check
#[derive(Debug, Clone)]
pub struct ValidatedSnapshot {
    manifest: Manifest,
    data: BTreeMap<EntityType, Vec<Value>>,
    warnings: Vec<String>,
}

impl ValidatedSnapshot {
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Problems found during validation that don't block the restore
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Raw records of one entity type; empty if the type is absent
    pub fn records(&self, entity_type: EntityType) -> &[Value] {
        self.data
            .get(&entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of records that will be offered to the store
    pub fn record_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// One-line description for confirmation prompts
    pub fn summary(&self) -> String {
        let counts: Vec<String> = self
            .data
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(entity_type, records)| format!("{} {}", records.len(), entity_type))
            .collect();

        format!(
            "Snapshot v{} by {} at {}: {}",
            self.manifest.version,
            self.manifest.created_by,
            self.manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            if counts.is_empty() {
                "no records".to_string()
            } else {
                counts.join(", ")
            }
        )
    }
}

/// Mutable state of one restore, threaded through the import loop
struct RestoreRun {
    phase: RestorePhase,
    summary: BTreeMap<EntityType, u64>,
    errors: Vec<RecordError>,
    warnings: Vec<String>,
    /// Snapshot id -> stored id, per entity type, for records that resolved
    /// to an existing record with a different id
    id_remap: HashMap<EntityType, HashMap<String, String>>,
    audit: Vec<AuditEntry>,
}

impl RestoreRun {
    fn new(warnings: Vec<String>) -> Self {
        Self {
            phase: RestorePhase::Validating,
            summary: BTreeMap::new(),
            errors: Vec::new(),
            warnings,
            id_remap: HashMap::new(),
            audit: Vec::new(),
        }
    }

    fn advance(&mut self, next: RestorePhase) {
        log_transition(self.phase, next);
        self.phase = next;
    }

    fn record_error(&mut self, entity_type: EntityType, index: usize, message: String) {
        debug!(entity_type = %entity_type, index, error = %message, "record rejected");
        self.errors.push(RecordError {
            entity_type,
            index,
            message,
        });
    }

    /// Point reference fields at the ids records actually got in the store
    fn remap_references(&self, descriptor: &EntityDescriptor, record: &mut Record) {
        for reference in descriptor.references {
            let remapped = record
                .get(reference.field)
                .and_then(scalar_to_string)
                .and_then(|id| self.id_remap.get(&reference.target)?.get(&id).cloned());

            if let Some(stored_id) = remapped {
                record.set(reference.field, Value::String(stored_id));
            }
        }
    }

    fn import_record(
        &mut self,
        tx: &mut dyn Transaction,
        resolver: &ConflictResolver<'_>,
        descriptor: &EntityDescriptor,
        index: usize,
        value: Value,
    ) {
        let entity_type = descriptor.entity_type;
        let mut record = match Record::from_value(entity_type, value) {
            Ok(record) => record,
            Err(e) => return self.record_error(entity_type, index, e.to_string()),
        };

        self.remap_references(descriptor, &mut record);
        let incoming_id = record.id();

        match resolver.place(tx, record) {
            Ok(resolution) => self.apply(descriptor, incoming_id, resolution),
            Err(e) => self.record_error(entity_type, index, e.to_string()),
        }
    }

    fn apply(
        &mut self,
        descriptor: &EntityDescriptor,
        incoming_id: Option<String>,
        resolution: Resolution,
    ) {
        let entity_type = descriptor.entity_type;
        let stored = resolution.stored();

        if let (Some(incoming), Some(stored_id)) = (incoming_id, stored.id()) {
            if incoming != stored_id {
                self.id_remap
                    .entry(entity_type)
                    .or_default()
                    .insert(incoming, stored_id);
            }
        }

        let natural_key = stored
            .natural_key(descriptor.natural_key)
            .map(|k| k.to_string());
        let redactor = Redactor::for_descriptor(descriptor);

        match resolution {
            Resolution::Inserted(record) | Resolution::Appended(record) => {
                *self.summary.entry(entity_type).or_insert(0) += 1;
                self.audit.push(AuditEntry::create(
                    entity_type,
                    record.id().unwrap_or_default(),
                    natural_key,
                    redactor.redact(&record).into_value(),
                ));
            }
            Resolution::Merged { before, after } => {
                *self.summary.entry(entity_type).or_insert(0) += 1;
                let before = redactor.redact(&before).into_value();
                let after_value = redactor.redact(&after).into_value();
                let diff = generate_diff(&before, &after_value);
                self.audit.push(AuditEntry::update(
                    entity_type,
                    after.id().unwrap_or_default(),
                    natural_key,
                    before,
                    after_value,
                    diff,
                ));
            }
            Resolution::Skipped { warning, .. } => {
                debug!(entity_type = %entity_type, "{}", warning);
                self.warnings.push(warning);
            }
        }
    }

    fn into_committed_report(self, backup_info: BackupInfo) -> RestoreReport {
        RestoreReport {
            success: true,
            rolled_back: false,
            total_imported: self.summary.values().sum(),
            summary: self.summary,
            errors: self.errors.iter().map(ToString::to_string).collect(),
            warnings: self.warnings,
            backup_info,
        }
    }

    fn into_rolled_back_report(self, backup_info: BackupInfo, threshold: usize) -> RestoreReport {
        let fatal = PropdeskError::FatalThreshold {
            errors: self.errors.len(),
            threshold,
        };

        let mut errors: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        errors.push(fatal.to_string());

        RestoreReport {
            success: false,
            rolled_back: true,
            total_imported: 0,
            summary: self.summary.into_keys().map(|t| (t, 0)).collect(),
            errors,
            warnings: self.warnings,
            backup_info,
        }
    }
}

/// Validates snapshots and restores them into the store
pub struct RestoreOrchestrator<'a, M: TransactionManager + ?Sized> {
    manager: &'a M,
    registry: &'a EntityRegistry,
    options: RestoreOptions,
    audit_logger: Option<AuditLogger>,
}

impl<'a, M: TransactionManager + ?Sized> RestoreOrchestrator<'a, M> {
    pub fn new(manager: &'a M, registry: &'a EntityRegistry, options: RestoreOptions) -> Self {
        Self {
            manager,
            registry,
            options,
            audit_logger: None,
        }
    }

    /// Record committed writes in an audit log
    pub fn with_audit_logger(mut self, logger: AuditLogger) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    pub fn options(&self) -> &RestoreOptions {
        &self.options
    }

    fn check_size(&self, size: u64) -> PropdeskResult<()> {
        if size > self.options.max_upload_bytes {
            return Err(PropdeskError::Size {
                size,
                limit: self.options.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Validate a snapshot file without restoring it
    ///
    /// The size is checked from file metadata before anything is read. The
    /// format follows the extension (`.yaml`/`.yml`, otherwise JSON).
    pub fn validate_file(&self, path: &Path) -> PropdeskResult<ValidatedSnapshot> {
        let metadata = fs::metadata(path)
            .map_err(|e| PropdeskError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        self.check_size(metadata.len()).map_err(|e| {
            warn!(path = %path.display(), error = %e, "snapshot rejected");
            e
        })?;

        let format = SnapshotFormat::from_path(path).unwrap_or_default();
        let bytes = fs::read(path)
            .map_err(|e| PropdeskError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        self.validate_bytes(&bytes, format)
    }

    /// Validate an uploaded snapshot without restoring it
    pub fn validate_bytes(
        &self,
        bytes: &[u8],
        format: SnapshotFormat,
    ) -> PropdeskResult<ValidatedSnapshot> {
        log_transition(RestorePhase::Idle, RestorePhase::Validating);
        self.validate_inner(bytes, format).map_err(|e| {
            warn!(error = %e, "snapshot rejected");
            e
        })
    }

    fn validate_inner(
        &self,
        bytes: &[u8],
        format: SnapshotFormat,
    ) -> PropdeskResult<ValidatedSnapshot> {
        self.check_size(bytes.len() as u64)?;

        let document = parse_payload(bytes, format)?;
        check_version(manifest_version(&document)?)?;

        let document: SnapshotDocument = serde_json::from_value(document)
            .map_err(|e| PropdeskError::Format(format!("invalid snapshot document: {}", e)))?;
        document.manifest.check_version_requirements()?;
        document.manifest.verify_counts(&document.data)?;

        let mut data = BTreeMap::new();
        let mut warnings = Vec::new();
        for (name, records) in document.data {
            match name.parse::<EntityType>() {
                Ok(entity_type) if self.registry.contains(entity_type) => {
                    data.insert(entity_type, records);
                }
                _ => {
                    warn!(entity_type = %name, records = records.len(), "skipping unknown entity type");
                    warnings.push(format!(
                        "{}: unknown entity type, {} record(s) skipped",
                        name,
                        records.len()
                    ));
                }
            }
        }

        Ok(ValidatedSnapshot {
            manifest: document.manifest,
            data,
            warnings,
        })
    }

    /// Validate and restore a snapshot file
    pub fn restore_file(&self, path: &Path) -> PropdeskResult<RestoreReport> {
        let snapshot = self.validate_file(path)?;
        self.restore_validated(snapshot)
    }

    /// Validate and restore an uploaded snapshot
    pub fn restore_bytes(&self, bytes: &[u8], format: SnapshotFormat) -> PropdeskResult<RestoreReport> {
        let snapshot = self.validate_bytes(bytes, format)?;
        self.restore_validated(snapshot)
    }

    /// Restore an in-memory snapshot through the same checks as an upload
    pub fn restore_snapshot(&self, snapshot: &Snapshot) -> PropdeskResult<RestoreReport> {
        let json = snapshot.to_json()?;
        self.restore_bytes(json.as_bytes(), SnapshotFormat::Json)
    }

    /// Import a validated snapshot in one transaction
    pub fn restore_validated(&self, snapshot: ValidatedSnapshot) -> PropdeskResult<RestoreReport> {
        let order = self.registry.import_order()?;
        let resolver = ConflictResolver::new(self.registry);
        let threshold = self.options.fatal_error_threshold;

        let ValidatedSnapshot {
            manifest,
            mut data,
            warnings,
        } = snapshot;
        let backup_info = manifest.backup_info();

        let mut run = RestoreRun::new(warnings);
        let mut tx = self.manager.begin()?;
        run.advance(RestorePhase::Importing);

        for entity_type in order {
            let records = match data.remove(&entity_type) {
                Some(records) => records,
                None => continue,
            };
            let descriptor = match self.registry.get(entity_type) {
                Some(descriptor) => descriptor,
                None => continue,
            };

            run.summary.insert(entity_type, 0);
            for (index, value) in records.into_iter().enumerate() {
                run.import_record(tx.as_mut(), &resolver, descriptor, index, value);
            }

            debug!(
                entity_type = %entity_type,
                imported = run.summary.get(&entity_type).copied().unwrap_or(0),
                errors = run.errors.len(),
                "entity type processed"
            );
        }

        if run.errors.len() > threshold {
            run.advance(RestorePhase::Aborting);
            tx.rollback()?;
            run.advance(RestorePhase::RolledBack);

            warn!(
                errors = run.errors.len(),
                threshold,
                "restore rolled back: too many record errors"
            );
            return Ok(run.into_rolled_back_report(backup_info, threshold));
        }

        run.advance(RestorePhase::Committing);
        tx.commit().map_err(|e| {
            warn!(error = %e, "restore commit failed; store unchanged");
            e
        })?;
        run.advance(RestorePhase::Done);

        if let Some(logger) = &self.audit_logger {
            if let Err(e) = logger.log_batch(&run.audit) {
                warn!(error = %e, "audit log write failed after commit");
                run.warnings
                    .push(format!("restore committed but the audit log was not written: {}", e));
            }
        }

        let report = run.into_committed_report(backup_info);
        info!(
            imported = report.total_imported,
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            "restore committed"
        );
        Ok(report)
    }
}

fn parse_payload(bytes: &[u8], format: SnapshotFormat) -> PropdeskResult<Value> {
    match format {
        SnapshotFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| PropdeskError::Format(format!("not valid JSON: {}", e))),
        SnapshotFormat::Yaml => serde_yaml::from_slice(bytes)
            .map_err(|e| PropdeskError::Format(format!("not valid YAML: {}", e))),
    }
}

fn manifest_version(document: &Value) -> PropdeskResult<&str> {
    let root = document
        .as_object()
        .ok_or_else(|| PropdeskError::Format("snapshot must be an object".into()))?;
    let manifest = root
        .get("manifest")
        .and_then(Value::as_object)
        .ok_or_else(|| PropdeskError::Format("missing 'manifest' object".into()))?;
    manifest
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| PropdeskError::Format("'manifest.version' must be a string".into()))
}
