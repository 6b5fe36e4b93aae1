//! Backup and restore engine
//!
//! Takes redacted, versioned, point-in-time snapshots of every entity type
//! in the store and restores them atomically.
//!
//! # Architecture
//!
//! - `Redactor`: strips sensitive fields from records of any shape
//! - `SnapshotBuilder`: reads all entity types and assembles a snapshot
//! - `ConflictResolver`: applies per-type policies on natural-key collisions
//! - `RestoreOrchestrator`: validates a snapshot, then imports it in
//!   dependency order inside one transaction
//! - `BackupManager`: stores snapshot files and enforces retention
//!
//! # Snapshot Format
//!
//! ```text
//! {
//!   "manifest": {
//!     "version": "2.0",
//!     "createdAt": "2026-03-01T10:00:00Z",
//!     "createdBy": "admin",
//!     "totalRecords": { "users": 3, ... },
//!     "security": { "sensitiveDataFiltered": true, "entitiesFiltered": ["users", ...] }
//!   },
//!   "data": { "users": [ { ... }, ... ], ... }
//! }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use propdesk::backup::{BackupManager, RestoreOptions, RestoreOrchestrator, SnapshotBuilder};
//!
//! let snapshot = SnapshotBuilder::new(&storage, &registry)
//!     .created_by("admin")
//!     .build()?;
//! let path = manager.save_snapshot(&snapshot, SnapshotFormat::Json)?;
//!
//! let report = RestoreOrchestrator::new(&storage, &registry, RestoreOptions::default())
//!     .restore_file(&path)?;
//! println!("{}", report.summary_text());
//! ```

mod builder;
mod conflict;
mod manager;
mod manifest;
mod redact;
mod report;
mod restore;
mod snapshot;

pub use builder::{RedactionAudit, SnapshotBuild, SnapshotBuilder};
pub use conflict::{ConflictResolver, Resolution};
pub use manager::{parse_backup_timestamp, BackupManager, SnapshotFileInfo, LATEST};
pub use manifest::{
    check_version, is_supported_version, Manifest, SecurityInfo, CURRENT_SNAPSHOT_VERSION,
    SUPPORTED_SNAPSHOT_VERSIONS,
};
pub use redact::{redact_record, Redactor, Removal, RemovalReason, UNIVERSAL_SENSITIVE_PATTERNS};
pub use report::{BackupInfo, RecordError, RestoreReport};
pub use restore::{RestoreOptions, RestoreOrchestrator, RestorePhase, ValidatedSnapshot};
pub use snapshot::{Snapshot, SnapshotDocument, SnapshotFormat};
