//! Propdesk - backup and restore engine for a real-estate CRM store
//!
//! This library takes redacted, versioned, point-in-time snapshots of every
//! entity type in the CRM store and restores them atomically.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Entity type tags and schemaless records
//! - `registry`: Per-type redaction, natural key, conflict and dependency rules
//! - `storage`: JSON file store with staged transactions
//! - `backup`: Snapshot building, redaction, validation and restore
//! - `audit`: Audit logging for restored records
//! - `cli`, `display`: Command handlers and terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use propdesk::backup::{RestoreOptions, RestoreOrchestrator, SnapshotBuilder};
//! use propdesk::config::paths::PropdeskPaths;
//! use propdesk::storage::Storage;
//!
//! let storage = Storage::new(PropdeskPaths::new()?)?;
//! storage.load()?;
//! let snapshot = SnapshotBuilder::new(&storage, storage.registry()).build()?;
//! let report = RestoreOrchestrator::new(&storage, storage.registry(), RestoreOptions::default())
//!     .restore_snapshot(&snapshot)?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod registry;
pub mod storage;

pub use error::{PropdeskError, PropdeskResult};
