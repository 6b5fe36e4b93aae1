//! Audit log for restores
//!
//! Every record a committed restore creates or updates gets one entry in an
//! append-only JSONL file, with redacted before/after values.
//!
//! - `AuditEntry`: one write, with timestamp, operation, entity and values
//! - `AuditLogger`: appends entries to the log file and reads them back
//! - `generate_diff`: human-readable summary of an update

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, Operation};
pub use logger::AuditLogger;
