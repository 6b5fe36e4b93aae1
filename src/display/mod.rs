//! Display formatting for terminal output
//!
//! Provides utilities for formatting snapshots, restore reports and audit
//! entries for terminal display.

pub mod backup;
pub mod report;

pub use backup::{format_backup_list, format_counts, format_duration, format_size, format_snapshot_details};
pub use report::{format_audit_entries, format_restore_report};
