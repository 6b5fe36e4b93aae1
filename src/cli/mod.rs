//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup engine.

pub mod audit;
pub mod backup;
pub mod stats;

pub use audit::handle_audit_command;
pub use backup::{handle_backup_command, BackupCommands};
pub use stats::handle_stats_command;
