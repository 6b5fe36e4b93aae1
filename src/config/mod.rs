//! Configuration module for Propdesk
//!
//! This module provides configuration management including:
//! - Platform path resolution with an environment override
//! - Settings persistence (backup retention, restore limits)

pub mod paths;
pub mod settings;

pub use paths::PropdeskPaths;
pub use settings::{BackupRetention, BackupSettings, Settings};
