//! Backup CLI commands
//!
//! Implements CLI commands for taking, inspecting and restoring snapshots.

use clap::Subcommand;

use crate::audit::AuditLogger;
use crate::backup::{
    BackupManager, RestoreOptions, RestoreOrchestrator, Snapshot, SnapshotBuilder,
    SnapshotFormat,
};
use crate::config::paths::PropdeskPaths;
use crate::config::settings::Settings;
use crate::display::{format_backup_list, format_restore_report, format_snapshot_details};
use crate::error::{PropdeskError, PropdeskResult};
use crate::storage::Storage;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Take a snapshot of the whole store
    Create {
        /// Snapshot file format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<SnapshotFormat>,
    },

    /// List stored snapshots
    List,

    /// Validate a snapshot and show its contents
    Info {
        /// Snapshot filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Restore a snapshot into the store
    Restore {
        /// Snapshot filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,

        /// Print the restore report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete old snapshots according to retention policy
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &PropdeskPaths,
    settings: &Settings,
    storage: &Storage,
    cmd: BackupCommands,
) -> PropdeskResult<()> {
    let manager = BackupManager::new(paths, settings.backup.retention.clone());
    let options = RestoreOptions::from(&settings.backup);

    match cmd {
        BackupCommands::Create { format } => {
            let format = format.unwrap_or(settings.backup.format);
            let snapshot = build_snapshot(storage, settings)?;
            let (path, deleted) = manager.save_with_retention(&snapshot, format)?;

            println!("Snapshot created: {}", path.display());
            if !deleted.is_empty() {
                println!("Pruned {} expired snapshot(s).", deleted.len());
            }
        }

        BackupCommands::List => {
            let backups = manager.list_backups()?;
            println!("{}", format_backup_list(&backups, chrono::Utc::now()));
        }

        BackupCommands::Info { backup } => {
            let path = manager.resolve(&backup)?;
            let orchestrator = RestoreOrchestrator::new(storage, storage.registry(), options);
            let validated = orchestrator.validate_file(&path)?;
            let size = std::fs::metadata(&path)?.len();

            println!("{}", format_snapshot_details(&path, size, &validated));
        }

        BackupCommands::Restore {
            backup,
            force,
            json,
        } => {
            let path = manager.resolve(&backup)?;
            let orchestrator = RestoreOrchestrator::new(storage, storage.registry(), options)
                .with_audit_logger(AuditLogger::new(paths.audit_log()));

            let validated = orchestrator.validate_file(&path)?;

            if !force {
                println!("{}", validated.summary());
                println!();
                println!("WARNING: Records in this snapshot will be merged into the current store.");
                println!("To proceed, run again with --force flag:");
                println!("  propdesk backup restore {} --force", backup);
                return Ok(());
            }

            // Snapshot the current state first. No retention pass, so the
            // restore source is never pruned.
            let snapshot = build_snapshot(storage, settings)?;
            let safety = manager.save_snapshot(&snapshot, settings.backup.format)?;
            if !json {
                println!("Pre-restore snapshot saved: {}", safety.display());
                println!();
            }

            let report = orchestrator.restore_validated(validated)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", format_restore_report(&report));
            }

            if report.rolled_back {
                return Err(PropdeskError::FatalThreshold {
                    errors: report.record_error_count(),
                    threshold: options.fatal_error_threshold,
                });
            }
        }

        BackupCommands::Prune { force } => {
            let backups = manager.list_backups()?;
            let retention = &settings.backup.retention;

            let (monthly, daily): (Vec<_>, Vec<_>) = backups.iter().partition(|b| b.is_monthly);
            let daily_to_delete = daily.len().saturating_sub(retention.daily_count as usize);
            let monthly_to_delete = monthly
                .len()
                .saturating_sub(retention.monthly_count as usize);

            println!(
                "Retention policy: {} daily, {} monthly",
                retention.daily_count, retention.monthly_count
            );
            println!(
                "Current snapshots: {} daily, {} monthly",
                daily.len(),
                monthly.len()
            );

            if daily_to_delete + monthly_to_delete == 0 {
                println!("No snapshots to prune.");
                return Ok(());
            }

            println!(
                "To be deleted: {} daily, {} monthly",
                daily_to_delete, monthly_to_delete
            );

            if !force {
                println!();
                println!("To delete old snapshots, run again with --force flag:");
                println!("  propdesk backup prune --force");
                return Ok(());
            }

            let deleted = manager.enforce_retention()?;
            println!("Deleted {} snapshot(s).", deleted.len());
        }
    }

    Ok(())
}

fn build_snapshot(storage: &Storage, settings: &Settings) -> PropdeskResult<Snapshot> {
    SnapshotBuilder::new(storage, storage.registry())
        .created_by(settings.backup.resolve_created_by())
        .build()
}
