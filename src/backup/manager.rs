//! Snapshot file archive
//!
//! Stores snapshot files in the backup directory as
//! `snapshot-YYYYMMDD-HHMMSS-mmm.{json,yaml}` and applies the retention
//! policy: a number of daily snapshots plus a number of monthly ones (taken
//! on the first of the month). Snapshots taken in the same millisecond get
//! a `-N` suffix rather than replacing one another.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::paths::PropdeskPaths;
use crate::config::settings::BackupRetention;
use crate::error::{PropdeskError, PropdeskResult};
use crate::storage::write_atomic;

use super::snapshot::{Snapshot, SnapshotFormat};

const FILE_PREFIX: &str = "snapshot-";

/// Upper bound on snapshots sharing one millisecond
const MAX_SEQUENCE: u32 = 1000;

/// Identifier accepted by [`BackupManager::resolve`] for the newest snapshot
pub const LATEST: &str = "latest";

/// Metadata about a stored snapshot file
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotFileInfo {
    pub filename: String,
    pub path: PathBuf,
    /// Creation time encoded in the filename
    pub created_at: DateTime<Utc>,
    /// Disambiguates snapshots sharing the same millisecond
    pub sequence: u32,
    pub size_bytes: u64,
    pub format: SnapshotFormat,
    /// Whether this is a monthly snapshot (kept longer)
    pub is_monthly: bool,
}

/// Manages snapshot files and their retention
pub struct BackupManager {
    backup_dir: PathBuf,
    retention: BackupRetention,
}

impl BackupManager {
    pub fn new(paths: &PropdeskPaths, retention: BackupRetention) -> Self {
        Self {
            backup_dir: paths.backup_dir(),
            retention,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Write a snapshot file, returning its path
    ///
    /// A listing never sees a partial snapshot, and an existing snapshot is
    /// never overwritten. No retention pass runs here.
    pub fn save_snapshot(&self, snapshot: &Snapshot, format: SnapshotFormat) -> PropdeskResult<PathBuf> {
        let path = self.free_snapshot_path(snapshot.manifest().created_at, format)?;

        write_atomic(&path, |writer| snapshot.write_to(writer, format))?;

        info!(path = %path.display(), "snapshot saved");
        Ok(path)
    }

    /// First unused `snapshot-...` path for this timestamp
    fn free_snapshot_path(
        &self,
        created_at: DateTime<Utc>,
        format: SnapshotFormat,
    ) -> PropdeskResult<PathBuf> {
        let stem = format!(
            "{}{}-{:03}",
            FILE_PREFIX,
            created_at.format("%Y%m%d-%H%M%S"),
            created_at.timestamp_subsec_millis()
        );

        for sequence in 0..MAX_SEQUENCE {
            let filename = if sequence == 0 {
                format!("{}.{}", stem, format.extension())
            } else {
                format!("{}-{}.{}", stem, sequence, format.extension())
            };
            let path = self.backup_dir.join(filename);
            if !path.exists() {
                return Ok(path);
            }
        }

        Err(PropdeskError::Storage(format!(
            "Too many snapshots named {}",
            stem
        )))
    }

    /// Save a snapshot and then enforce the retention policy
    pub fn save_with_retention(
        &self,
        snapshot: &Snapshot,
        format: SnapshotFormat,
    ) -> PropdeskResult<(PathBuf, Vec<PathBuf>)> {
        let path = self.save_snapshot(snapshot, format)?;
        let deleted = self.enforce_retention()?;
        Ok((path, deleted))
    }

    /// List stored snapshots, newest first
    pub fn list_backups(&self) -> PropdeskResult<Vec<SnapshotFileInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir).map_err(|e| {
            PropdeskError::Io(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                PropdeskError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            if let Some(info) = parse_backup_info(&entry.path()) {
                backups.push(info);
            }
        }

        backups.sort_by(|a, b| {
            (b.created_at, b.sequence).cmp(&(a.created_at, a.sequence))
        });
        Ok(backups)
    }

    /// Delete snapshots beyond the retention policy
    pub fn enforce_retention(&self) -> PropdeskResult<Vec<PathBuf>> {
        let (monthly, daily): (Vec<_>, Vec<_>) =
            self.list_backups()?.into_iter().partition(|b| b.is_monthly);

        let expired = daily
            .into_iter()
            .skip(self.retention.daily_count as usize)
            .chain(monthly.into_iter().skip(self.retention.monthly_count as usize));

        let mut deleted = Vec::new();
        for backup in expired {
            fs::remove_file(&backup.path).map_err(|e| {
                PropdeskError::Io(format!(
                    "Failed to delete old snapshot {}: {}",
                    backup.filename, e
                ))
            })?;
            debug!(path = %backup.path.display(), "expired snapshot deleted");
            deleted.push(backup.path);
        }

        Ok(deleted)
    }

    /// Get the most recent snapshot
    pub fn get_latest_backup(&self) -> PropdeskResult<Option<SnapshotFileInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    /// Resolve `latest`, a snapshot filename, or a path to a snapshot file
    pub fn resolve(&self, identifier: &str) -> PropdeskResult<PathBuf> {
        if identifier == LATEST {
            return self
                .get_latest_backup()?
                .map(|info| info.path)
                .ok_or_else(|| PropdeskError::backup_not_found("no snapshots have been taken"));
        }

        let in_archive = self.backup_dir.join(identifier);
        if in_archive.is_file() {
            return Ok(in_archive);
        }

        let as_path = PathBuf::from(identifier);
        if as_path.is_file() {
            return Ok(as_path);
        }

        Err(PropdeskError::backup_not_found(identifier))
    }
}

/// Parse snapshot file metadata from its path, ignoring foreign files
fn parse_backup_info(path: &Path) -> Option<SnapshotFileInfo> {
    let format = SnapshotFormat::from_path(path)?;
    let filename = path.file_name()?.to_string_lossy().to_string();
    let stem = path.file_stem()?.to_str()?.strip_prefix(FILE_PREFIX)?;
    let (created_at, sequence) = parse_backup_stem(stem)?;
    let size_bytes = fs::metadata(path).ok()?.len();

    Some(SnapshotFileInfo {
        filename,
        path: path.to_path_buf(),
        created_at,
        sequence,
        size_bytes,
        format,
        is_monthly: created_at.day() == 1,
    })
}

/// Parse `YYYYMMDD-HHMMSS`, `YYYYMMDD-HHMMSS-mmm` or `YYYYMMDD-HHMMSS-mmm-N`
pub fn parse_backup_timestamp(date_str: &str) -> Option<DateTime<Utc>> {
    parse_backup_stem(date_str).map(|(created_at, _)| created_at)
}

fn parse_backup_stem(date_str: &str) -> Option<(DateTime<Utc>, u32)> {
    let parts: Vec<&str> = date_str.split('-').collect();
    let (date_part, time_part, millis, sequence) = match parts.as_slice() {
        [date, time] => (*date, *time, 0u32, 0u32),
        [date, time, millis] => (*date, *time, millis.parse::<u32>().ok()?, 0),
        [date, time, millis, sequence] => (
            *date,
            *time,
            millis.parse::<u32>().ok()?,
            sequence.parse::<u32>().ok()?,
        ),
        _ => return None,
    };

    if date_part.len() != 8 || time_part.len() != 6 {
        return None;
    }

    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
    let time = NaiveTime::parse_from_str(time_part, "%H%M%S").ok()?;
    let time = time.with_nanosecond(millis * 1_000_000)?;

    let created_at = DateTime::from_naive_utc_and_offset(NaiveDateTime::new(date, time), Utc);
    Some((created_at, sequence))
}
