//! Append-only audit log
//!
//! Entries are stored one JSON object per line (JSONL). A restore writes its
//! entries in one batch, after its transaction has committed.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{PropdeskError, PropdeskResult};
use crate::models::EntityType;

use super::entry::AuditEntry;

/// Writes and reads the audit log file
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    fn open_for_append(&self) -> PropdeskResult<File> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PropdeskError::Io(format!("Failed to create audit directory: {}", e)))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| PropdeskError::Io(format!("Failed to open audit log: {}", e)))
    }

    /// Append a single entry
    pub fn log(&self, entry: &AuditEntry) -> PropdeskResult<()> {
        self.log_batch(std::slice::from_ref(entry))
    }

    /// Append several entries, flushing once at the end
    pub fn log_batch(&self, entries: &[AuditEntry]) -> PropdeskResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut writer = BufWriter::new(self.open_for_append()?);

        for entry in entries {
            let json = serde_json::to_string(entry).map_err(|e| {
                PropdeskError::Json(format!("Failed to serialize audit entry: {}", e))
            })?;

            writeln!(writer, "{}", json)
                .map_err(|e| PropdeskError::Io(format!("Failed to write audit entry: {}", e)))?;
        }

        writer
            .flush()
            .map_err(|e| PropdeskError::Io(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Read all entries, oldest first
    pub fn read_all(&self) -> PropdeskResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| PropdeskError::Io(format!("Failed to open audit log: {}", e)))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                PropdeskError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                PropdeskError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Read the most recent N entries
    pub fn read_recent(&self, count: usize) -> PropdeskResult<Vec<AuditEntry>> {
        let mut entries = self.read_all()?;
        let start = entries.len().saturating_sub(count);
        Ok(entries.split_off(start))
    }

    /// Read the most recent N entries touching one entity type
    pub fn read_recent_for(
        &self,
        entity_type: EntityType,
        count: usize,
    ) -> PropdeskResult<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .read_all()?
            .into_iter()
            .filter(|e| e.entity_type == entity_type)
            .collect();
        let start = entries.len().saturating_sub(count);
        Ok(entries.split_off(start))
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::Operation;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_logger() -> (AuditLogger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp_dir.path().join("audit.log"));
        (logger, temp_dir)
    }

    fn entry(i: usize) -> AuditEntry {
        AuditEntry::create(
            EntityType::Customers,
            format!("c-{}", i),
            Some(format!("customer{}@example.com", i)),
            json!({"index": i}),
        )
    }

    #[test]
    fn test_log_and_read() {
        let (logger, _temp) = create_test_logger();
        logger.log(&entry(0)).unwrap();

        let entries = logger.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Create);
        assert_eq!(entries[0].entity_type, EntityType::Customers);
    }

    #[test]
    fn test_log_batch_appends() {
        let (logger, _temp) = create_test_logger();

        let first: Vec<AuditEntry> = (0..3).map(entry).collect();
        logger.log_batch(&first).unwrap();
        logger.log_batch(&[entry(3)]).unwrap();

        assert_eq!(logger.read_all().unwrap().len(), 4);
    }

    #[test]
    fn test_empty_batch_creates_nothing() {
        let (logger, _temp) = create_test_logger();
        logger.log_batch(&[]).unwrap();
        assert!(!logger.path().exists());
    }

    #[test]
    fn test_read_recent() {
        let (logger, _temp) = create_test_logger();
        let entries: Vec<AuditEntry> = (0..10).map(entry).collect();
        logger.log_batch(&entries).unwrap();

        let recent = logger.read_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].entity_id, "c-7");
        assert_eq!(recent[2].entity_id, "c-9");
    }

    #[test]
    fn test_read_recent_for_entity_type() {
        let (logger, _temp) = create_test_logger();
        let user = AuditEntry::create(EntityType::Users, "u-1", None, json!({}));
        logger
            .log_batch(&[entry(0), user, entry(1), entry(2)])
            .unwrap();

        let customers = logger.read_recent_for(EntityType::Customers, 2).unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].entity_id, "c-1");

        let users = logger.read_recent_for(EntityType::Users, 10).unwrap();
        assert_eq!(users.len(), 1);
        assert!(logger.read_recent_for(EntityType::Leads, 10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_log() {
        let (logger, _temp) = create_test_logger();
        assert!(logger.read_all().unwrap().is_empty());
        assert!(logger.read_recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_line_is_reported() {
        let (logger, _temp) = create_test_logger();
        logger.log(&entry(0)).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(logger.path())
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();

        let err = logger.read_all().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
