//! Atomic file replacement
//!
//! Both the record store and snapshot files are written under a temporary
//! name in the target directory and renamed into place. Readers see either
//! the old file or the complete new one.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PropdeskError, PropdeskResult};

/// Read a JSON document, or `T::default()` when the file is absent
pub fn read_json<T, P>(path: P) -> PropdeskResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| PropdeskError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PropdeskError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Pretty-print `data` as JSON and atomically replace `path` with it
pub fn write_json_atomic<T, P>(path: P, data: &T) -> PropdeskResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(writer, data)
            .map_err(|e| PropdeskError::Storage(format!("Failed to serialize data: {}", e)))
    })
}

/// Atomically replace `path` with whatever `fill` writes
///
/// The data is flushed and synced before the rename. On any failure the
/// temporary file is removed and `path` is left as it was.
pub fn write_atomic<P, F>(path: P, fill: F) -> PropdeskResult<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> PropdeskResult<()>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            PropdeskError::Io(format!("Failed to create directory {}: {}", parent.display(), e))
        })?;
    }

    let temp_path = temp_path_for(path);
    let file = File::create(&temp_path).map_err(|e| {
        PropdeskError::Io(format!("Failed to create {}: {}", temp_path.display(), e))
    })?;

    let mut writer = BufWriter::new(file);
    let written = fill(&mut writer).and_then(|_| {
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    });
    drop(writer);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        PropdeskError::Io(format!("Failed to replace {}: {}", path.display(), e))
    })
}

/// `store.json` -> `store.json.tmp`, in the same directory
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Table {
        rows: Vec<String>,
    }

    #[test]
    fn test_missing_file_reads_as_default() {
        let temp_dir = TempDir::new().unwrap();
        let table: Table = read_json(temp_dir.path().join("store.json")).unwrap();
        assert_eq!(table, Table::default());
    }

    #[test]
    fn test_json_round_trip_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("store.json");
        let table = Table {
            rows: vec!["a".into(), "b".into()],
        };

        write_json_atomic(&path, &table).unwrap();

        assert_eq!(read_json::<Table, _>(&path).unwrap(), table);
        assert!(!temp_dir.path().join("data").join("store.json.tmp").exists());
    }

    #[test]
    fn test_failed_fill_keeps_previous_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshot.yaml");
        fs::write(&path, "old").unwrap();

        let result = write_atomic(&path, |writer| {
            writer.write_all(b"partial")?;
            Err(PropdeskError::Yaml("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        assert!(!temp_dir.path().join("snapshot.yaml.tmp").exists());
    }

    #[test]
    fn test_invalid_json_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "not json at all").unwrap();

        let err = read_json::<Table, _>(&path).unwrap_err();
        assert!(matches!(err, PropdeskError::Storage(_)));
    }

    #[test]
    fn test_temp_path_for() {
        assert_eq!(
            temp_path_for(Path::new("/x/snapshot-1.json")),
            PathBuf::from("/x/snapshot-1.json.tmp")
        );
    }
}
