//! Snapshot values and their serialized forms

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PropdeskError, PropdeskResult};
use crate::models::{EntityType, Record};

use super::manifest::Manifest;

/// On-disk snapshot format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// File extension used for this format
    pub fn extension(&self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Yaml => "yaml",
        }
    }

    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SnapshotFormat::Json),
            "yaml" | "yml" => Some(SnapshotFormat::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A redacted point-in-time copy of the store
///
/// Built only by [`SnapshotBuilder`](super::SnapshotBuilder) and never
/// modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    manifest: Manifest,
    data: BTreeMap<EntityType, Vec<Record>>,
}

impl Snapshot {
    pub(crate) fn new(manifest: Manifest, data: BTreeMap<EntityType, Vec<Record>>) -> Self {
        Self { manifest, data }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn data(&self) -> &BTreeMap<EntityType, Vec<Record>> {
        &self.data
    }

    /// Records of one entity type; empty if the type is absent
    pub fn records(&self, entity_type: EntityType) -> &[Record] {
        self.data.get(&entity_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of records across all entity types
    pub fn record_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> PropdeskResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PropdeskError::Json(format!("Failed to serialize snapshot: {}", e)))
    }

    /// Write the snapshot in the given format
    pub fn write_to<W: Write>(&self, writer: &mut W, format: SnapshotFormat) -> PropdeskResult<()> {
        match format {
            SnapshotFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, self).map_err(|e| {
                    PropdeskError::Json(format!("Failed to serialize snapshot: {}", e))
                })?;
                writeln!(writer)?;
            }
            SnapshotFormat::Yaml => {
                writeln!(writer, "# Propdesk snapshot")?;
                writeln!(writer, "# Generated: {}", self.manifest.created_at)?;
                writeln!(writer, "# Created by: {}", self.manifest.created_by)?;
                writeln!(writer, "#")?;
                writeln!(writer, "# Sensitive fields have been removed from this file.")?;
                writeln!(writer)?;
                serde_yaml::to_writer(&mut *writer, self).map_err(|e| {
                    PropdeskError::Yaml(format!("Failed to serialize snapshot: {}", e))
                })?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

/// An uploaded snapshot document, parsed but not yet validated
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotDocument {
    pub manifest: Manifest,
    /// Records per entity type name, including names this build doesn't know
    pub data: BTreeMap<String, Vec<Value>>,
}
