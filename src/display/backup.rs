//! Snapshot archive display formatting
//!
//! Formats stored snapshot files and snapshot contents for terminal output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::{SnapshotFileInfo, ValidatedSnapshot};
use crate::models::EntityType;

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    filename: String,
    #[tabled(rename = "Created (UTC)")]
    created: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Records")]
    records: u64,
}

/// Format the snapshot archive as a table, newest first
pub fn format_backup_list(backups: &[SnapshotFileInfo], now: DateTime<Utc>) -> String {
    if backups.is_empty() {
        return "No snapshots found.\nCreate one with: propdesk backup create".to_string();
    }

    let rows = backups.iter().enumerate().map(|(i, backup)| BackupRow {
        index: i + 1,
        filename: backup.filename.clone(),
        created: backup.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        age: format_duration(now.signed_duration_since(backup.created_at)),
        size: format_size(backup.size_bytes),
        kind: if backup.is_monthly { "monthly" } else { "daily" },
    });

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push_str(&format!("\n\nTotal: {} snapshot(s)", backups.len()));
    output
}

/// Format per-type record counts as a table
pub fn format_counts<I>(counts: I) -> String
where
    I: IntoIterator<Item = (EntityType, u64)>,
{
    let rows: Vec<CountRow> = counts
        .into_iter()
        .map(|(entity_type, records)| CountRow {
            entity: entity_type.to_string(),
            records,
        })
        .collect();
    let total: u64 = rows.iter().map(|r| r.records).sum();

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push_str(&format!("\n\nTotal: {} record(s)", total));
    output
}

/// Format the details of a validated snapshot file
pub fn format_snapshot_details(
    path: &std::path::Path,
    size_bytes: u64,
    snapshot: &ValidatedSnapshot,
) -> String {
    let manifest = snapshot.manifest();
    let mut output = String::new();

    output.push_str("Snapshot Details\n");
    output.push_str("================\n");
    output.push_str(&format!("File:       {}\n", path.display()));
    output.push_str(&format!("Size:       {}\n", format_size(size_bytes)));
    output.push_str(&format!("Version:    {}\n", manifest.version));
    output.push_str(&format!(
        "Created:    {}\n",
        manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("Created by: {}\n", manifest.created_by));

    match &manifest.security {
        Some(security) if !security.entities_filtered.is_empty() => {
            output.push_str(&format!(
                "Redacted:   {}\n",
                security.entities_filtered.join(", ")
            ));
        }
        Some(_) => output.push_str("Redacted:   nothing\n"),
        None => output.push_str("Redacted:   not recorded (legacy snapshot)\n"),
    }

    output.push('\n');
    let counts: BTreeMap<EntityType, u64> = EntityType::ALL
        .iter()
        .map(|t| (*t, snapshot.records(*t).len() as u64))
        .filter(|(_, n)| *n > 0)
        .collect();
    output.push_str(&format_counts(counts));

    for warning in snapshot.warnings() {
        output.push_str(&format!("\nwarning: {}", warning));
    }

    output
}

/// Format a duration in human-readable form
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
