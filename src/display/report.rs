//! Restore report and audit log formatting

use crate::audit::AuditEntry;
use crate::backup::RestoreReport;

/// Longest error/warning list printed before eliding the rest
const MAX_LISTED: usize = 20;

/// Format a restore report for terminal output
pub fn format_restore_report(report: &RestoreReport) -> String {
    let mut output = String::new();

    let status = if report.rolled_back {
        "ROLLED BACK"
    } else if report.success {
        "OK"
    } else {
        "FAILED"
    };

    output.push_str(&format!("Restore {}\n", status));
    output.push_str(&format!(
        "Snapshot:   v{} by {} at {}\n",
        report.backup_info.version,
        report.backup_info.created_by,
        report.backup_info.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&report.summary_text());
    output.push('\n');

    push_section(&mut output, "Errors", &report.errors);
    push_section(&mut output, "Warnings", &report.warnings);

    output
}

fn push_section(output: &mut String, title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }

    output.push_str(&format!("\n{} ({}):\n", title, lines.len()));
    for line in lines.iter().take(MAX_LISTED) {
        output.push_str(&format!("  - {}\n", line));
    }
    if lines.len() > MAX_LISTED {
        output.push_str(&format!("  ... and {} more\n", lines.len() - MAX_LISTED));
    }
}

/// Format audit entries, oldest first
pub fn format_audit_entries(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return "No audit entries.".to_string();
    }

    entries
        .iter()
        .map(AuditEntry::format_human_readable)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupInfo;
    use crate::models::EntityType;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn report(rolled_back: bool, errors: usize) -> RestoreReport {
        RestoreReport {
            success: !rolled_back,
            rolled_back,
            total_imported: if rolled_back { 0 } else { 2 },
            summary: BTreeMap::from([(EntityType::Users, if rolled_back { 0 } else { 2 })]),
            errors: (0..errors).map(|i| format!("users[{}]: missing email", i)).collect(),
            warnings: vec![],
            backup_info: BackupInfo {
                version: "2.0".into(),
                created_at: Utc::now(),
                created_by: "ana".into(),
            },
        }
    }

    #[test]
    fn test_successful_report() {
        let output = format_restore_report(&report(false, 0));
        assert!(output.starts_with("Restore OK"));
        assert!(output.contains("Restored 2 record(s): 2 users"));
        assert!(!output.contains("Errors"));
    }

    #[test]
    fn test_rolled_back_report_elides_long_lists() {
        let output = format_restore_report(&report(true, 25));
        assert!(output.starts_with("Restore ROLLED BACK"));
        assert!(output.contains("Errors (25):"));
        assert!(output.contains("... and 5 more"));
    }

    #[test]
    fn test_audit_entries() {
        assert_eq!(format_audit_entries(&[]), "No audit entries.");

        let entry = AuditEntry::create(
            EntityType::Users,
            "u-1",
            Some("ana@example.com".into()),
            json!({"email": "ana@example.com"}),
        );
        let output = format_audit_entries(&[entry]);
        assert!(output.contains("CREATE users u-1 (ana@example.com)"));
    }
}
