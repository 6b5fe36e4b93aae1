//! Command-line tests for the propdesk binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn propdesk(base: &Path) -> Command {
    let mut cmd = Command::cargo_bin("propdesk").unwrap();
    cmd.env("PROPDESK_DATA_DIR", base)
        .env("PROPDESK_LOG", "off")
        .env("USER", "tester");
    cmd
}

fn write_snapshot(dir: &Path, name: &str, version: &str, data: Value) -> String {
    let total_records: serde_json::Map<String, Value> = data
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), json!(v.as_array().unwrap().len())))
        .collect();
    let document = json!({
        "manifest": {
            "version": version,
            "createdAt": "2026-03-01T10:00:00Z",
            "createdBy": "admin",
            "totalRecords": total_records,
            "security": { "sensitiveDataFiltered": true, "entitiesFiltered": [] }
        },
        "data": data
    });

    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(&document).unwrap()).unwrap();
    path.to_string_lossy().to_string()
}

fn backup_files(base: &Path) -> Vec<String> {
    let dir = base.join("backups");
    if !dir.exists() {
        return Vec::new();
    }
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

#[test]
fn init_creates_store_and_config() {
    let temp = TempDir::new().unwrap();

    propdesk(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete"));

    assert!(temp.path().join("data").join("store.json").exists());
    assert!(temp.path().join("config.json").exists());
}

#[test]
fn config_shows_paths_and_settings() {
    let temp = TempDir::new().unwrap();

    propdesk(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fatal error threshold: 50"))
        .stdout(predicate::str::contains("Snapshot author:       tester"));
}

#[test]
fn create_and_list_snapshots() {
    let temp = TempDir::new().unwrap();
    propdesk(temp.path()).arg("init").assert().success();

    propdesk(temp.path())
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshot created"));

    propdesk(temp.path())
        .args(["backup", "create", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".yaml"));

    propdesk(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 2 snapshot(s)"));

    propdesk(temp.path())
        .args(["backup", "info", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created by: tester"));
}

#[test]
fn list_without_snapshots() {
    let temp = TempDir::new().unwrap();

    propdesk(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshots found"));
}

#[test]
fn restore_requires_force() {
    let temp = TempDir::new().unwrap();
    let file = write_snapshot(
        temp.path(),
        "upload.json",
        "2.0",
        json!({ "users": [ { "email": "ana@example.com", "name": "Ana" } ] }),
    );

    propdesk(temp.path())
        .args(["backup", "restore", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));

    propdesk(temp.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 0 record(s)").or(predicate::str::contains("not initialized")));
}

#[test]
fn forced_restore_imports_records_and_writes_audit_log() {
    let temp = TempDir::new().unwrap();
    propdesk(temp.path()).arg("init").assert().success();
    let file = write_snapshot(
        temp.path(),
        "upload.json",
        "2.0",
        json!({
            "users": [ { "id": "u-1", "email": "ana@example.com", "name": "Ana" } ],
            "properties": [ { "referenceCode": "P-1", "title": "Loft", "agentId": "u-1" } ]
        }),
    );

    propdesk(temp.path())
        .args(["backup", "restore", &file, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pre-restore snapshot saved"))
        .stdout(predicate::str::contains("Restored 2 record(s)"));

    // The safety snapshot was taken before the restore
    assert_eq!(backup_files(temp.path()).len(), 1);

    propdesk(temp.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 2 record(s)"));

    propdesk(temp.path())
        .args(["audit", "--count", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE users u-1 (ana@example.com)"));

    propdesk(temp.path())
        .args(["audit", "--entity", "properties"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE properties"))
        .stdout(predicate::str::contains("CREATE users").not());
}

#[test]
fn restore_json_report() {
    let temp = TempDir::new().unwrap();
    propdesk(temp.path()).arg("init").assert().success();
    let file = write_snapshot(
        temp.path(),
        "upload.json",
        "2.0",
        json!({ "newsletterSubscribers": [ { "email": "a@example.com" }, { "email": "A@example.com" } ] }),
    );

    let output = propdesk(temp.path())
        .args(["backup", "restore", &file, "--force", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], json!(true));
    assert_eq!(report["totalImported"], json!(1));
    assert_eq!(report["warnings"].as_array().unwrap().len(), 1);
    assert_eq!(report["backupInfo"]["createdBy"], json!("admin"));
}

#[test]
fn unsupported_version_fails() {
    let temp = TempDir::new().unwrap();
    propdesk(temp.path()).arg("init").assert().success();
    let file = write_snapshot(temp.path(), "upload.json", "9.9", json!({ "users": [] }));

    propdesk(temp.path())
        .args(["backup", "restore", &file, "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported snapshot version '9.9'"));

    // Rejected before the safety snapshot
    assert!(backup_files(temp.path()).is_empty());
}

#[test]
fn rolled_back_restore_exits_with_failure() {
    let temp = TempDir::new().unwrap();
    propdesk(temp.path()).arg("init").assert().success();
    fs::write(
        temp.path().join("config.json"),
        r#"{ "backup": { "fatal_error_threshold": 1 } }"#,
    )
    .unwrap();
    let file = write_snapshot(
        temp.path(),
        "upload.json",
        "2.0",
        json!({ "properties": [ { "referenceCode": "A" }, { "referenceCode": "B" } ] }),
    );

    propdesk(temp.path())
        .args(["backup", "restore", &file, "--force"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Restore ROLLED BACK"));

    propdesk(temp.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 0 record(s)"));
}

#[test]
fn restoring_an_old_archived_snapshot_keeps_the_source_file() {
    let temp = TempDir::new().unwrap();
    propdesk(temp.path()).arg("init").assert().success();
    fs::write(
        temp.path().join("config.json"),
        r#"{ "backup": { "retention": { "daily_count": 1, "monthly_count": 1 } } }"#,
    )
    .unwrap();

    let backups = temp.path().join("backups");
    fs::create_dir_all(&backups).unwrap();
    let name = "snapshot-20260302-100000-000.json";
    write_snapshot(
        &backups,
        name,
        "2.0",
        json!({ "users": [ { "email": "ana@example.com", "name": "Ana" } ] }),
    );

    propdesk(temp.path())
        .args(["backup", "restore", name, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 record(s)"));

    assert!(backups.join(name).exists());
    let files = backup_files(temp.path());
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|f| f == name));
}

#[test]
fn missing_snapshot_is_not_found() {
    let temp = TempDir::new().unwrap();

    propdesk(temp.path())
        .args(["backup", "info", "latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
