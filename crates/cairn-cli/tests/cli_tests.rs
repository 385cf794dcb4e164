//! CLI integration tests
//!
//! Drive the `cairn` binary against a scratch store and read back its JSON.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("store");
    (tmp, store)
}

fn cairn(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg("--store")
        .arg(store)
        .args(args)
        .output()
        .expect("failed to run cairn")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn write_source(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Import and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_import_then_update_then_rollback() {
    let (tmp, store) = setup();
    let first = write_source(tmp.path(), "notes.txt", "first draft");
    let second = write_source(tmp.path(), "notes2.txt", "second draft, longer");

    let imported = json(&cairn(
        &store,
        &["import", first.to_str().unwrap(), "--title", "Notes"],
    ));
    let handle = imported["handle"].as_i64().unwrap();
    assert_eq!(imported["versioncount"], 1);
    assert_eq!(imported["title"], "Notes");

    let updated = json(&cairn(
        &store,
        &["update", &handle.to_string(), second.to_str().unwrap()],
    ));
    assert_eq!(updated["versioncount"], 2);
    assert_eq!(updated["title"], "Notes");

    let versions = json(&cairn(&store, &["versions", &handle.to_string()]));
    assert_eq!(versions.as_array().unwrap().len(), 2);

    json(&cairn(&store, &["rollback", &handle.to_string()]));
    let versions = json(&cairn(&store, &["versions", &handle.to_string()]));
    assert_eq!(versions.as_array().unwrap().len(), 1);
}

#[test]
fn test_duplicate_import_fails_with_code() {
    let (tmp, store) = setup();
    let a = write_source(tmp.path(), "a.txt", "same bytes");
    let b = write_source(tmp.path(), "b.txt", "same bytes");

    json(&cairn(&store, &["import", a.to_str().unwrap()]));
    let output = cairn(&store, &["import", b.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: [ERR_POTENTIAL_DUPLICATE]"));

    json(&cairn(
        &store,
        &["import", b.to_str().unwrap(), "--allow-duplicates"],
    ));
    let status = json(&cairn(&store, &["status"]));
    assert_eq!(status["objects"], 2);
}

#[test]
fn test_retire_moves_rows_to_trash() {
    let (tmp, store) = setup();
    let src = write_source(tmp.path(), "gone.txt", "soon retired");
    let handle = json(&cairn(&store, &["import", src.to_str().unwrap()]))["handle"]
        .as_i64()
        .unwrap();

    let report = json(&cairn(&store, &["retire", &handle.to_string()]));
    assert_eq!(report["handle"], handle);
    assert_eq!(report["versions"], 1);

    let status = json(&cairn(&store, &["status"]));
    assert_eq!(status["objects"], 0);
    assert_eq!(status["trashed_objects"], 1);
    assert_eq!(status["trashed_versions"], 1);
}

#[test]
fn test_unknown_handle_exits_nonzero() {
    let (_tmp, store) = setup();
    let output = cairn(&store, &["check", "999"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_NO_SUCH_HANDLE"));
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[test]
fn test_check_reports_missing_content() {
    let (tmp, store) = setup();
    let src = write_source(tmp.path(), "doc.txt", "content to lose");
    let version = json(&cairn(&store, &["import", src.to_str().unwrap()]));
    let handle = version["handle"].as_i64().unwrap().to_string();

    let healthy = json(&cairn(&store, &["check", &handle, "--full"]));
    assert_eq!(healthy["healthy"], true);

    fs::remove_file(store.join(version["path"].as_str().unwrap())).unwrap();
    let missing = json(&cairn(&store, &["check", &handle]));
    assert_eq!(missing["healthy"], false);
    assert!(missing["changes"][0].as_str().unwrap().starts_with("state:"));

    let output = cairn(&store, &["check", &handle, "--validate"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_VALIDATION"));

    let report = json(&cairn(&store, &["report"]));
    assert_eq!(report["missing"], 1);
    assert_eq!(report["unhealthy"][0].as_i64().unwrap().to_string(), handle);
}

// ---------------------------------------------------------------------------
// Tags and queries
// ---------------------------------------------------------------------------

#[test]
fn test_tag_assignment_and_query() {
    let (tmp, store) = setup();
    let a = write_source(tmp.path(), "a.txt", "alpha");
    let b = write_source(tmp.path(), "b.txt", "beta beta");
    let ha = json(&cairn(&store, &["import", a.to_str().unwrap(), "--title", "Alpha"]))["handle"]
        .as_i64()
        .unwrap()
        .to_string();
    json(&cairn(&store, &["import", b.to_str().unwrap(), "--title", "Beta"]));

    let created = json(&cairn(
        &store,
        &["tag", "create", "Colour", "--type", "category"],
    ));
    assert_eq!(created["created"], true);
    json(&cairn(&store, &["tag", "create-value", "Colour", "red"]));
    let assigned = json(&cairn(&store, &["tag", "assign", &ha, "Colour", "red"]));
    assert_eq!(assigned["assigned"], true);

    let tags = json(&cairn(&store, &["tag", "list", "--handle", &ha]));
    assert_eq!(tags.as_array().unwrap().len(), 1);

    let rows = json(&cairn(
        &store,
        &["query", "@length > 5", "--order-by", "@title desc"],
    ));
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Beta");

    let all = json(&cairn(&store, &["query"]));
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[test]
fn test_bad_filter_reports_parser_error() {
    let (_tmp, store) = setup();
    let output = cairn(&store, &["query", "@length >"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_"));
}

#[test]
fn test_scrub_report_only_changes_nothing() {
    let (_tmp, store) = setup();
    json(&cairn(
        &store,
        &["tag", "create", "Part", "--type", "sequence"],
    ));
    json(&cairn(&store, &["tag", "create-value", "Part", "01.002"]));

    let report = json(&cairn(&store, &["scrub-tags", "--report-only"]));
    assert_eq!(report["report_only"], true);

    let values = json(&cairn(&store, &["tag", "list", "Part"]));
    assert_eq!(values[0]["value"], "01.002");
}

#[test]
fn test_schema_lists_version_attributes() {
    let (_tmp, store) = setup();
    let schema = json(&cairn(&store, &["schema"]));
    let names: Vec<&str> = schema["attributes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"handle"));
    assert!(names.contains(&"sha1sum"));
}
