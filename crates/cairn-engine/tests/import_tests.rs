//! Integration tests for import, duplicate detection and versioning.
//!
//! All tests use a real SQLite DB and content store under a TempDir.

use cairn_core::errors::RepoErrorKind;
use cairn_engine::{ImportOptions, RepositoryConfig, RepositoryManager};
use cairn_store::SqliteBackend;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn setup() -> (TempDir, RepositoryManager<SqliteBackend>) {
    let temp_dir = TempDir::new().unwrap();
    let config = RepositoryConfig::new(temp_dir.path().join("store"));
    fs::create_dir_all(&config.store_root).unwrap();
    let backend = SqliteBackend::open(&config.database_path()).unwrap();
    (temp_dir, RepositoryManager::new(backend, &config))
}

fn source(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn staging_is_empty(dir: &TempDir) -> bool {
    let staging = dir.path().join("store").join(".staging");
    !staging.exists() || fs::read_dir(staging).unwrap().next().is_none()
}

// ---------------------------------------------------------------------------
// Duplicate detection
// ---------------------------------------------------------------------------

#[test]
fn test_identical_content_is_rejected_when_checking() {
    let (tmp, repo) = setup();
    let file_a = source(&tmp, "a.bin", &[7u8; 100]);
    let file_b = source(&tmp, "b.bin", &[7u8; 100]);

    let first = repo.create_object(&file_a, &ImportOptions::default()).unwrap();
    assert_eq!(first.versioncount, 1);
    assert_eq!(first.length, 100);

    let err = repo
        .create_object(&file_b, &ImportOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::PotentialDuplicate);
    assert_eq!(err.duplicate_of(), Some(first.handle));
    assert!(staging_is_empty(&tmp));
    assert_eq!(repo.status().unwrap().objects, 1);

    let second = repo
        .create_object(&file_b, &ImportOptions::default().allow_duplicates())
        .unwrap();
    assert_ne!(second.handle, first.handle);
    assert_eq!(second.versioncount, 1);
    assert_eq!(second.sha1sum, first.sha1sum);
    assert_ne!(second.path, first.path);
}

#[test]
fn test_update_with_duplicate_content_is_rejected() {
    let (tmp, repo) = setup();
    let original = source(&tmp, "a.txt", b"alpha");
    let v1 = repo.create_object(&original, &ImportOptions::default()).unwrap();

    let err = repo
        .update_object(v1.handle, &original, &ImportOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::PotentialDuplicate);
    assert_eq!(repo.get_versions(v1.handle).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Content placement
// ---------------------------------------------------------------------------

#[test]
fn test_import_stores_content_in_bucket() {
    let (tmp, repo) = setup();
    let file = source(&tmp, "Holiday Photo.jpg", b"jpeg bytes");

    let version = repo.create_object(&file, &ImportOptions::default()).unwrap();

    let parts: Vec<&str> = version.path.split('/').collect();
    assert_eq!(parts.len(), 4);
    for bucket in &parts[..3] {
        assert_eq!(bucket.len(), 1);
        assert!(bucket.chars().all(|c| c.is_ascii_lowercase()));
    }
    let stored = repo.content_path(version.handle).unwrap();
    assert_eq!(fs::read(&stored).unwrap(), b"jpeg bytes");
    assert!(file.exists(), "source is copied, not moved");
    assert_eq!(version.copiedfrom.as_deref(), Some(file.to_str().unwrap()));
    assert_eq!(version.health.linkcount, 1);
    assert!(version.health.lastseen.is_some());
    assert!(staging_is_empty(&tmp));
}

#[test]
fn test_missing_source_is_no_such_file() {
    let (tmp, repo) = setup();
    let err = repo
        .create_object(&tmp.path().join("absent.bin"), &ImportOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::NoSuchFile);
    assert_eq!(repo.status().unwrap().objects, 0);
}

#[test]
fn test_blank_title_is_rejected() {
    let (tmp, repo) = setup();
    let file = source(&tmp, "a.txt", b"a");
    let err = repo
        .create_object(&file, &ImportOptions::default().with_title("   "))
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::Validation);
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

#[test]
fn test_n_updates_yield_n_versions_newest_first() {
    let (tmp, repo) = setup();
    let first = source(&tmp, "v1.txt", b"version 1");
    let v1 = repo
        .create_object(&first, &ImportOptions::default().with_title("Report"))
        .unwrap();

    for n in 2..=5 {
        let file = source(&tmp, &format!("v{}.txt", n), format!("version {}", n).as_bytes());
        let version = repo
            .update_object(v1.handle, &file, &ImportOptions::default())
            .unwrap();
        assert_eq!(version.versioncount, n);
    }

    let versions = repo.get_versions(v1.handle).unwrap();
    let counts: Vec<i32> = versions.iter().map(|v| v.versioncount).collect();
    assert_eq!(counts, vec![5, 4, 3, 2, 1]);
    for pair in versions.windows(2) {
        assert!(pair[0].imported > pair[1].imported);
    }

    let object = repo.get_object(v1.handle).unwrap();
    assert_eq!(object.imported, versions[0].imported);
    assert_eq!(repo.get_latest_version(v1.handle).unwrap(), versions[0]);
}

#[test]
fn test_title_is_inherited_unless_given() {
    let (tmp, repo) = setup();
    let v1 = repo
        .create_object(
            &source(&tmp, "a.txt", b"one"),
            &ImportOptions::default().with_title("Minutes"),
        )
        .unwrap();

    let v2 = repo
        .update_object(v1.handle, &source(&tmp, "b.txt", b"two"), &ImportOptions::default())
        .unwrap();
    assert_eq!(v2.title.as_deref(), Some("Minutes"));

    let v3 = repo
        .update_object(
            v1.handle,
            &source(&tmp, "c.txt", b"three"),
            &ImportOptions::default().with_title("Final minutes"),
        )
        .unwrap();
    assert_eq!(v3.title.as_deref(), Some("Final minutes"));
}

#[test]
fn test_update_unknown_handle() {
    let (tmp, repo) = setup();
    let err = repo
        .update_object(99, &source(&tmp, "a.txt", b"a"), &ImportOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::NoSuchHandle);
    assert_eq!(err.handle(), Some(99));
}

#[test]
fn test_update_refuses_inconsistent_object() {
    let (tmp, repo) = setup();
    let v1 = repo
        .create_object(&source(&tmp, "a.txt", b"a"), &ImportOptions::default())
        .unwrap();
    repo.backend()
        .connection()
        .execute(
            "UPDATE objects SET imported = imported - 5000 WHERE handle = ?1",
            [v1.handle],
        )
        .unwrap();

    let err = repo
        .update_object(v1.handle, &source(&tmp, "b.txt", b"b"), &ImportOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InconsistentDatabase);
    assert_eq!(repo.get_versions(v1.handle).unwrap().len(), 1);
    assert!(staging_is_empty(&tmp));
}

// ---------------------------------------------------------------------------
// add_version commit hook
// ---------------------------------------------------------------------------

#[test]
fn test_failing_commit_hook_rolls_back() {
    let (_tmp, repo) = setup();
    let version = cairn_core::model::Version {
        imported: cairn_core::model::now(),
        length: 3,
        sha1sum: "abc".to_string(),
        path: "x/y/z/nothing.bin".to_string(),
        ..Default::default()
    };

    let err = repo
        .add_version(version, |_| {
            Err(cairn_core::errors::RepoError::new(RepoErrorKind::FileRenameFailed))
        })
        .unwrap_err();

    assert_eq!(err.kind(), RepoErrorKind::FileRenameFailed);
    assert!(!repo.in_transaction());
    let status = repo.status().unwrap();
    assert_eq!(status.objects, 0);
    assert_eq!(status.versions, 0);
}

#[test]
fn test_commit_hook_sees_assigned_handle() {
    let (_tmp, repo) = setup();
    let version = cairn_core::model::Version {
        imported: cairn_core::model::now(),
        length: 1,
        sha1sum: "f".to_string(),
        path: "a/a/a/f.bin".to_string(),
        ..Default::default()
    };

    let mut seen = None;
    let stored = repo
        .add_version(version, |v| {
            seen = Some((v.handle, v.versioncount));
            Ok(())
        })
        .unwrap();

    assert!(stored.handle > 0);
    assert_eq!(seen, Some((stored.handle, 1)));
}
