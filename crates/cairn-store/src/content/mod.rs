//! Content store
//!
//! Provides:
//! - Staging: copy a source file next to the store while fingerprinting it
//! - Layout: pseudo-random three-level buckets (`a/q/z/<file>`)
//! - Commit: atomic no-clobber rename of a staged file into its bucket
//! - Trash: best-effort relocation of retired content

#![allow(clippy::result_large_err)]

mod layout;
mod staging;
mod trash;

pub use layout::bucket_path;
pub use staging::{fingerprint_file, stat_file, FileStat, StagedFile};

use crate::errors::{io_error, Result};
use cairn_core::errors::{RepoError, RepoErrorKind};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Filesystem side of the repository
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    staging_dir: PathBuf,
    trash_dir: PathBuf,
    path_retry_limit: u32,
}

impl ContentStore {
    pub fn new(
        root: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
        trash_dir: impl Into<PathBuf>,
        path_retry_limit: u32,
    ) -> Self {
        Self {
            root: root.into(),
            staging_dir: staging_dir.into(),
            trash_dir: trash_dir.into(),
            path_retry_limit,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    /// Absolute path of a stored file
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Copy `source` into the staging area and fingerprint the copy
    pub fn stage(&self, source: &Path) -> Result<StagedFile> {
        staging::stage(&self.staging_dir, source)
    }

    /// Pick a free bucket path for `file_name`, relative to the root
    pub fn allocate(&self, file_name: &str) -> Result<String> {
        let mut rng = rand::thread_rng();
        for attempt in 0..self.path_retry_limit {
            let relative = bucket_path(&mut rng, file_name);
            if !self.root.join(&relative).exists() {
                if attempt > 0 {
                    tracing::debug!(attempt, relative = %relative, "bucket collision resolved");
                }
                return Ok(relative);
            }
        }
        Err(RepoError::new(RepoErrorKind::FileError)
            .with_op("allocate_path")
            .with_message(format!(
                "no free storage path for '{}' after {} attempts",
                file_name, self.path_retry_limit
            )))
    }

    /// Move a staged file to `relative`; never overwrites
    pub fn commit(&self, staged: StagedFile, relative: &str) -> Result<()> {
        let target = self.absolute(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create_bucket_dir", e))?;
        }
        staged.persist(&target)
    }

    /// Fingerprint of a stored file
    pub fn fingerprint(&self, relative: &str) -> Result<(String, i64)> {
        fingerprint_file(&self.absolute(relative))
    }

    pub fn stat(&self, relative: &str) -> Result<FileStat> {
        stat_file(&self.absolute(relative))
    }

    /// Relocate a retired version's file under `trash/<handle>/`
    ///
    /// Returns the new location.
    pub fn move_to_trash(
        &self,
        relative: &str,
        handle: i64,
        imported: DateTime<Utc>,
    ) -> Result<PathBuf> {
        trash::relocate(&self.absolute(relative), &self.trash_dir, handle, imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ContentStore {
        let root = dir.path().join("store");
        ContentStore::new(&root, root.join(".staging"), root.join(".trash"), 8)
    }

    #[test]
    fn test_stage_allocate_commit() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let source = dir.path().join("report.txt");
        fs::write(&source, b"hello cairn").unwrap();

        let staged = store.stage(&source).unwrap();
        assert_eq!(staged.length(), 11);
        let relative = store.allocate("report.txt").unwrap();
        store.commit(staged, &relative).unwrap();

        assert_eq!(fs::read(store.absolute(&relative)).unwrap(), b"hello cairn");
        let (sum, len) = store.fingerprint(&relative).unwrap();
        assert_eq!(len, 11);
        assert_eq!(sum.len(), 40);
    }

    #[test]
    fn test_commit_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let source = dir.path().join("a.bin");
        fs::write(&source, b"one").unwrap();

        let relative = store.allocate("a.bin").unwrap();
        store.commit(store.stage(&source).unwrap(), &relative).unwrap();
        let err = store
            .commit(store.stage(&source).unwrap(), &relative)
            .unwrap_err();
        assert_eq!(err.kind(), RepoErrorKind::FileRenameFailed);
    }

    #[test]
    fn test_allocate_exhaustion() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("store");
        let store = ContentStore::new(&root, root.join(".staging"), root.join(".trash"), 0);
        let err = store.allocate("x").unwrap_err();
        assert_eq!(err.kind(), RepoErrorKind::FileError);
    }
}
