//! Import pipeline and versioning
//!
//! Content is copied and fingerprinted before any row is visible. The only
//! filesystem change made inside a transaction is the final rename, run as
//! the commit hook of [`RepositoryManager::add_version`]; if it fails the
//! rows are rolled back.

use super::RepositoryManager;
use crate::txn::TransactionGuard;
use cairn_core::adapter::Backend;
use cairn_core::errors::{inconsistent, RepoError, RepoErrorKind, Result};
use cairn_core::filter::ExpressionFactory;
use cairn_core::model::{now, HealthRecord, Object, Version};
use cairn_core::{log_op_end, log_op_error, log_op_start};
use chrono::TimeDelta;
use std::path::Path;
use std::time::Instant;

/// Caller choices for one import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Inherited from the previous version when unset
    pub title: Option<String>,
    /// Reject content whose fingerprint is already stored
    pub check_duplicates: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            title: None,
            check_duplicates: true,
        }
    }
}

impl ImportOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn allow_duplicates(mut self) -> Self {
        self.check_duplicates = false;
        self
    }
}

impl<B: Backend> RepositoryManager<B> {
    /// Import `source` as a new object
    ///
    /// # Errors
    ///
    /// - NoSuchFile / Io when the source cannot be read
    /// - PotentialDuplicate naming the existing handle when duplicate
    ///   checking is on and the fingerprint is already stored
    /// - FileRenameFailed when the staged copy cannot be moved into place
    pub fn create_object(&self, source: &Path, options: &ImportOptions) -> Result<Version> {
        log_op_start!("create_object", source = %source.display());
        let start = Instant::now();

        let version = self
            .import_object_content("create_object", 0, source, options)
            .map_err(|e| {
                log_op_error!(
                    "create_object",
                    &e,
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "create_object",
            duration_ms = start.elapsed().as_millis() as u64,
            handle = version.handle,
            length = version.length
        );
        Ok(version)
    }

    /// Import `source` as the next version of `handle`
    ///
    /// # Errors
    ///
    /// As [`RepositoryManager::create_object`], plus NoSuchHandle for an
    /// unknown handle and InconsistentDatabase when the object does not
    /// point at its newest version.
    pub fn update_object(
        &self,
        handle: i64,
        source: &Path,
        options: &ImportOptions,
    ) -> Result<Version> {
        log_op_start!("update_object", handle = handle, source = %source.display());
        let start = Instant::now();

        let version = self
            .import_object_content("update_object", handle, source, options)
            .map_err(|e| {
                log_op_error!(
                    "update_object",
                    &e,
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "update_object",
            duration_ms = start.elapsed().as_millis() as u64,
            handle = version.handle,
            versioncount = version.versioncount
        );
        Ok(version)
    }

    fn import_object_content(
        &self,
        op: &str,
        handle: i64,
        source: &Path,
        options: &ImportOptions,
    ) -> Result<Version> {
        if source.as_os_str().is_empty() {
            return Err(Self::blank_argument(op, "source path"));
        }
        if options.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Self::blank_argument(op, "title"));
        }
        if handle != 0 {
            self.require_object(op, handle)?;
        }

        let staged = self.content.stage(source)?;

        if options.check_duplicates {
            if let Some(existing) = self.find_duplicate(staged.sha1sum(), staged.length())? {
                return Err(RepoError::new(RepoErrorKind::PotentialDuplicate)
                    .with_op(op)
                    .with_message(format!(
                        "'{}' has the same content as version {} of handle {}",
                        source.display(),
                        existing.versioncount,
                        existing.handle
                    ))
                    .with_duplicate_of(existing.handle));
            }
        }

        let relative = self.content.allocate(&staged.file_name())?;
        let stat = staged.stat();
        let observed = now();
        let version = Version {
            handle,
            imported: observed,
            length: staged.length(),
            sha1sum: staged.sha1sum().to_string(),
            title: options.title.clone(),
            path: relative,
            copiedfrom: Some(source.display().to_string()),
            inode: stat.inode,
            versioncount: 0,
            health: HealthRecord {
                linkcount: stat.link_count,
                lastseen: Some(observed),
                lastfingerprinted: Some(observed),
                ..Default::default()
            },
        };

        let content = &self.content;
        self.add_version(version, move |v: &Version| content.commit(staged, &v.path))
    }

    /// Any live version with this fingerprint
    fn find_duplicate(&self, sha1sum: &str, length: i64) -> Result<Option<Version>> {
        let factory = ExpressionFactory::<Version>::new()?;
        let filter = factory.and(vec![
            factory.attr_eq("sha1sum", factory.string(sha1sum))?,
            factory.attr_eq("length", factory.long(length))?,
        ])?;
        self.live::<Version>()?.first(Some(&filter), &[])
    }

    /// Record `version` and run `commit_hook` before committing
    ///
    /// With `handle == 0` a new object is created and the version becomes
    /// its first. Otherwise the object must exist and point at its newest
    /// version; the new version gets the next `versioncount`, inherits the
    /// title when it has none and is stamped strictly after its
    /// predecessor.
    ///
    /// `commit_hook` sees the final record. It is the one place a
    /// filesystem change may happen inside the transaction; an error from
    /// it rolls everything back.
    ///
    /// # Errors
    ///
    /// NoSuchHandle, InconsistentDatabase, Persistence, or whatever the
    /// hook returns.
    pub fn add_version<F>(&self, mut version: Version, commit_hook: F) -> Result<Version>
    where
        F: FnOnce(&Version) -> Result<()>,
    {
        let guard = TransactionGuard::begin(&self.backend)?;
        let objects = self.live::<Object>()?;
        let versions = self.live::<Version>()?;

        if version.handle == 0 {
            let mut object = Object::new(version.imported);
            objects.insert(&mut object)?;
            version.handle = object.handle;
            version.versioncount = 1;
        } else {
            let handle = version.handle;
            let (_, existing) = self.consistent_versions("add_version", handle)?;
            let latest = existing
                .into_iter()
                .next()
                .ok_or_else(|| inconsistent("add_version", handle, "object has no versions"))?;

            version.versioncount = latest.versioncount + 1;
            if version.title.is_none() {
                version.title = latest.title.clone();
            }
            if version.imported <= latest.imported {
                version.imported = latest.imported + TimeDelta::milliseconds(1);
            }
            objects.update(&Object {
                handle,
                imported: version.imported,
            })?;
        }

        versions.insert(&mut version)?;
        commit_hook(&version)?;
        drop(objects);
        drop(versions);
        guard.commit()?;

        tracing::debug!(
            handle = version.handle,
            versioncount = version.versioncount,
            path = %version.path,
            "version recorded"
        );
        Ok(version)
    }
}
