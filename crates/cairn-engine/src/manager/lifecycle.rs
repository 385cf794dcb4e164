//! Rollback and retirement
//!
//! Rows are never hard-deleted: they move to the trash tables in the same
//! transaction that removes them from the live ones. Content files follow
//! after the commit, best effort.

use super::{instrumented, RepositoryManager};
use crate::report::RetireReport;
use crate::txn::TransactionGuard;
use cairn_core::adapter::Backend;
use cairn_core::errors::{inconsistent, RepoError, RepoErrorKind, Result};
use cairn_core::model::{Object, ObjectTag, Version};
use chrono::{DateTime, Utc};

impl<B: Backend> RepositoryManager<B> {
    /// Discard the current version and promote the next newest
    ///
    /// Returns the `imported` the object points at afterwards. An object
    /// with a single version is left alone and its only timestamp returned.
    ///
    /// # Errors
    ///
    /// NoSuchHandle, InconsistentDatabase or Persistence.
    pub fn rollback_object_to_previous_version(&self, handle: i64) -> Result<DateTime<Utc>> {
        instrumented("rollback_object_to_previous_version", || {
            self.retire_current("rollback_object_to_previous_version", handle, false)
        })
    }

    /// Move one version of `handle` to trash
    ///
    /// Retiring the current version is a rollback. Returns the `imported`
    /// the object points at afterwards.
    ///
    /// # Errors
    ///
    /// NoSuchVersion for an unknown timestamp, ConstraintViolation for the
    /// only version of an object, plus the errors of a rollback.
    pub fn retire_object_version(&self, handle: i64, imported: DateTime<Utc>) -> Result<DateTime<Utc>> {
        instrumented("retire_object_version", || {
            let op = "retire_object_version";
            let guard = TransactionGuard::begin(&self.backend)?;
            let (object, versions) = self.consistent_versions(op, handle)?;

            let position = versions
                .iter()
                .position(|v| v.imported == imported)
                .ok_or_else(|| {
                    RepoError::new(RepoErrorKind::NoSuchVersion)
                        .with_op(op)
                        .with_handle(handle)
                        .with_message(format!("no version imported at {}", imported))
                })?;
            if position == 0 {
                drop(guard);
                return self.retire_current(op, handle, true);
            }

            let retired = &versions[position];
            self.trash_version(retired)?;
            guard.commit()?;
            self.relocate_content(retired);
            Ok(object.imported)
        })
    }

    /// Shared body of rollback and retiring the current version
    fn retire_current(&self, op: &str, handle: i64, refuse_last: bool) -> Result<DateTime<Utc>> {
        let guard = TransactionGuard::begin(&self.backend)?;
        let (_, versions) = self.consistent_versions(op, handle)?;

        let (current, previous) = match versions.as_slice() {
            [current, previous, ..] => (current, previous),
            [_] if refuse_last => {
                return Err(RepoError::new(RepoErrorKind::ConstraintViolation)
                    .with_op(op)
                    .with_handle(handle)
                    .with_message("cannot retire the only version; retire the object instead"))
            }
            [only] => {
                tracing::debug!(handle, "single version, nothing to roll back");
                guard.commit()?;
                return Ok(only.imported);
            }
            [] => return Err(inconsistent(op, handle, "object has no versions")),
        };

        self.trash_version(current)?;
        self.live::<Object>()?.update(&Object {
            handle,
            imported: previous.imported,
        })?;
        guard.commit()?;

        self.relocate_content(current);
        Ok(previous.imported)
    }

    fn trash_version(&self, version: &Version) -> Result<()> {
        self.trash::<Version>()?.insert_if_new(&mut version.clone())?;
        self.live::<Version>()?.delete(version)
    }

    /// Move an object, its versions and its tag assignments to trash
    ///
    /// Unless `force`, the object must be consistent and every version's
    /// content file must exist; nothing is changed otherwise. Content files
    /// are moved to the trash directory after the commit; failures there
    /// are logged and counted, not returned.
    ///
    /// # Errors
    ///
    /// NoSuchHandle, InconsistentDatabase or NoSuchFile (not with `force`),
    /// Persistence.
    pub fn retire_object(&self, handle: i64, force: bool) -> Result<RetireReport> {
        instrumented("retire_object", || {
            let op = "retire_object";
            let guard = TransactionGuard::begin(&self.backend)?;
            let object = self.require_object(op, handle)?;
            let versions = self.versions_of(handle)?;

            if !force {
                Self::check_consistency(op, &object, &versions)?;
                if let Some(absent) = versions
                    .iter()
                    .find(|v| !self.content.absolute(&v.path).is_file())
                {
                    return Err(RepoError::new(RepoErrorKind::NoSuchFile)
                        .with_op(op)
                        .with_handle(handle)
                        .with_message(format!(
                            "content of version {} is missing at '{}'",
                            absent.versioncount, absent.path
                        )));
                }
            }

            let filter = Self::handle_filter::<ObjectTag>(handle)?;
            let live_tags = self.live::<ObjectTag>()?;
            let trash_tags = self.trash::<ObjectTag>()?;
            let tags = live_tags.select(Some(&filter), &[])?;
            for tag in &tags {
                trash_tags.insert_if_new(&mut tag.clone())?;
                live_tags.delete(tag)?;
            }
            for version in &versions {
                self.trash_version(version)?;
            }
            self.trash::<Object>()?.insert_if_new(&mut object.clone())?;
            self.live::<Object>()?.delete(&object)?;

            drop(live_tags);
            drop(trash_tags);
            guard.commit()?;
            self.invalidate_membership_cache();

            let mut report = RetireReport {
                handle,
                versions: versions.len(),
                tags: tags.len(),
                ..Default::default()
            };
            for version in &versions {
                match self.relocate_content(version) {
                    Some(target) => report.trashed_files.push(target),
                    None => report.trash_failures += 1,
                }
            }
            Ok(report)
        })
    }
}
