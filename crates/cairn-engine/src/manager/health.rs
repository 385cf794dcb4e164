//! Health monitoring and repository reports

use super::{instrumented, RepositoryManager};
use crate::report::{HealthCheck, HealthReport, RepositoryStatus};
use crate::txn::TransactionGuard;
use cairn_core::adapter::Backend;
use cairn_core::errors::{RepoError, RepoErrorKind, Result};
use cairn_core::model::{now, Object, ObjectTag, Tag, TagValue, Version};

impl<B: Backend> RepositoryManager<B> {
    /// Audit the current version's content file
    ///
    /// Checks that the file exists and has the recorded length, and with
    /// `full` also recomputes the checksum. Content flagged corrupt by an
    /// earlier check is always re-fingerprinted; every other flag comes
    /// from this check alone. Inode and link count are
    /// refreshed and any flipped health flag is recorded in
    /// `lastobservedchanges`. The updated record is saved whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// NoSuchHandle or InconsistentDatabase for the lookup; an Io error
    /// when the file exists but cannot be read (after the record is saved).
    /// An unhealthy file is not an error here; see
    /// [`RepositoryManager::validate`].
    pub fn check(&self, handle: i64, full: bool) -> Result<HealthCheck> {
        instrumented("check", || self.check_impl(handle, full))
    }

    fn check_impl(&self, handle: i64, full: bool) -> Result<HealthCheck> {
        let guard = TransactionGuard::begin(&self.backend)?;
        let mut version = self.current_version("check", handle)?;
        let previous = version.health.clone();
        let observed = now();

        let mut health = previous.clone();
        health.lastvalidationattempt = Some(observed);
        health.message = None;
        health.missing = false;
        health.lengthmismatch = false;
        health.corrupt = false;
        let fingerprint = full || previous.corrupt;
        let mut failure = None;

        match self.content.stat(&version.path) {
            Ok(stat) => {
                health.lastseen = Some(observed);
                health.linkcount = stat.link_count;
                version.inode = stat.inode;
                health.lengthmismatch = stat.length != version.length;
                if health.lengthmismatch {
                    health.message = Some(format!(
                        "{} bytes on disk, {} recorded",
                        stat.length, version.length
                    ));
                } else if fingerprint {
                    match self.content.fingerprint(&version.path) {
                        Ok((sha1sum, _)) => {
                            health.lastfingerprinted = Some(observed);
                            health.corrupt = sha1sum != version.sha1sum;
                            if health.corrupt {
                                health.message = Some(format!(
                                    "checksum {} on disk, {} recorded",
                                    sha1sum, version.sha1sum
                                ));
                            }
                        }
                        Err(err) => {
                            health.message = Some(err.to_string());
                            failure = Some(err);
                        }
                    }
                }
            }
            Err(err) if err.is(RepoErrorKind::NoSuchFile) => {
                health.missing = true;
                health.message = Some(format!("content file '{}' not found", version.path));
            }
            Err(err) => {
                health.message = Some(err.to_string());
                failure = Some(err);
            }
        }

        health.unhealthy = health.missing || health.lengthmismatch || health.corrupt;
        if !health.unhealthy && failure.is_none() {
            health.lastsuccessfulvalidation = Some(observed);
        }

        let mut changes = Vec::new();
        let (before, after) = (previous.state(), health.state());
        if before != after {
            changes.push(format!("state:{}->{}", before, after));
        }
        changes.extend(health.changes_since(&previous));
        if !changes.is_empty() {
            health.healthchanged = Some(observed);
            health.lastobservedchanges = Some(changes.join(","));
            tracing::info!(handle, changes = %changes.join(","), "health changed");
        }

        version.health = health;
        self.live::<Version>()?.update(&version)?;
        guard.commit()?;

        if let Some(err) = failure {
            return Err(err.with_handle(handle));
        }
        Ok(HealthCheck {
            healthy: !version.health.unhealthy,
            state: version.state(),
            changes,
            version,
        })
    }

    /// Full check that fails unless the current version is healthy
    ///
    /// # Errors
    ///
    /// Validation when the content is missing, truncated or corrupt, plus
    /// the errors of [`RepositoryManager::check`].
    pub fn validate(&self, handle: i64) -> Result<Version> {
        instrumented("validate", || {
            let outcome = self.check_impl(handle, true)?;
            if !outcome.healthy {
                return Err(RepoError::new(RepoErrorKind::Validation)
                    .with_op("validate")
                    .with_handle(handle)
                    .with_message(format!(
                        "{}: {}",
                        outcome.state,
                        outcome.version.health.message.as_deref().unwrap_or("unhealthy")
                    )));
            }
            Ok(outcome.version)
        })
    }

    /// Row counts of every table
    ///
    /// # Errors
    ///
    /// Persistence.
    pub fn status(&self) -> Result<RepositoryStatus> {
        instrumented("status", || {
            Ok(RepositoryStatus {
                objects: self.live::<Object>()?.count(None)?,
                versions: self.live::<Version>()?.count(None)?,
                tags: self.live::<Tag>()?.count(None)?,
                tag_values: self.live::<TagValue>()?.count(None)?,
                object_tags: self.live::<ObjectTag>()?.count(None)?,
                trashed_objects: self.trash::<Object>()?.count(None)?,
                trashed_versions: self.trash::<Version>()?.count(None)?,
            })
        })
    }

    /// Health states of every object's current version
    ///
    /// # Errors
    ///
    /// Persistence.
    pub fn health_monitoring_report(&self) -> Result<HealthReport> {
        instrumented("health_monitoring_report", || {
            let current = self.current_imports()?;
            let mut report = HealthReport::default();
            self.live::<Version>()?.apply_selection(None, &[], None, &mut |version| {
                if current.get(&version.handle) == Some(&version.imported) {
                    report.record(&version);
                }
                Ok(true)
            })?;
            report.unhealthy.sort_unstable();
            Ok(report)
        })
    }
}
