//! Repository manager
//!
//! One manager owns one backend connection and serves one logical operation
//! at a time. Concurrency comes from the pool handing out distinct
//! instances, not from locking inside a manager.
//!
//! Operations are split by concern:
//! - `import`: create/update objects and the `add_version` two-phase commit
//! - `lifecycle`: rollback and retirement
//! - `health`: content checks and reports
//! - `tagging`: the tag vocabulary, assignments, scrub and membership
//! - `query`: textual queries and the queryable schema

#![allow(clippy::result_large_err)]

mod health;
mod import;
mod lifecycle;
mod query;
mod tagging;

pub use import::ImportOptions;

use crate::config::RepositoryConfig;
use crate::membership::MembershipCache;
use cairn_core::adapter::{Backend, Connector, SortKey, TableAdapter, TableRole};
use cairn_core::errors::{inconsistent, no_such_handle, RepoError, RepoErrorKind, Result};
use cairn_core::filter::{Expr, ExpressionFactory};
use cairn_core::model::{Object, Version};
use cairn_core::tuple::Tuple;
use cairn_core::{log_op_end, log_op_error, log_op_start};
use cairn_store::ContentStore;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Run `body` between the start and end (or error) events of `op`
///
/// Errors that reach the boundary without an operation name get `op`.
pub(crate) fn instrumented<R>(op: &'static str, body: impl FnOnce() -> Result<R>) -> Result<R> {
    log_op_start!(op);
    let start = Instant::now();
    let result = body().map_err(|e| {
        let e = if e.op().is_none() { e.with_op(op) } else { e };
        log_op_error!(op, &e, duration_ms = start.elapsed().as_millis() as u64);
        e
    })?;
    log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64);
    Ok(result)
}

pub struct RepositoryManager<B: Backend> {
    backend: B,
    content: ContentStore,
    membership_ttl: Duration,
    membership: RefCell<Option<MembershipCache>>,
}

impl<B: Backend> RepositoryManager<B> {
    pub fn new(backend: B, config: &RepositoryConfig) -> Self {
        Self {
            backend,
            content: config.content_store(),
            membership_ttl: config.membership_ttl(),
            membership: RefCell::new(None),
        }
    }

    /// Connect through `connector` and wrap the new backend
    ///
    /// # Errors
    ///
    /// Returns a Configuration error for an invalid config, or whatever the
    /// connector fails with.
    pub fn open<C>(connector: &C, config: &RepositoryConfig) -> Result<Self>
    where
        C: Connector<Backend = B>,
    {
        config.validate()?;
        Ok(Self::new(connector.connect()?, config))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.content
    }

    pub fn is_valid(&self) -> bool {
        self.backend.is_valid()
    }

    /// Give up the manager and keep its connection
    pub fn into_backend(self) -> B {
        self.backend
    }

    // ========== Transaction passthrough ==========

    /// # Errors
    ///
    /// Returns a Persistence error if a transaction is already open.
    pub fn start_transaction(&self) -> Result<()> {
        self.backend.start_transaction()
    }

    /// # Errors
    ///
    /// Returns a Persistence error if no transaction is open.
    pub fn commit(&self) -> Result<()> {
        self.backend.commit()
    }

    /// # Errors
    ///
    /// Returns a Persistence error if no transaction is open.
    pub fn rollback(&self) -> Result<()> {
        self.backend.rollback()?;
        self.invalidate_membership_cache();
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.backend.in_transaction()
    }

    // ========== Reads ==========

    /// # Errors
    ///
    /// Returns NoSuchHandle for an unknown handle.
    pub fn get_object(&self, handle: i64) -> Result<Object> {
        self.require_object("get_object", handle)
    }

    /// Current version of `handle`
    ///
    /// # Errors
    ///
    /// Returns NoSuchHandle for an unknown handle and InconsistentDatabase
    /// when the object does not point at its newest version.
    pub fn get_latest_version(&self, handle: i64) -> Result<Version> {
        self.current_version("get_latest_version", handle)
    }

    /// All live versions of `handle`, newest first
    ///
    /// # Errors
    ///
    /// Returns NoSuchHandle for an unknown handle.
    pub fn get_versions(&self, handle: i64) -> Result<Vec<Version>> {
        self.require_object("get_versions", handle)?;
        self.versions_of(handle)
    }

    /// Absolute path of the current version's content
    ///
    /// # Errors
    ///
    /// Same as [`RepositoryManager::get_latest_version`].
    pub fn content_path(&self, handle: i64) -> Result<PathBuf> {
        let version = self.current_version("content_path", handle)?;
        Ok(self.content.absolute(&version.path))
    }

    // ========== Internal helpers ==========

    pub(crate) fn live<T: Tuple>(&self) -> Result<Box<dyn TableAdapter<T> + '_>> {
        self.backend.table::<T>(TableRole::Live)
    }

    pub(crate) fn trash<T: Tuple>(&self) -> Result<Box<dyn TableAdapter<T> + '_>> {
        self.backend.table::<T>(TableRole::Trash)
    }

    /// `handle = <handle>` over any entity carrying a handle
    pub(crate) fn handle_filter<T: Tuple>(handle: i64) -> Result<Expr<T>> {
        let factory = ExpressionFactory::<T>::new()?;
        factory.attr_eq("handle", factory.long(handle))
    }

    pub(crate) fn find_object(&self, handle: i64) -> Result<Option<Object>> {
        let filter = Self::handle_filter::<Object>(handle)?;
        self.live::<Object>()?.first(Some(&filter), &[])
    }

    pub(crate) fn require_object(&self, op: &str, handle: i64) -> Result<Object> {
        self.find_object(handle)?
            .ok_or_else(|| no_such_handle(op, handle))
    }

    /// Live versions of `handle`, newest first
    pub(crate) fn versions_of(&self, handle: i64) -> Result<Vec<Version>> {
        let filter = Self::handle_filter::<Version>(handle)?;
        self.live::<Version>()?
            .select(Some(&filter), &[SortKey::desc("imported")])
    }

    /// Master/detail check: the object must point at its newest version
    pub(crate) fn check_consistency(op: &str, object: &Object, versions: &[Version]) -> Result<()> {
        match versions.first() {
            None => Err(inconsistent(op, object.handle, "object has no versions")),
            Some(latest) if latest.imported != object.imported => Err(inconsistent(
                op,
                object.handle,
                format!(
                    "object points at {} but the newest version was imported at {}",
                    object.imported, latest.imported
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Object plus its versions, newest first, after the consistency check
    pub(crate) fn consistent_versions(&self, op: &str, handle: i64) -> Result<(Object, Vec<Version>)> {
        let object = self.require_object(op, handle)?;
        let versions = self.versions_of(handle)?;
        Self::check_consistency(op, &object, &versions)?;
        Ok((object, versions))
    }

    pub(crate) fn current_version(&self, op: &str, handle: i64) -> Result<Version> {
        let (_, versions) = self.consistent_versions(op, handle)?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| inconsistent(op, handle, "object has no versions"))
    }

    /// `imported` of every object's current version, by handle
    pub(crate) fn current_imports(&self) -> Result<HashMap<i64, DateTime<Utc>>> {
        Ok(self
            .live::<Object>()?
            .select_all()?
            .into_iter()
            .map(|object| (object.handle, object.imported))
            .collect())
    }

    /// Best-effort move of a version's content file into the trash directory
    pub(crate) fn relocate_content(&self, version: &Version) -> Option<PathBuf> {
        match self
            .content
            .move_to_trash(&version.path, version.handle, version.imported)
        {
            Ok(target) => Some(target),
            Err(err) => {
                tracing::warn!(
                    handle = version.handle,
                    path = %version.path,
                    error = %err,
                    "could not move retired content to trash"
                );
                None
            }
        }
    }

    pub(crate) fn blank_argument(op: &str, what: &str) -> RepoError {
        RepoError::new(RepoErrorKind::Validation)
            .with_op(op)
            .with_message(format!("{} must not be blank", what))
    }
}
