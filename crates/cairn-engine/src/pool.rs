//! Bounded pool of repository managers
//!
//! Each pooled manager owns one backend connection. `acquire` hands out a
//! lease; dropping the lease returns the manager. Scanning, eviction,
//! construction and hand-out all happen under one lock, so an idle manager
//! is never given to two callers.

use crate::config::RepositoryConfig;
use crate::manager::RepositoryManager;
use cairn_core::adapter::{Connector, PersistenceConnection};
use cairn_core::errors::{RepoError, RepoErrorKind, Result};
use cairn_core::model::{Object, ObjectTag, Tag, TagValue, Version};
use cairn_core::tuple::Tuple;
use serde::Serialize;
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Instant;

struct Slot<M> {
    manager: M,
    created: Instant,
}

struct PoolState<M> {
    idle: VecDeque<Slot<M>>,
    in_use: usize,
    created: u64,
    evicted: u64,
    shut_down: bool,
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub idle: usize,
    pub in_use: usize,
    pub max_instances: usize,
    /// Managers constructed since the pool was created
    pub created: u64,
    /// Managers closed for age or a failed liveness check
    pub evicted: u64,
    pub shut_down: bool,
}

type Managed<C> = RepositoryManager<<C as Connector>::Backend>;

pub struct RepositoryPool<C: Connector> {
    connector: C,
    config: RepositoryConfig,
    state: Mutex<PoolState<Managed<C>>>,
    released: Condvar,
}

impl<C: Connector> RepositoryPool<C> {
    /// Validate the configuration and prepare the store directories
    ///
    /// No connection is opened until the first `acquire`.
    ///
    /// # Errors
    ///
    /// Configuration for an invalid config or a malformed entity
    /// descriptor, Io when a store directory cannot be created.
    pub fn new(connector: C, config: RepositoryConfig) -> Result<Self> {
        config.validate()?;
        Object::schema()?;
        Version::schema()?;
        Tag::schema()?;
        TagValue::schema()?;
        ObjectTag::schema()?;

        for dir in [
            config.store_root.clone(),
            config.staging_dir(),
            config.trash_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                RepoError::new(RepoErrorKind::Io)
                    .with_op("create_pool")
                    .with_message(format!("cannot create '{}'", dir.display()))
                    .with_source(e)
            })?;
        }

        tracing::info!(
            max_instances = config.pool.max_instances,
            max_lifetime_secs = config.pool.max_lifetime_secs,
            "repository pool ready"
        );
        Ok(Self {
            connector,
            config,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                in_use: 0,
                created: 0,
                evicted: 0,
                shut_down: false,
            }),
            released: Condvar::new(),
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<Managed<C>>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(slot: Slot<Managed<C>>) {
        if let Err(err) = slot.manager.into_backend().close() {
            tracing::warn!(error = %err, "closing pooled connection failed");
        }
    }

    /// Borrow a manager, waiting up to the acquire timeout when all
    /// instances are in use
    ///
    /// # Errors
    ///
    /// Timeout when no instance frees up in time, Unexpected after
    /// shutdown, or the connector's error when a new instance cannot be
    /// opened.
    pub fn acquire(&self) -> Result<PooledManager<'_, C>> {
        let deadline = Instant::now() + self.config.pool.acquire_timeout();
        let max_lifetime = self.config.pool.max_lifetime();
        let max_instances = self.config.pool.max_instances;
        let mut state = self.lock();

        loop {
            if state.shut_down {
                return Err(RepoError::new(RepoErrorKind::Unexpected)
                    .with_op("acquire")
                    .with_message("pool has been shut down"));
            }

            let idle = std::mem::take(&mut state.idle);
            for slot in idle {
                if slot.created.elapsed() >= max_lifetime || !slot.manager.is_valid() {
                    state.evicted += 1;
                    tracing::debug!("evicting pooled manager");
                    Self::close(slot);
                } else {
                    state.idle.push_back(slot);
                }
            }

            if let Some(slot) = state.idle.pop_front() {
                state.in_use += 1;
                return Ok(PooledManager {
                    pool: self,
                    slot: Some(slot),
                });
            }

            if state.in_use < max_instances {
                let manager = RepositoryManager::new(self.connector.connect()?, &self.config);
                state.created += 1;
                state.in_use += 1;
                tracing::debug!(in_use = state.in_use, "opened pooled manager");
                return Ok(PooledManager {
                    pool: self,
                    slot: Some(Slot {
                        manager,
                        created: Instant::now(),
                    }),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(RepoError::new(RepoErrorKind::Timeout)
                    .with_op("acquire")
                    .with_message(format!(
                        "all {} managers busy for {} ms",
                        max_instances, self.config.pool.acquire_timeout_ms
                    )));
            }
            let (guard, _) = self
                .released
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
    }

    fn release(&self, slot: Slot<Managed<C>>) {
        if slot.manager.in_transaction() {
            tracing::error!("manager returned to the pool with an open transaction; rolling back");
            if let Err(err) = slot.manager.rollback() {
                tracing::warn!(error = %err, "rollback on release failed");
            }
        }

        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        if state.shut_down {
            Self::close(slot);
        } else if slot.created.elapsed() >= self.config.pool.max_lifetime()
            || !slot.manager.is_valid()
        {
            state.evicted += 1;
            Self::close(slot);
        } else {
            state.idle.push_back(slot);
        }
        drop(state);
        self.released.notify_one();
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.lock();
        PoolStatus {
            idle: state.idle.len(),
            in_use: state.in_use,
            max_instances: self.config.pool.max_instances,
            created: state.created,
            evicted: state.evicted,
            shut_down: state.shut_down,
        }
    }

    /// Close idle managers and refuse further acquisitions
    ///
    /// Leased managers are closed as they come back. Returns how many were
    /// closed now.
    pub fn shutdown(&self) -> usize {
        let mut state = self.lock();
        state.shut_down = true;
        let idle = std::mem::take(&mut state.idle);
        drop(state);

        let closed = idle.len();
        for slot in idle {
            Self::close(slot);
        }
        self.released.notify_all();
        tracing::info!(closed, "repository pool shut down");
        closed
    }
}

/// A manager on loan from a [`RepositoryPool`]
pub struct PooledManager<'p, C: Connector> {
    pool: &'p RepositoryPool<C>,
    slot: Option<Slot<Managed<C>>>,
}

impl<C: Connector> Deref for PooledManager<'_, C> {
    type Target = RepositoryManager<C::Backend>;

    fn deref(&self) -> &Self::Target {
        &self
            .slot
            .as_ref()
            .expect("pooled manager is present until the lease drops")
            .manager
    }
}

impl<C: Connector> Drop for PooledManager<'_, C> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.release(slot);
        }
    }
}
