//! Cairn Engine - repository orchestration
//!
//! Provides:
//! - `RepositoryManager`: import with duplicate detection, versioning,
//!   rollback, retirement, health checks, tagging and queries
//! - `RepositoryPool`: a bounded pool of connection-bound managers
//! - `TransactionGuard`: nestable transaction scope
//! - `RepositoryConfig`: TOML-backed settings
//!
//! Every public manager operation logs its start and its end (or failure)
//! through the core logging facility.

pub mod config;
pub mod manager;
pub mod membership;
pub mod pool;
pub mod report;
pub mod txn;

pub use config::{PoolConfig, RepositoryConfig};
pub use manager::{ImportOptions, RepositoryManager};
pub use pool::{PoolStatus, PooledManager, RepositoryPool};
pub use txn::TransactionGuard;
