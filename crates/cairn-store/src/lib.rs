//! Cairn Store - SQLite backend and content store
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - A generic `SqliteTable<T>` implementing the core `TableAdapter` contract
//! - The filter compiler lowering expression trees to SQLite `WHERE` text
//! - The content store: staging, fingerprinting, bucket layout, trash

pub mod content;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod sqlite;

pub use content::{ContentStore, FileStat, StagedFile};
pub use errors::Result;
pub use sqlite::{SqliteBackend, SqliteConnector};
