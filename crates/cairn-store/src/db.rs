//! Database connection management

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::sqlite::compiler;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Per-connection settings and SQL functions
///
/// Referential rules between tables are enforced by the repository, so
/// foreign keys stay off. Pooled connections share one file, hence WAL and a
/// busy timeout.
pub fn configure(conn: &Connection) -> Result<()> {
    compiler::register_functions(conn).map_err(from_rusqlite)?;
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(from_rusqlite)?;
    conn.pragma_update(None, "foreign_keys", "OFF")
        .map_err(from_rusqlite)?;
    // journal_mode returns the resulting mode as a row
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(from_rusqlite)?;
    Ok(())
}
