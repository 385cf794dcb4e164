//! SQLite connection implementing the persistence contracts

#![allow(clippy::result_large_err)]

use super::table::SqliteTable;
use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use cairn_core::adapter::{Backend, Connector, PersistenceConnection, TableAdapter, TableRole};
use cairn_core::datetime::DateParser;
use cairn_core::errors::{RepoError, RepoErrorKind};
use cairn_core::tuple::Tuple;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// One SQLite connection
pub struct SqliteBackend {
    conn: Connection,
    dates: DateParser,
}

impl SqliteBackend {
    /// Wrap a connection already set up by [`db::configure`]
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            dates: DateParser::new(),
        }
    }

    /// Parser used to resolve date literals when compiling filters
    pub fn with_date_parser(mut self, dates: DateParser) -> Self {
        self.dates = dates;
        self
    }

    /// Open `path`, configure it and bring its schema up to date
    pub fn open(path: &Path) -> Result<Self> {
        let mut conn = db::open(path)?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn transaction_state_error(&self, op: &str, message: &str) -> RepoError {
        RepoError::new(RepoErrorKind::Persistence)
            .with_op(op)
            .with_message(message)
    }
}

impl PersistenceConnection for SqliteBackend {
    fn start_transaction(&self) -> Result<()> {
        if self.in_transaction() {
            return Err(self.transaction_state_error(
                "start_transaction",
                "a transaction is already open",
            ));
        }
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(from_rusqlite)
    }

    fn commit(&self) -> Result<()> {
        if !self.in_transaction() {
            return Err(self.transaction_state_error("commit", "no transaction is open"));
        }
        self.conn.execute_batch("COMMIT").map_err(from_rusqlite)
    }

    fn rollback(&self) -> Result<()> {
        if !self.in_transaction() {
            return Err(self.transaction_state_error("rollback", "no transaction is open"));
        }
        self.conn.execute_batch("ROLLBACK").map_err(from_rusqlite)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn is_valid(&self) -> bool {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| from_rusqlite(err))
    }
}

impl Backend for SqliteBackend {
    fn table<T: Tuple>(&self, role: TableRole) -> Result<Box<dyn TableAdapter<T> + '_>> {
        let schema = T::schema()?;
        let table = match role {
            TableRole::Live => schema.table(),
            TableRole::Trash => schema.trash_table().ok_or_else(|| {
                RepoError::new(RepoErrorKind::Configuration)
                    .with_op("table")
                    .with_message(format!("{} has no trash table", schema.entity()))
            })?,
        };
        Ok(Box::new(SqliteTable::new(&self.conn, schema, table, &self.dates)))
    }
}

/// Opens `SqliteBackend`s on one database file
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for SqliteConnector {
    type Backend = SqliteBackend;

    fn connect(&self) -> Result<SqliteBackend> {
        SqliteBackend::open(&self.path)
    }
}
