//! SQLite implementation of the storage contracts

mod backend;
pub mod compiler;
mod table;
mod values;

pub use backend::{SqliteBackend, SqliteConnector};
pub use compiler::{compile, CompiledFilter};
pub use table::SqliteTable;

/// Double-quote an identifier
pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
