//! Error helpers for cairn-store
//!
//! Every rusqlite and filesystem failure is wrapped into a `RepoError` here

use cairn_core::errors::{RepoError, RepoErrorKind};
use std::path::Path;

/// Result type alias using RepoError
pub type Result<T> = std::result::Result<T, RepoError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> RepoError {
    RepoError::new(RepoErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// An applied migration whose embedded SQL has since changed
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> RepoError {
    RepoError::new(RepoErrorKind::Configuration)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> RepoError {
    RepoError::new(RepoErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
        .with_source(err)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> RepoError {
    RepoError::new(RepoErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
        .with_source(err)
}

/// Failure touching a content file, NoSuchFile when it is absent
pub fn file_error(operation: &str, path: &Path, err: std::io::Error) -> RepoError {
    let kind = if err.kind() == std::io::ErrorKind::NotFound {
        RepoErrorKind::NoSuchFile
    } else {
        RepoErrorKind::FileError
    };
    RepoError::new(kind)
        .with_op(operation.to_string())
        .with_message(format!("{}: {}", path.display(), err))
        .with_source(err)
}

/// A row addressed by primary key was not there
pub fn missing_row(entity: &str, key: &str) -> RepoError {
    RepoError::new(RepoErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(format!("no {} row with key ({})", entity, key))
}
