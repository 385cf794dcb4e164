//! Relocation of retired content

#![allow(clippy::result_large_err)]

use crate::errors::{file_error, io_error, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Move `source` to `<trash_dir>/<handle>/<imported millis>-<file name>`
///
/// Falls back to copy-and-remove when a rename crosses filesystems.
pub(crate) fn relocate(
    source: &Path,
    trash_dir: &Path,
    handle: i64,
    imported: DateTime<Utc>,
) -> Result<PathBuf> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "content".to_string());
    let dir = trash_dir.join(handle.to_string());
    fs::create_dir_all(&dir).map_err(|e| io_error("create_trash_dir", e))?;
    let target = dir.join(format!("{}-{}", imported.timestamp_millis(), name));

    if fs::rename(source, &target).is_err() {
        fs::copy(source, &target).map_err(|e| file_error("trash_content", source, e))?;
        fs::remove_file(source).map_err(|e| file_error("trash_content", source, e))?;
    }
    Ok(target)
}
