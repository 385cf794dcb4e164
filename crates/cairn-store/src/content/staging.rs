//! Staging and fingerprinting

#![allow(clippy::result_large_err)]

use crate::errors::{file_error, io_error, Result};
use cairn_core::errors::{RepoError, RepoErrorKind};
use sha1::{Digest, Sha1};
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Size and identity of a file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub length: i64,
    pub inode: i64,
    pub link_count: i32,
}

impl FileStat {
    fn from_metadata(meta: &Metadata) -> Self {
        let (inode, link_count) = identity(meta);
        Self {
            length: i64::try_from(meta.len()).unwrap_or(i64::MAX),
            inode,
            link_count,
        }
    }
}

#[cfg(unix)]
fn identity(meta: &Metadata) -> (i64, i32) {
    use std::os::unix::fs::MetadataExt;
    (
        i64::try_from(meta.ino()).unwrap_or(i64::MAX),
        i32::try_from(meta.nlink()).unwrap_or(i32::MAX),
    )
}

#[cfg(not(unix))]
fn identity(_meta: &Metadata) -> (i64, i32) {
    (0, 1)
}

/// A copy of an import source waiting in the staging area
///
/// Dropping it removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    source: PathBuf,
    sha1sum: String,
    stat: FileStat,
}

impl StagedFile {
    pub fn sha1sum(&self) -> &str {
        &self.sha1sum
    }

    pub fn length(&self) -> i64 {
        self.stat.length
    }

    pub fn stat(&self) -> FileStat {
        self.stat
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// File name of the import source
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Rename into `target` unless something already lives there
    pub(crate) fn persist(self, target: &Path) -> Result<()> {
        self.temp.persist_noclobber(target).map_err(|e| {
            RepoError::new(RepoErrorKind::FileRenameFailed)
                .with_op("commit_content")
                .with_message(format!("{}: {}", target.display(), e.error))
                .with_source(e.error)
        })?;
        Ok(())
    }
}

/// Forwards writes while hashing them
struct HashingWriter<W> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub(crate) fn stage(staging_dir: &Path, source: &Path) -> Result<StagedFile> {
    let meta = fs::metadata(source).map_err(|e| file_error("stage_content", source, e))?;
    if !meta.is_file() {
        return Err(RepoError::new(RepoErrorKind::FileError)
            .with_op("stage_content")
            .with_message(format!("{} is not a regular file", source.display())));
    }
    let mut input = File::open(source).map_err(|e| file_error("stage_content", source, e))?;

    fs::create_dir_all(staging_dir).map_err(|e| io_error("create_staging_dir", e))?;
    let temp = NamedTempFile::new_in(staging_dir).map_err(|e| io_error("create_staging_file", e))?;

    let mut writer = HashingWriter {
        inner: temp.as_file(),
        hasher: Sha1::new(),
    };
    io::copy(&mut input, &mut writer).map_err(|e| file_error("copy_content", source, e))?;
    writer.flush().map_err(|e| io_error("copy_content", e))?;
    let sha1sum = hex::encode(writer.hasher.finalize());

    temp.as_file()
        .sync_all()
        .map_err(|e| io_error("sync_staging_file", e))?;
    let staged_meta = temp
        .as_file()
        .metadata()
        .map_err(|e| io_error("stat_staging_file", e))?;

    tracing::debug!(source = %source.display(), sha1sum = %sha1sum, "staged content");

    Ok(StagedFile {
        temp,
        source: source.to_path_buf(),
        sha1sum,
        stat: FileStat::from_metadata(&staged_meta),
    })
}

/// SHA-1 (hex) and length of a file
pub fn fingerprint_file(path: &Path) -> Result<(String, i64)> {
    let mut file = File::open(path).map_err(|e| file_error("fingerprint", path, e))?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    let mut length: i64 = 0;
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| file_error("fingerprint", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        length += n as i64;
    }
    Ok((hex::encode(hasher.finalize()), length))
}

pub fn stat_file(path: &Path) -> Result<FileStat> {
    let meta = fs::metadata(path).map_err(|e| file_error("stat", path, e))?;
    Ok(FileStat::from_metadata(&meta))
}
