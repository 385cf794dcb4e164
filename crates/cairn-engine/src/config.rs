//! Repository configuration
//!
//! Parsed from TOML text; locating and reading the file is the caller's
//! business.
//!
//! ```toml
//! store_root = "/srv/cairn"
//! membership_cache_ttl_secs = 60
//!
//! [pool]
//! max_instances = 4
//! ```

use cairn_core::errors::{RepoError, RepoErrorKind, Result};
use cairn_store::ContentStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pool sizing and expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub max_instances: usize,
    /// Instances older than this are closed instead of reused
    pub max_lifetime_secs: u64,
    /// How long `acquire` waits for a free instance
    pub acquire_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_instances: 8,
            max_lifetime_secs: 3600,
            acquire_timeout_ms: 5000,
        }
    }
}

impl PoolConfig {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Root directory of stored content
    pub store_root: PathBuf,
    /// SQLite database; `<store_root>/cairn.db` when unset
    pub database: Option<PathBuf>,
    /// Must share a filesystem with `store_root`; `<store_root>/.staging`
    pub staging_dir: Option<PathBuf>,
    /// `<store_root>/.trash` when unset
    pub trash_dir: Option<PathBuf>,
    pub pool: PoolConfig,
    pub membership_cache_ttl_secs: u64,
    /// Attempts at finding a free random bucket path
    pub path_retry_limit: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::new(),
            database: None,
            staging_dir: None,
            trash_dir: None,
            pool: PoolConfig::default(),
            membership_cache_ttl_secs: 300,
            path_retry_limit: 64,
        }
    }
}

impl RepositoryConfig {
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
            ..Default::default()
        }
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// Returns a Configuration error for malformed TOML, unknown keys or
    /// values that fail [`RepositoryConfig::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| {
            RepoError::new(RepoErrorKind::Configuration)
                .with_op("load_config")
                .with_message(e.to_string())
                .with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns a Configuration error for an empty store root or a zero
    /// limit.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(RepoError::new(RepoErrorKind::Configuration)
                .with_op("validate_config")
                .with_message(message))
        };
        if self.store_root.as_os_str().is_empty() {
            return fail("store_root must be set");
        }
        if self.pool.max_instances == 0 {
            return fail("pool.max_instances must be at least 1");
        }
        if self.pool.max_lifetime_secs == 0 {
            return fail("pool.max_lifetime_secs must be positive");
        }
        if self.path_retry_limit == 0 {
            return fail("path_retry_limit must be at least 1");
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.store_root.join("cairn.db"))
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| self.store_root.join(".staging"))
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.trash_dir
            .clone()
            .unwrap_or_else(|| self.store_root.join(".trash"))
    }

    pub fn membership_ttl(&self) -> Duration {
        Duration::from_secs(self.membership_cache_ttl_secs)
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    pub fn content_store(&self) -> ContentStore {
        ContentStore::new(
            &self.store_root,
            self.staging_dir(),
            self.trash_dir(),
            self.path_retry_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_in() {
        let config = RepositoryConfig::from_toml_str("store_root = \"/srv/cairn\"").unwrap();
        assert_eq!(config.pool.max_instances, 8);
        assert_eq!(config.pool.max_lifetime_secs, 3600);
        assert_eq!(config.membership_cache_ttl_secs, 300);
        assert_eq!(config.path_retry_limit, 64);
        assert_eq!(config.staging_dir(), PathBuf::from("/srv/cairn/.staging"));
        assert_eq!(config.trash_dir(), PathBuf::from("/srv/cairn/.trash"));
        assert_eq!(config.database_path(), PathBuf::from("/srv/cairn/cairn.db"));
    }

    #[test]
    fn test_overrides() {
        let config = RepositoryConfig::from_toml_str(
            r#"
            store_root = "/data"
            trash_dir = "/bin/trash"
            membership_cache_ttl_secs = 5

            [pool]
            max_instances = 2
            acquire_timeout_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.trash_dir(), PathBuf::from("/bin/trash"));
        assert_eq!(config.pool.max_instances, 2);
        assert_eq!(config.pool.acquire_timeout(), Duration::from_millis(10));
        assert_eq!(config.pool.max_lifetime_secs, 3600);
    }

    #[test]
    fn test_rejects_bad_config() {
        for text in [
            "",
            "store_root = \"/x\"\n[pool]\nmax_instances = 0",
            "store_root = \"/x\"\npath_retry_limit = 0",
            "store_root = \"/x\"\ncolour = \"blue\"",
            "store_root = ",
        ] {
            let err = RepositoryConfig::from_toml_str(text).unwrap_err();
            assert_eq!(err.kind(), RepoErrorKind::Configuration, "{}", text);
        }
    }
}
