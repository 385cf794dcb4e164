//! Command implementations

pub mod object;
pub mod query;
pub mod report;
pub mod tag;

use cairn_core::errors::{RepoError, RepoErrorKind};
use cairn_engine::{RepositoryConfig, RepositoryManager};
use cairn_store::SqliteBackend;
use serde::Serialize;
use std::path::PathBuf;

pub type Repo = RepositoryManager<SqliteBackend>;

const DEFAULT_STORE: &str = ".cairn";

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub struct RepositoryArgs {
    pub store: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Build the configuration, create the store and open the database
///
/// Migrations are applied on open.
pub fn open_repository(args: &RepositoryArgs) -> Result<Repo, RepoError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                RepoError::new(RepoErrorKind::Configuration)
                    .with_op("load_config")
                    .with_message(format!("cannot read '{}'", path.display()))
                    .with_source(e)
            })?;
            RepositoryConfig::from_toml_str(&text)?
        }
        None => RepositoryConfig::new(DEFAULT_STORE),
    };
    if let Some(store) = &args.store {
        config.store_root = store.clone();
    }
    if let Some(db) = &args.db {
        config.database = Some(db.clone());
    }
    config.validate()?;

    std::fs::create_dir_all(&config.store_root).map_err(|e| {
        RepoError::new(RepoErrorKind::Io)
            .with_op("open_repository")
            .with_message(format!("cannot create '{}'", config.store_root.display()))
            .with_source(e)
    })?;
    let backend = SqliteBackend::open(&config.database_path())?;
    Ok(RepositoryManager::new(backend, &config))
}

pub fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
