//! Cairn CLI
//!
//! Command-line interface for a Cairn object repository. Every command maps
//! onto one repository operation and prints its result as JSON.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cairn")]
#[command(about = "Cairn - versioned object repository", long_about = None)]
struct Cli {
    /// Content store root [default: .cairn]
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// SQLite database (defaults to <store>/cairn.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML configuration file; --store and --db still override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log operations to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a file as a new object
    Import(commands::object::ImportArgs),
    /// Import a file as the next version of an object
    Update(commands::object::UpdateArgs),
    /// Discard the current version of an object
    Rollback(commands::object::HandleArgs),
    /// Move an object and all its versions to trash
    Retire(commands::object::RetireArgs),
    /// Move one version of an object to trash
    RetireVersion(commands::object::RetireVersionArgs),
    /// Audit the current version's content file
    Check(commands::object::CheckArgs),
    /// List the versions of an object
    Versions(commands::object::HandleArgs),
    /// Query current versions
    Query(commands::query::QueryArgs),
    /// Tag vocabulary and assignments
    Tag(commands::tag::TagArgs),
    /// Canonicalize sequence values and drop unused ones
    ScrubTags(commands::tag::ScrubArgs),
    /// Row counts
    Status,
    /// Health of every object's current version
    Report,
    /// Attributes usable in queries
    Schema,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        cairn_core::logging_facility::init(cairn_core::logging_facility::Profile::Development);
    }

    let opened = commands::open_repository(&commands::RepositoryArgs {
        store: cli.store,
        db: cli.db,
        config: cli.config,
    });
    let repo = match opened {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Import(args) => commands::object::import(&repo, args),
        Commands::Update(args) => commands::object::update(&repo, args),
        Commands::Rollback(args) => commands::object::rollback(&repo, args),
        Commands::Retire(args) => commands::object::retire(&repo, args),
        Commands::RetireVersion(args) => commands::object::retire_version(&repo, args),
        Commands::Check(args) => commands::object::check(&repo, args),
        Commands::Versions(args) => commands::object::versions(&repo, args),
        Commands::Query(args) => commands::query::query(&repo, args),
        Commands::Tag(args) => commands::tag::execute(&repo, args),
        Commands::ScrubTags(args) => commands::tag::scrub(&repo, args),
        Commands::Status => commands::report::status(&repo),
        Commands::Report => commands::report::health(&repo),
        Commands::Schema => commands::query::schema(&repo),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
