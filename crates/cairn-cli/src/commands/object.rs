//! Object lifecycle commands

use super::{print_json, CommandResult, Repo};
use cairn_core::datetime::parse_instant;
use cairn_engine::report::VersionSummary;
use cairn_engine::ImportOptions;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub path: PathBuf,

    #[arg(long)]
    pub title: Option<String>,

    /// Import even if identical content is already stored
    #[arg(long)]
    pub allow_duplicates: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub handle: i64,

    pub path: PathBuf,

    /// Defaults to the previous version's title
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub allow_duplicates: bool,
}

#[derive(Debug, Args)]
pub struct HandleArgs {
    pub handle: i64,
}

#[derive(Debug, Args)]
pub struct RetireArgs {
    pub handle: i64,

    /// Skip the consistency and file-presence checks
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RetireVersionArgs {
    pub handle: i64,

    /// Import time of the version, e.g. 2024-03-01T10:15:00.123Z
    pub imported: String,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    pub handle: i64,

    /// Also recompute the checksum
    #[arg(long)]
    pub full: bool,

    /// Fail unless the content is healthy (implies --full)
    #[arg(long)]
    pub validate: bool,
}

fn options(title: Option<String>, allow_duplicates: bool) -> ImportOptions {
    ImportOptions {
        title,
        check_duplicates: !allow_duplicates,
    }
}

pub fn import(repo: &Repo, args: ImportArgs) -> CommandResult {
    let version = repo.create_object(&args.path, &options(args.title, args.allow_duplicates))?;
    print_json(&version)
}

pub fn update(repo: &Repo, args: UpdateArgs) -> CommandResult {
    let version = repo.update_object(
        args.handle,
        &args.path,
        &options(args.title, args.allow_duplicates),
    )?;
    print_json(&version)
}

pub fn rollback(repo: &Repo, args: HandleArgs) -> CommandResult {
    let imported = repo.rollback_object_to_previous_version(args.handle)?;
    print_json(&json!({ "handle": args.handle, "imported": imported }))
}

pub fn retire(repo: &Repo, args: RetireArgs) -> CommandResult {
    let report = repo.retire_object(args.handle, args.force)?;
    print_json(&report)
}

pub fn retire_version(repo: &Repo, args: RetireVersionArgs) -> CommandResult {
    let imported = parse_instant(&args.imported)?;
    let current = repo.retire_object_version(args.handle, imported)?;
    print_json(&json!({ "handle": args.handle, "imported": current }))
}

pub fn check(repo: &Repo, args: CheckArgs) -> CommandResult {
    if args.validate {
        let version = repo.validate(args.handle)?;
        return print_json(&VersionSummary::from(&version));
    }
    let outcome = repo.check(args.handle, args.full)?;
    print_json(&outcome)
}

pub fn versions(repo: &Repo, args: HandleArgs) -> CommandResult {
    let versions = repo.get_versions(args.handle)?;
    let rows: Vec<VersionSummary> = versions.iter().map(VersionSummary::from).collect();
    print_json(&rows)
}
