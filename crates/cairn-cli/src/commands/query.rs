//! Query and schema commands

use super::{print_json, CommandResult, Repo};
use clap::Args;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Filter, e.g. "@versioncount > 1 and not @missing"; empty matches all
    #[arg(default_value = "")]
    pub filter: String,

    /// Sort terms, e.g. "@imported desc, @title"
    #[arg(long, default_value = "")]
    pub order_by: String,
}

pub fn query(repo: &Repo, args: QueryArgs) -> CommandResult {
    let versions = repo.process_query(&args.filter, &args.order_by)?;
    print_json(&versions)
}

pub fn schema(repo: &Repo) -> CommandResult {
    print_json(&repo.get_object_schema()?)
}
