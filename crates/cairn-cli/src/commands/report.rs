//! Repository reports

use super::{print_json, CommandResult, Repo};

pub fn status(repo: &Repo) -> CommandResult {
    print_json(&repo.status()?)
}

pub fn health(repo: &Repo) -> CommandResult {
    print_json(&repo.health_monitoring_report()?)
}
