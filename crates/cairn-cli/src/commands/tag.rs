//! Tag vocabulary and assignment commands

use super::{print_json, CommandResult, Repo};
use cairn_core::model::{Tag, TagType};
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Debug, Args)]
pub struct TagArgs {
    #[command(subcommand)]
    pub command: TagCommand,
}

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    /// Define a tag
    Create {
        name: String,
        /// entity, category or sequence
        #[arg(long = "type", default_value = "entity")]
        tag_type: TagType,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value_t = 0)]
        browsing_priority: i32,
    },
    /// Delete an unused tag and its values
    Delete { name: String },
    /// Add a permitted value to a tag
    CreateValue { name: String, value: String },
    /// Delete an unused value
    DeleteValue { name: String, value: String },
    /// Assign name=value to an object
    Assign {
        handle: i64,
        name: String,
        value: String,
    },
    /// Remove an assignment
    Unassign {
        handle: i64,
        name: String,
        value: String,
    },
    /// List tags, the values of one tag, or the tags of one object
    List {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        handle: Option<i64>,
    },
}

#[derive(Debug, Args)]
pub struct ScrubArgs {
    /// Show what would change without changing it
    #[arg(long)]
    pub report_only: bool,
}

pub fn execute(repo: &Repo, args: TagArgs) -> CommandResult {
    match args.command {
        TagCommand::Create {
            name,
            tag_type,
            description,
            browsing_priority,
        } => {
            let tag = Tag {
                name,
                description,
                tag_type,
                browsing_priority,
            };
            let created = repo.create_tag(tag)?;
            print_json(&json!({ "created": created }))
        }
        TagCommand::Delete { name } => {
            repo.delete_tag(&name)?;
            print_json(&json!({ "deleted": name }))
        }
        TagCommand::CreateValue { name, value } => {
            let created = repo.create_tag_value(&name, &value)?;
            print_json(&json!({ "created": created }))
        }
        TagCommand::DeleteValue { name, value } => {
            repo.delete_tag_value(&name, &value)?;
            print_json(&json!({ "deleted": { "name": name, "value": value } }))
        }
        TagCommand::Assign {
            handle,
            name,
            value,
        } => {
            let added = repo.tag_object(handle, &name, &value)?;
            print_json(&json!({ "assigned": added }))
        }
        TagCommand::Unassign {
            handle,
            name,
            value,
        } => {
            let removed = repo.untag_object(handle, &name, &value)?;
            print_json(&json!({ "unassigned": removed }))
        }
        TagCommand::List { name, handle } => match (name, handle) {
            (_, Some(handle)) => print_json(&repo.get_object_tags(handle)?),
            (Some(name), None) => print_json(&repo.list_tag_values(&name)?),
            (None, None) => print_json(&repo.list_tags()?),
        },
    }
}

pub fn scrub(repo: &Repo, args: ScrubArgs) -> CommandResult {
    print_json(&repo.scrub_tags(args.report_only)?)
}
