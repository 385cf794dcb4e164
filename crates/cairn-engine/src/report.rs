//! Result records returned by manager operations

use cairn_core::model::{HealthState, TagValue, Version};
use cairn_core::tuple::AttrType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Row counts of the live and trash tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryStatus {
    pub objects: usize,
    pub versions: usize,
    pub tags: usize,
    pub tag_values: usize,
    pub object_tags: usize,
    pub trashed_objects: usize,
    pub trashed_versions: usize,
}

/// Health of every object's current version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub unknown: usize,
    pub healthy: usize,
    pub missing: usize,
    pub length_mismatch: usize,
    pub corrupt: usize,
    /// Handles whose current version is flagged unhealthy, ascending
    pub unhealthy: Vec<i64>,
}

impl HealthReport {
    pub(crate) fn record(&mut self, version: &Version) {
        match version.state() {
            HealthState::Unknown => self.unknown += 1,
            HealthState::Healthy => self.healthy += 1,
            HealthState::Missing => self.missing += 1,
            HealthState::LengthMismatch => self.length_mismatch += 1,
            HealthState::Corrupt => self.corrupt += 1,
        }
        if version.health.unhealthy {
            self.unhealthy.push(version.handle);
        }
    }

    pub fn total(&self) -> usize {
        self.unknown + self.healthy + self.missing + self.length_mismatch + self.corrupt
    }
}

/// Outcome of a health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub healthy: bool,
    pub state: HealthState,
    /// What changed since the previous check, e.g. `missing:false->true`
    pub changes: Vec<String>,
    pub version: Version,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetireReport {
    pub handle: i64,
    pub versions: usize,
    pub tags: usize,
    /// Where content files ended up in the trash directory
    pub trashed_files: Vec<PathBuf>,
    /// Content files that could not be relocated (already logged)
    pub trash_failures: usize,
}

/// A Sequence value rewritten to its canonical form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalization {
    pub name: String,
    pub from: String,
    pub to: String,
    /// Assignments carried over to the canonical value
    pub assignments: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrubReport {
    pub report_only: bool,
    pub normalized: Vec<Normalization>,
    /// Values with no assignments after normalization
    pub unused: Vec<TagValue>,
}

impl ScrubReport {
    pub fn is_clean(&self) -> bool {
        self.normalized.is_empty() && self.unused.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: AttrType,
}

/// Queryable attributes of versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSchema {
    pub entity: &'static str,
    pub attributes: Vec<AttributeInfo>,
}

/// One row of a version listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSummary {
    pub handle: i64,
    pub imported: DateTime<Utc>,
    pub versioncount: i32,
    pub title: Option<String>,
    pub state: HealthState,
}

impl From<&Version> for VersionSummary {
    fn from(version: &Version) -> Self {
        Self {
            handle: version.handle,
            imported: version.imported,
            versioncount: version.versioncount,
            title: version.title.clone(),
            state: version.state(),
        }
    }
}
