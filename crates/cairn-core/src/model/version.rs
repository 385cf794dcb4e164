use crate::errors::Result;
use crate::tuple::{cached_schema, Tuple, TupleSchema};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Health-monitoring sub-record carried by every version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthRecord {
    pub missing: bool,
    pub lengthmismatch: bool,
    pub corrupt: bool,
    pub unhealthy: bool,
    pub linkcount: i32,
    pub lastseen: Option<DateTime<Utc>>,
    pub lastfingerprinted: Option<DateTime<Utc>>,
    pub lastvalidationattempt: Option<DateTime<Utc>>,
    pub lastsuccessfulvalidation: Option<DateTime<Utc>>,
    pub message: Option<String>,
    /// When a flag last flipped
    pub healthchanged: Option<DateTime<Utc>>,
    /// Flags that flipped at `healthchanged`, e.g. `missing:false->true`
    pub lastobservedchanges: Option<String>,
}

/// Derived health state of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HealthState {
    Unknown,
    Healthy,
    Missing,
    LengthMismatch,
    Corrupt,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthState::Unknown => "Unknown",
            HealthState::Healthy => "Healthy",
            HealthState::Missing => "Missing",
            HealthState::LengthMismatch => "LengthMismatch",
            HealthState::Corrupt => "Corrupt",
        };
        f.write_str(name)
    }
}

impl HealthRecord {
    pub fn state(&self) -> HealthState {
        if self.lastvalidationattempt.is_none() {
            HealthState::Unknown
        } else if self.missing {
            HealthState::Missing
        } else if self.lengthmismatch {
            HealthState::LengthMismatch
        } else if self.corrupt {
            HealthState::Corrupt
        } else {
            HealthState::Healthy
        }
    }

    fn flags(&self) -> [(&'static str, bool); 4] {
        [
            ("missing", self.missing),
            ("lengthmismatch", self.lengthmismatch),
            ("corrupt", self.corrupt),
            ("unhealthy", self.unhealthy),
        ]
    }

    /// Flags that differ from `previous`, as `name:old->new`
    pub fn changes_since(&self, previous: &HealthRecord) -> Vec<String> {
        previous
            .flags()
            .iter()
            .zip(self.flags().iter())
            .filter(|(before, after)| before.1 != after.1)
            .map(|(before, after)| format!("{}:{}->{}", after.0, before.1, after.1))
            .collect()
    }
}

/// One immutable content snapshot of an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Version {
    pub handle: i64,
    pub imported: DateTime<Utc>,
    pub length: i64,
    pub sha1sum: String,
    pub title: Option<String>,
    /// Path of the content file relative to the store root
    pub path: String,
    /// Source path the content was imported from
    pub copiedfrom: Option<String>,
    pub inode: i64,
    pub versioncount: i32,
    #[serde(flatten)]
    pub health: HealthRecord,
}

impl Version {
    /// Duplicate-detection key
    pub fn fingerprint(&self) -> (&str, i64) {
        (&self.sha1sum, self.length)
    }

    pub fn state(&self) -> HealthState {
        self.health.state()
    }
}

static SCHEMA: OnceLock<Result<TupleSchema<Version>>> = OnceLock::new();

impl Tuple for Version {
    fn schema() -> Result<&'static TupleSchema<Self>> {
        cached_schema(&SCHEMA, || {
            TupleSchema::<Version>::builder("Version", "versions")
                .trash("versions_trash")
                .field("handle", |v| &v.handle, |v| &mut v.handle)
                .key()
                .field("imported", |v| &v.imported, |v| &mut v.imported)
                .key()
                .field("length", |v| &v.length, |v| &mut v.length)
                .field("sha1sum", |v| &v.sha1sum, |v| &mut v.sha1sum)
                .field("title", |v| &v.title, |v| &mut v.title)
                .field("path", |v| &v.path, |v| &mut v.path)
                .field("copiedfrom", |v| &v.copiedfrom, |v| &mut v.copiedfrom)
                .field("inode", |v| &v.inode, |v| &mut v.inode)
                .field("versioncount", |v| &v.versioncount, |v| &mut v.versioncount)
                .field("missing", |v| &v.health.missing, |v| &mut v.health.missing)
                .field(
                    "lengthmismatch",
                    |v| &v.health.lengthmismatch,
                    |v| &mut v.health.lengthmismatch,
                )
                .field("corrupt", |v| &v.health.corrupt, |v| &mut v.health.corrupt)
                .field(
                    "unhealthy",
                    |v| &v.health.unhealthy,
                    |v| &mut v.health.unhealthy,
                )
                .field(
                    "linkcount",
                    |v| &v.health.linkcount,
                    |v| &mut v.health.linkcount,
                )
                .field("lastseen", |v| &v.health.lastseen, |v| &mut v.health.lastseen)
                .field(
                    "lastfingerprinted",
                    |v| &v.health.lastfingerprinted,
                    |v| &mut v.health.lastfingerprinted,
                )
                .field(
                    "lastvalidationattempt",
                    |v| &v.health.lastvalidationattempt,
                    |v| &mut v.health.lastvalidationattempt,
                )
                .field(
                    "lastsuccessfulvalidation",
                    |v| &v.health.lastsuccessfulvalidation,
                    |v| &mut v.health.lastsuccessfulvalidation,
                )
                .field("message", |v| &v.health.message, |v| &mut v.health.message)
                .field(
                    "healthchanged",
                    |v| &v.health.healthchanged,
                    |v| &mut v.health.healthchanged,
                )
                .field(
                    "lastobservedchanges",
                    |v| &v.health.lastobservedchanges,
                    |v| &mut v.health.lastobservedchanges,
                )
                .build()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{AttrType, Value};

    #[test]
    fn test_schema_covers_health_fields() {
        let schema = Version::schema().unwrap();
        assert_eq!(schema.attributes().len(), 21);
        assert_eq!(schema.type_of("lastseen").unwrap(), AttrType::Instant);
        assert_eq!(schema.type_of("missing").unwrap(), AttrType::Boolean);
        assert_eq!(schema.primary_key().count(), 2);
    }

    #[test]
    fn test_nested_accessors() {
        let schema = Version::schema().unwrap();
        let mut v = Version::default();
        let idx = schema.index_of("corrupt").unwrap();
        schema.set_at(&mut v, idx, Value::Boolean(true)).unwrap();
        assert!(v.health.corrupt);
        assert_eq!(schema.get(&v, "corrupt").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_state_transitions() {
        let mut h = HealthRecord::default();
        assert_eq!(h.state(), HealthState::Unknown);
        h.lastvalidationattempt = Some(Utc::now());
        assert_eq!(h.state(), HealthState::Healthy);
        h.missing = true;
        assert_eq!(h.state(), HealthState::Missing);
    }

    #[test]
    fn test_changes_since() {
        let before = HealthRecord::default();
        let after = HealthRecord {
            missing: true,
            unhealthy: true,
            ..Default::default()
        };
        assert_eq!(
            after.changes_since(&before),
            vec!["missing:false->true", "unhealthy:false->true"]
        );
        assert!(after.changes_since(&after).is_empty());
    }
}
