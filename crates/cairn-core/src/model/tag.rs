use crate::errors::Result;
use crate::tuple::{cached_schema, AttrType, FieldType, Tuple, TupleSchema, Value};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Kind of vocabulary a tag carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum TagType {
    /// Names a thing (person, place, organisation)
    #[default]
    Entity,
    /// Free classification
    Category,
    /// Ordered values such as "1.2.10"; normalized by scrub
    Sequence,
}

impl TagType {
    pub fn as_str(self) -> &'static str {
        match self {
            TagType::Entity => "Entity",
            TagType::Category => "Category",
            TagType::Sequence => "Sequence",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entity" => Ok(TagType::Entity),
            "category" => Ok(TagType::Category),
            "sequence" => Ok(TagType::Sequence),
            other => Err(format!("unknown tag type '{}'", other)),
        }
    }
}

impl FieldType for TagType {
    const TYPE: AttrType = AttrType::String;

    fn to_value(&self) -> Value {
        Value::String(self.as_str().to_string())
    }

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::String(s) => s.parse().map_err(|_| Value::String(s)),
            other => Err(other),
        }
    }
}

/// A controlled-vocabulary tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub browsing_priority: i32,
}

impl Tag {
    pub fn new(name: impl Into<String>, tag_type: TagType) -> Self {
        Self {
            name: name.into(),
            tag_type,
            ..Default::default()
        }
    }
}

/// One permitted value of a tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TagValue {
    pub name: String,
    pub value: String,
}

impl TagValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Assignment of a tag value to an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectTag {
    pub name: String,
    pub value: String,
    pub handle: i64,
}

impl ObjectTag {
    pub fn new(handle: i64, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            handle,
        }
    }
}

static TAG_SCHEMA: OnceLock<Result<TupleSchema<Tag>>> = OnceLock::new();
static TAG_VALUE_SCHEMA: OnceLock<Result<TupleSchema<TagValue>>> = OnceLock::new();
static OBJECT_TAG_SCHEMA: OnceLock<Result<TupleSchema<ObjectTag>>> = OnceLock::new();

impl Tuple for Tag {
    fn schema() -> Result<&'static TupleSchema<Self>> {
        cached_schema(&TAG_SCHEMA, || {
            TupleSchema::<Tag>::builder("Tag", "tags")
                .field("name", |t| &t.name, |t| &mut t.name)
                .key()
                .field("description", |t| &t.description, |t| &mut t.description)
                .field("type", |t| &t.tag_type, |t| &mut t.tag_type)
                .field(
                    "browsingpriority",
                    |t| &t.browsing_priority,
                    |t| &mut t.browsing_priority,
                )
                .build()
        })
    }
}

impl Tuple for TagValue {
    fn schema() -> Result<&'static TupleSchema<Self>> {
        cached_schema(&TAG_VALUE_SCHEMA, || {
            TupleSchema::<TagValue>::builder("TagValue", "tag_values")
                .field("name", |t| &t.name, |t| &mut t.name)
                .key()
                .field("value", |t| &t.value, |t| &mut t.value)
                .key()
                .build()
        })
    }
}

impl Tuple for ObjectTag {
    fn schema() -> Result<&'static TupleSchema<Self>> {
        cached_schema(&OBJECT_TAG_SCHEMA, || {
            TupleSchema::<ObjectTag>::builder("ObjectTag", "object_tags")
                .trash("object_tags_trash")
                .field("name", |t| &t.name, |t| &mut t.name)
                .key()
                .field("value", |t| &t.value, |t| &mut t.value)
                .key()
                .field("handle", |t| &t.handle, |t| &mut t.handle)
                .key()
                .build()
        })
    }
}
