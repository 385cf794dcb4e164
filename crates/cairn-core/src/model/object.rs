use crate::errors::Result;
use crate::tuple::{cached_schema, Tuple, TupleSchema};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::OnceLock;

/// Master row: one per handle, pointing at its current version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Object {
    /// Assigned by the store on first insert; 0 until then
    pub handle: i64,
    /// `imported` of the current version
    pub imported: DateTime<Utc>,
}

impl Object {
    pub fn new(imported: DateTime<Utc>) -> Self {
        Self { handle: 0, imported }
    }
}

static SCHEMA: OnceLock<Result<TupleSchema<Object>>> = OnceLock::new();

impl Tuple for Object {
    fn schema() -> Result<&'static TupleSchema<Self>> {
        cached_schema(&SCHEMA, || {
            TupleSchema::<Object>::builder("Object", "objects")
                .trash("objects_trash")
                .field("handle", |o| &o.handle, |o| &mut o.handle)
                .key()
                .assigned()
                .field("imported", |o| &o.imported, |o| &mut o.imported)
                .build()
        })
    }
}
