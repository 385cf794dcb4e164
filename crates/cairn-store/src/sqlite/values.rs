//! Conversions between attribute values and SQLite storage classes
//!
//! Instants are Unix milliseconds, booleans 0/1.

use crate::errors::Result;
use cairn_core::errors::{RepoError, RepoErrorKind};
use cairn_core::tuple::{AttrType, Value};
use chrono::{TimeZone, Utc};
use rusqlite::types::Value as SqlValue;

pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(i64::from(*v)),
        Value::Long(v) => SqlValue::Integer(*v),
        Value::Double(v) => SqlValue::Real(*v),
        Value::String(v) => SqlValue::Text(v.clone()),
        Value::Boolean(v) => SqlValue::Integer(i64::from(*v)),
        Value::Instant(v) => SqlValue::Integer(v.timestamp_millis()),
    }
}

pub(crate) fn from_sql(raw: SqlValue, ty: AttrType, column: &str) -> Result<Value> {
    let value = match (raw, ty) {
        (SqlValue::Null, _) => Some(Value::Null),
        (SqlValue::Integer(v), AttrType::Integer) => i32::try_from(v).ok().map(Value::Integer),
        (SqlValue::Integer(v), AttrType::Long) => Some(Value::Long(v)),
        (SqlValue::Integer(v), AttrType::Double) => Some(Value::Double(v as f64)),
        (SqlValue::Real(v), AttrType::Double) => Some(Value::Double(v)),
        (SqlValue::Text(v), AttrType::String) => Some(Value::String(v)),
        (SqlValue::Integer(v), AttrType::Boolean) => Some(Value::Boolean(v != 0)),
        (SqlValue::Integer(v), AttrType::Instant) => {
            Utc.timestamp_millis_opt(v).single().map(Value::Instant)
        }
        _ => None,
    };
    value.ok_or_else(|| {
        RepoError::new(RepoErrorKind::Persistence)
            .with_op("sqlite")
            .with_message(format!("column {} does not hold a {} value", column, ty))
    })
}
