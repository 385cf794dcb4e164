use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Closed set of attribute types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttrType {
    Integer,
    Long,
    Double,
    String,
    Boolean,
    Instant,
}

impl AttrType {
    /// Integer, Long and Double compare with each other
    pub fn is_numeric(self) -> bool {
        matches!(self, AttrType::Integer | AttrType::Long | AttrType::Double)
    }

    pub fn name(self) -> &'static str {
        match self {
            AttrType::Integer => "Integer",
            AttrType::Long => "Long",
            AttrType::Double => "Double",
            AttrType::String => "String",
            AttrType::Boolean => "Boolean",
            AttrType::Instant => "Instant",
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i32),
    Long(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    Instant(DateTime<Utc>),
}

impl Value {
    /// Type of a non-null value
    pub fn attr_type(&self) -> Option<AttrType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(AttrType::Integer),
            Value::Long(_) => Some(AttrType::Long),
            Value::Double(_) => Some(AttrType::Double),
            Value::String(_) => Some(AttrType::String),
            Value::Boolean(_) => Some(AttrType::Boolean),
            Value::Instant(_) => Some(AttrType::Instant),
        }
    }

    /// True for the values a store-assigned attribute holds before insert
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Value::Null | Value::Integer(0) | Value::Long(0))
    }
}

/// Rust types that may back an attribute
///
/// Only these types can be registered in a [`super::SchemaBuilder`], so an
/// unsupported field type never reaches the store.
pub trait FieldType: Sized + Send + Sync + 'static {
    const TYPE: AttrType;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    /// Convert back, handing the value back on a type mismatch
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl FieldType for i32 {
    const TYPE: AttrType = AttrType::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Integer(v) => Ok(v),
            Value::Long(v) => i32::try_from(v).map_err(|_| Value::Long(v)),
            other => Err(other),
        }
    }
}

impl FieldType for i64 {
    const TYPE: AttrType = AttrType::Long;

    fn to_value(&self) -> Value {
        Value::Long(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Long(v) => Ok(v),
            Value::Integer(v) => Ok(i64::from(v)),
            other => Err(other),
        }
    }
}

impl FieldType for f64 {
    const TYPE: AttrType = AttrType::Double;

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Integer(v) => Ok(f64::from(v)),
            Value::Long(v) => Ok(v as f64),
            other => Err(other),
        }
    }
}

impl FieldType for String {
    const TYPE: AttrType = AttrType::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl FieldType for bool {
    const TYPE: AttrType = AttrType::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Integer(v) => Ok(v != 0),
            Value::Long(v) => Ok(v != 0),
            other => Err(other),
        }
    }
}

impl FieldType for DateTime<Utc> {
    const TYPE: AttrType = AttrType::Instant;

    fn to_value(&self) -> Value {
        Value::Instant(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Instant(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl<F: FieldType> FieldType for Option<F> {
    const TYPE: AttrType = F::TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => F::from_value(other).map(Some),
        }
    }
}
