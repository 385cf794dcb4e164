//! Cairn Core - contracts and pure logic of the object repository
//!
//! This crate holds everything that does not touch a database or a
//! filesystem:
//! - The canonical error facility ([`errors::RepoError`])
//! - The structured logging facility and its boundary macros
//! - The Tuple Schema Model ([`tuple`]) describing each persisted entity
//! - The storage contracts ([`adapter::TableAdapter`], [`adapter::PersistenceConnection`], [`adapter::Backend`])
//! - The repository records ([`model`])
//! - The typed filter expression engine and its textual parser ([`filter`])
//! - The date/time literal parser ([`datetime`])

pub mod adapter;
pub mod datetime;
pub mod errors;
pub mod filter;
pub mod logging_facility;
pub mod model;
pub mod tuple;

// Re-export commonly used types
pub use adapter::{Backend, Connector, PersistenceConnection, SortKey, TableAdapter, TableRole};
pub use errors::{RepoError, RepoErrorKind, Result};
pub use filter::{CompareOp, Expr, ExpressionFactory};
pub use model::{HealthRecord, HealthState, Object, ObjectTag, Tag, TagType, TagValue, Version};
pub use tuple::{AttrType, Tuple, TupleSchema, Value};

#[doc(hidden)]
pub use cairn_core_types as core_types;
#[doc(hidden)]
pub use tracing as __tracing;
