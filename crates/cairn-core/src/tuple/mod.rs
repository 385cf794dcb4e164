//! Tuple Schema Model
//!
//! Every persisted entity describes itself once through a [`TupleSchema`]:
//! the ordered attribute list, each attribute's [`AttrType`], the primary
//! key, the store-assigned attributes and a typed getter/setter per
//! attribute. Table adapters and the expression factory consume the
//! descriptor; nothing inspects entity structs any other way.

mod schema;
mod value;

pub use schema::{Attribute, SchemaBuilder, TupleSchema};
pub use value::{AttrType, FieldType, Value};

use crate::errors::Result;
use std::fmt::Debug;
use std::sync::OnceLock;

/// A record that can be mapped to and from a backing store
pub trait Tuple: Clone + Default + Debug + Send + Sync + 'static {
    /// The entity's descriptor, built on first use and shared afterwards
    ///
    /// # Errors
    ///
    /// Returns a Configuration error when the descriptor is malformed
    /// (duplicate attribute, no primary key, store-assigned attribute of an
    /// unsupported type). The same error is returned on every call.
    fn schema() -> Result<&'static TupleSchema<Self>>;
}

/// Build a descriptor once and hand out the cached outcome
///
/// # Errors
///
/// Returns a clone of the build error, if building failed.
pub fn cached_schema<T>(
    cell: &'static OnceLock<Result<TupleSchema<T>>>,
    build: impl FnOnce() -> Result<TupleSchema<T>>,
) -> Result<&'static TupleSchema<T>> {
    cell.get_or_init(build).as_ref().map_err(Clone::clone)
}
