//! Storage contracts
//!
//! [`TableAdapter`] is the CRUD and scan surface over one entity type,
//! [`PersistenceConnection`] the transaction surface over one backend
//! connection. A [`Backend`] hands out adapters for the live and trash
//! tables of any [`Tuple`]; a [`Connector`] opens backends for the pool.
//! Nothing above this module knows which store sits underneath.

use crate::errors::Result;
use crate::filter::Expr;
use crate::tuple::{AttrType, Tuple};

/// Which of an entity's parallel tables to address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    Live,
    /// Retired rows; only entities with a trash table support it
    Trash,
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub attribute: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: false,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: true,
        }
    }
}

/// CRUD and scan contract over one entity type
///
/// Every method reports failures as [`crate::RepoError`]; raw store errors
/// never escape an implementation.
pub trait TableAdapter<T: Tuple> {
    /// Push-based scan
    ///
    /// Rows matching `filter` are fed to `visitor` in `sort` order until the
    /// visitor returns `false` or `limit` rows were delivered. Returns the
    /// number of rows delivered.
    ///
    /// # Errors
    ///
    /// Returns the first store error, or the first error raised by the
    /// visitor.
    fn apply_selection(
        &self,
        filter: Option<&Expr<T>>,
        sort: &[SortKey],
        limit: Option<usize>,
        visitor: &mut dyn FnMut(T) -> Result<bool>,
    ) -> Result<usize>;

    /// # Errors
    ///
    /// Returns a Persistence error if the scan fails.
    fn select(&self, filter: Option<&Expr<T>>, sort: &[SortKey]) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        self.apply_selection(filter, sort, None, &mut |row| {
            rows.push(row);
            Ok(true)
        })?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns a Persistence error if the scan fails.
    fn select_all(&self) -> Result<Vec<T>> {
        self.select(None, &[])
    }

    /// First row in `sort` order, if any
    ///
    /// # Errors
    ///
    /// Returns a Persistence error if the scan fails.
    fn first(&self, filter: Option<&Expr<T>>, sort: &[SortKey]) -> Result<Option<T>> {
        let mut found = None;
        self.apply_selection(filter, sort, Some(1), &mut |row| {
            found = Some(row);
            Ok(false)
        })?;
        Ok(found)
    }

    /// # Errors
    ///
    /// Returns a Persistence error if the count fails.
    fn count(&self, filter: Option<&Expr<T>>) -> Result<usize> {
        self.apply_selection(filter, &[], None, &mut |_| Ok(true))
    }

    /// Insert `row`, filling in its store-assigned attributes
    ///
    /// # Errors
    ///
    /// Returns a Persistence error if the row cannot be inserted (for
    /// example a primary-key collision).
    fn insert(&self, row: &mut T) -> Result<()>;

    /// Insert unless a row with the same primary key exists
    ///
    /// Returns `true` when a row was created.
    ///
    /// # Errors
    ///
    /// Returns a Persistence error on store failure.
    fn insert_if_new(&self, row: &mut T) -> Result<bool>;

    /// Overwrite the row with `row`'s primary key
    ///
    /// # Errors
    ///
    /// Returns a Persistence error when no such row exists.
    fn update(&self, row: &T) -> Result<()>;

    /// Remove the row with `row`'s primary key
    ///
    /// # Errors
    ///
    /// Returns a Persistence error when no such row exists.
    fn delete(&self, row: &T) -> Result<()>;

    /// # Errors
    ///
    /// Returns a Configuration error if the entity descriptor is malformed.
    fn attribute_names(&self) -> Result<Vec<&'static str>> {
        Ok(T::schema()?.attribute_names())
    }

    /// # Errors
    ///
    /// Returns an Expression error for an unknown attribute.
    fn type_of(&self, name: &str) -> Result<AttrType> {
        T::schema()?.type_of(name)
    }
}

/// Transaction surface of one backend connection
pub trait PersistenceConnection {
    /// # Errors
    ///
    /// Returns a Persistence error if a transaction is already open or the
    /// store refuses to begin one.
    fn start_transaction(&self) -> Result<()>;

    /// # Errors
    ///
    /// Returns a Persistence error if no transaction is open or the commit
    /// fails.
    fn commit(&self) -> Result<()>;

    /// # Errors
    ///
    /// Returns a Persistence error if no transaction is open or the
    /// rollback fails.
    fn rollback(&self) -> Result<()>;

    fn in_transaction(&self) -> bool;

    /// Liveness check
    fn is_valid(&self) -> bool;

    /// # Errors
    ///
    /// Returns a Persistence error if the connection does not close cleanly.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// A live store connection that can address any entity's tables
pub trait Backend: PersistenceConnection {
    /// Adapter over the live or trash table of `T`
    ///
    /// # Errors
    ///
    /// Returns a Configuration error when `T` is malformed or has no table
    /// for `role`.
    fn table<T: Tuple>(&self, role: TableRole) -> Result<Box<dyn TableAdapter<T> + '_>>;
}

/// Opens backends; the pool's only view of the store
pub trait Connector: Send + Sync {
    type Backend: Backend + Send;

    /// # Errors
    ///
    /// Returns a Persistence error when the store cannot be opened.
    fn connect(&self) -> Result<Self::Backend>;
}
