use super::value::{AttrType, FieldType, Value};
use crate::errors::{RepoError, RepoErrorKind, Result};
use std::collections::HashSet;

/// Static description of one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub ty: AttrType,
    pub primary_key: bool,
    /// Filled in by the store on insert (identity / default)
    pub store_assigned: bool,
    pub nullable: bool,
}

type Getter<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Value) -> std::result::Result<(), Value> + Send + Sync>;

struct Accessor<T> {
    get: Getter<T>,
    set: Setter<T>,
}

/// Descriptor of one entity: attributes in column order plus accessors
pub struct TupleSchema<T> {
    entity: &'static str,
    table: &'static str,
    trash_table: Option<&'static str>,
    attributes: Vec<Attribute>,
    accessors: Vec<Accessor<T>>,
}

impl<T> std::fmt::Debug for TupleSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleSchema")
            .field("entity", &self.entity)
            .field("table", &self.table)
            .field("trash_table", &self.trash_table)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl<T: 'static> TupleSchema<T> {
    /// Start describing `entity`, persisted in `table`
    pub fn builder(entity: &'static str, table: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder {
            entity,
            table,
            trash_table: None,
            attributes: Vec::new(),
            accessors: Vec::new(),
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Parallel table receiving retired rows, if the entity has one
    pub fn trash_table(&self) -> Option<&'static str> {
        self.trash_table
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_names(&self) -> Vec<&'static str> {
        self.attributes.iter().map(|a| a.name).collect()
    }

    /// Case-insensitive attribute lookup
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.index_of(name).map(|i| &self.attributes[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// # Errors
    ///
    /// Returns an Expression error for an unknown attribute.
    pub fn type_of(&self, name: &str) -> Result<AttrType> {
        self.attribute(name)
            .map(|a| a.ty)
            .ok_or_else(|| self.unknown(name))
    }

    pub fn primary_key(&self) -> impl Iterator<Item = (usize, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.primary_key)
    }

    /// Read one attribute by name
    ///
    /// # Errors
    ///
    /// Returns an Expression error for an unknown attribute.
    pub fn get(&self, row: &T, name: &str) -> Result<Value> {
        let index = self.index_of(name).ok_or_else(|| self.unknown(name))?;
        Ok(self.get_at(row, index))
    }

    pub fn get_at(&self, row: &T, index: usize) -> Value {
        (self.accessors[index].get)(row)
    }

    /// Write one attribute by position
    ///
    /// # Errors
    ///
    /// Returns a Persistence error when the value's type does not fit the
    /// attribute.
    pub fn set_at(&self, row: &mut T, index: usize, value: Value) -> Result<()> {
        (self.accessors[index].set)(row, value).map_err(|rejected| {
            RepoError::new(RepoErrorKind::Persistence).with_message(format!(
                "{}.{} ({}) cannot hold {:?}",
                self.entity, self.attributes[index].name, self.attributes[index].ty, rejected
            ))
        })
    }

    /// All attribute values in column order
    pub fn values(&self, row: &T) -> Vec<Value> {
        self.accessors.iter().map(|a| (a.get)(row)).collect()
    }

    fn unknown(&self, name: &str) -> RepoError {
        RepoError::new(RepoErrorKind::Expression)
            .with_message(format!("{} has no attribute '{}'", self.entity, name))
    }
}

/// Incremental construction of a [`TupleSchema`]
pub struct SchemaBuilder<T> {
    entity: &'static str,
    table: &'static str,
    trash_table: Option<&'static str>,
    attributes: Vec<Attribute>,
    accessors: Vec<Accessor<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Register the next attribute with its field accessors
    pub fn field<F: FieldType>(
        mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.attributes.push(Attribute {
            name,
            ty: F::TYPE,
            primary_key: false,
            store_assigned: false,
            nullable: F::NULLABLE,
        });
        self.accessors.push(Accessor {
            get: Box::new(move |row: &T| get(row).to_value()),
            set: Box::new(move |row: &mut T, value: Value| {
                *get_mut(row) = F::from_value(value)?;
                Ok(())
            }),
        });
        self
    }

    /// Mark the last registered attribute as part of the primary key
    pub fn key(mut self) -> Self {
        if let Some(last) = self.attributes.last_mut() {
            last.primary_key = true;
        }
        self
    }

    /// Mark the last registered attribute as store-assigned
    pub fn assigned(mut self) -> Self {
        if let Some(last) = self.attributes.last_mut() {
            last.store_assigned = true;
        }
        self
    }

    pub fn trash(mut self, table: &'static str) -> Self {
        self.trash_table = Some(table);
        self
    }

    /// Finish the descriptor
    ///
    /// # Errors
    ///
    /// Returns a Configuration error for an empty descriptor, a duplicate
    /// attribute name, a missing primary key or a store-assigned attribute
    /// that is neither an identity (Integer/Long) nor a timestamp default.
    pub fn build(self) -> Result<TupleSchema<T>> {
        let config = |message: String| {
            RepoError::new(RepoErrorKind::Configuration)
                .with_op("describe_entity")
                .with_message(message)
        };

        if self.attributes.is_empty() {
            return Err(config(format!("{} declares no attributes", self.entity)));
        }

        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.name.to_ascii_lowercase()) {
                return Err(config(format!(
                    "{} declares attribute '{}' twice",
                    self.entity, attr.name
                )));
            }
            if attr.store_assigned
                && !matches!(
                    attr.ty,
                    AttrType::Integer | AttrType::Long | AttrType::Instant
                )
            {
                return Err(config(format!(
                    "{}.{} is store-assigned but has type {}",
                    self.entity, attr.name, attr.ty
                )));
            }
        }

        if !self.attributes.iter().any(|a| a.primary_key) {
            return Err(config(format!("{} has no primary key", self.entity)));
        }

        Ok(TupleSchema {
            entity: self.entity,
            table: self.table,
            trash_table: self.trash_table,
            attributes: self.attributes,
            accessors: self.accessors,
        })
    }
}
