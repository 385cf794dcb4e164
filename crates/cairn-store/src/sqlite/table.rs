//! Generic table adapter driven by an entity's schema descriptor

#![allow(clippy::result_large_err)]

use super::compiler::compile;
use super::quote;
use super::values::{from_sql, to_sql};
use crate::errors::{from_rusqlite, missing_row, Result};
use cairn_core::adapter::{SortKey, TableAdapter};
use cairn_core::datetime::DateParser;
use cairn_core::errors::{RepoError, RepoErrorKind};
use cairn_core::filter::Expr;
use cairn_core::tuple::{Tuple, TupleSchema, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};

/// `TableAdapter` over one SQLite table holding rows of `T`
pub struct SqliteTable<'c, T: Tuple> {
    conn: &'c Connection,
    schema: &'static TupleSchema<T>,
    table: &'static str,
    dates: &'c DateParser,
}

impl<'c, T: Tuple> SqliteTable<'c, T> {
    pub fn new(
        conn: &'c Connection,
        schema: &'static TupleSchema<T>,
        table: &'static str,
        dates: &'c DateParser,
    ) -> Self {
        Self {
            conn,
            schema,
            table,
            dates,
        }
    }

    fn column_list(&self) -> String {
        self.schema
            .attributes()
            .iter()
            .map(|a| quote(a.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn read_row(&self, row: &Row<'_>) -> Result<T> {
        let mut tuple = T::default();
        for (index, attr) in self.schema.attributes().iter().enumerate() {
            let raw: SqlValue = row.get(index).map_err(from_rusqlite)?;
            let value = from_sql(raw, attr.ty, attr.name)?;
            self.schema.set_at(&mut tuple, index, value)?;
        }
        Ok(tuple)
    }

    /// `"k1" = ?n AND "k2" = ?n+1 ...` with its parameters
    fn key_clause(&self, row: &T, first_param: usize) -> (String, Vec<SqlValue>) {
        let mut terms = Vec::new();
        let mut params = Vec::new();
        for (index, attr) in self.schema.primary_key() {
            params.push(to_sql(&self.schema.get_at(row, index)));
            terms.push(format!("{} = ?{}", quote(attr.name), first_param + params.len() - 1));
        }
        (terms.join(" AND "), params)
    }

    fn describe_key(&self, row: &T) -> String {
        self.schema
            .primary_key()
            .map(|(index, attr)| format!("{}={:?}", attr.name, self.schema.get_at(row, index)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn exists(&self, row: &T) -> Result<bool> {
        let (clause, params) = self.key_clause(row, 1);
        let sql = format!("SELECT 1 FROM {} WHERE {} LIMIT 1", quote(self.table), clause);
        let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
        stmt.exists(params_from_iter(params.iter()))
            .map_err(from_rusqlite)
    }

    fn has_unassigned_key(&self, row: &T) -> bool {
        self.schema
            .primary_key()
            .any(|(index, attr)| attr.store_assigned && self.schema.get_at(row, index).is_unassigned())
    }

    fn order_clause(&self, sort: &[SortKey]) -> Result<String> {
        let mut terms = Vec::with_capacity(sort.len());
        for key in sort {
            let attr = self.schema.attribute(&key.attribute).ok_or_else(|| {
                RepoError::new(RepoErrorKind::Expression).with_message(format!(
                    "cannot sort {} by unknown attribute '{}'",
                    self.schema.entity(),
                    key.attribute
                ))
            })?;
            let direction = if key.descending { "DESC" } else { "ASC" };
            terms.push(format!("{} {}", quote(attr.name), direction));
        }
        Ok(terms.join(", "))
    }
}

impl<T: Tuple> TableAdapter<T> for SqliteTable<'_, T> {
    fn apply_selection(
        &self,
        filter: Option<&Expr<T>>,
        sort: &[SortKey],
        limit: Option<usize>,
        visitor: &mut dyn FnMut(T) -> Result<bool>,
    ) -> Result<usize> {
        let mut sql = format!("SELECT {} FROM {}", self.column_list(), quote(self.table));
        let mut params = Vec::new();
        if let Some(expr) = filter {
            let compiled = compile(expr, self.dates)?;
            sql.push_str(" WHERE ");
            sql.push_str(&compiled.sql);
            params = compiled.params;
        }
        if !sort.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_clause(sort)?);
        }
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        tracing::debug!(table = self.table, sql = %sql, "select");

        let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(from_rusqlite)?;

        let mut delivered = 0;
        while let Some(row) = rows.next().map_err(from_rusqlite)? {
            let tuple = self.read_row(row)?;
            delivered += 1;
            if !visitor(tuple)? {
                break;
            }
        }
        Ok(delivered)
    }

    fn insert(&self, row: &mut T) -> Result<()> {
        let values = self.schema.values(row);
        let mut columns = Vec::new();
        let mut params = Vec::new();
        let mut reread = false;

        for (attr, value) in self.schema.attributes().iter().zip(values.iter()) {
            if attr.store_assigned && value.is_unassigned() {
                reread = true;
                continue;
            }
            columns.push(quote(attr.name));
            params.push(to_sql(value));
        }

        let placeholders = (1..=params.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(self.table),
            columns.join(", "),
            placeholders
        );
        self.conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(from_rusqlite)?;

        if reread {
            let rowid = self.conn.last_insert_rowid();
            let sql = format!(
                "SELECT {} FROM {} WHERE rowid = ?1",
                self.column_list(),
                quote(self.table)
            );
            let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
            let mut rows = stmt.query([rowid]).map_err(from_rusqlite)?;
            match rows.next().map_err(from_rusqlite)? {
                Some(r) => *row = self.read_row(r)?,
                None => return Err(missing_row(self.schema.entity(), &format!("rowid={}", rowid))),
            }
        }
        Ok(())
    }

    fn insert_if_new(&self, row: &mut T) -> Result<bool> {
        if !self.has_unassigned_key(row) && self.exists(row)? {
            return Ok(false);
        }
        self.insert(row)?;
        Ok(true)
    }

    fn update(&self, row: &T) -> Result<()> {
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (index, attr) in self.schema.attributes().iter().enumerate() {
            if attr.primary_key {
                continue;
            }
            params.push(to_sql(&self.schema.get_at(row, index)));
            assignments.push(format!("{} = ?{}", quote(attr.name), params.len()));
        }

        if assignments.is_empty() {
            // Key-only entity: nothing to overwrite, but the row must exist
            return if self.exists(row)? {
                Ok(())
            } else {
                Err(missing_row(self.schema.entity(), &self.describe_key(row)))
            };
        }

        let (clause, key_params) = self.key_clause(row, params.len() + 1);
        params.extend(key_params);
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote(self.table),
            assignments.join(", "),
            clause
        );
        let changed = self
            .conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(missing_row(self.schema.entity(), &self.describe_key(row)));
        }
        Ok(())
    }

    fn delete(&self, row: &T) -> Result<()> {
        let (clause, params) = self.key_clause(row, 1);
        let sql = format!("DELETE FROM {} WHERE {}", quote(self.table), clause);
        let changed = self
            .conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(missing_row(self.schema.entity(), &self.describe_key(row)));
        }
        Ok(())
    }
}
