//! Row encoding and decoding.
//!
//! Converts between `Tuple`s arriving over the boundary and the positional
//! form kept in table storage.
//!
//! # Storage Format
//!
//! ## Key
//! The primary key values in primary key order, compared column by column
//! with `Value::total_cmp`.
//!
//! ## Row
//! One value per schema column, in declaration order. Absent value columns
//! are stored as NULL.

use std::cmp::Ordering;
use std::sync::Arc;

use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::TableSchema;
use trellis_common::tuple::Tuple;
use trellis_common::types::Value;

/// Encoded primary key.
#[derive(Debug, Clone)]
pub struct RowKey(Vec<Value>);

impl RowKey {
    /// Returns the key values in primary key order.
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RowKey {}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(&other.0) {
            match a.total_cmp(b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

/// Encodes and decodes rows of one table.
#[derive(Debug, Clone)]
pub struct RowEncoder {
    schema: Arc<TableSchema>,
}

impl RowEncoder {
    /// Creates an encoder for the given schema.
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self { schema }
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    fn mismatch(&self, column: &str, reason: &str) -> TrellisError {
        TrellisError::SchemaMismatch {
            table: self.schema.name().to_string(),
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }

    fn incomplete(&self, column: &str) -> TrellisError {
        TrellisError::KeyIncomplete {
            table: self.schema.name().to_string(),
            column: column.to_string(),
        }
    }

    /// Encodes a full row.
    ///
    /// Every column of the tuple must exist in the schema and every key
    /// column must be present and non-null. Values are checked and widened
    /// to their column types.
    pub fn encode_row(&self, row: &Tuple) -> TrellisResult<(RowKey, Vec<Value>)> {
        let table = self.schema.name();
        if let Some(unknown) = row.keys().find(|c| self.schema.column(c).is_none()) {
            return Err(self.mismatch(unknown, "not a column of the table"));
        }

        let mut values = Vec::with_capacity(self.schema.len());
        for column in self.schema.columns() {
            let value = match row.column(&column.name) {
                Some(v) if column.is_key() && v.is_null() => {
                    return Err(self.incomplete(&column.name))
                }
                Some(v) => v.clone(),
                None if column.is_key() => return Err(self.incomplete(&column.name)),
                None => Value::Null,
            };
            values.push(column.admit(table, value)?);
        }

        let key = self.key_of(&values);
        Ok((key, values))
    }

    /// Encodes a key-only tuple.
    pub fn encode_key(&self, key: &Tuple) -> TrellisResult<RowKey> {
        let table = self.schema.name();
        for name in key.keys() {
            match self.schema.column(name) {
                None => return Err(self.mismatch(name, "not a column of the table")),
                Some(c) if !c.is_key() => return Err(self.mismatch(name, "not a key column")),
                Some(_) => {}
            }
        }

        let mut values = Vec::with_capacity(self.schema.primary_key().len());
        for column in self.schema.key_columns() {
            match key.column(&column.name) {
                Some(v) if !v.is_null() => values.push(column.admit(table, v.clone())?),
                _ => return Err(self.incomplete(&column.name)),
            }
        }
        Ok(RowKey(values))
    }

    /// Extracts the key of a stored row.
    pub fn key_of(&self, values: &[Value]) -> RowKey {
        RowKey(
            self.schema
                .primary_key()
                .iter()
                .map(|&i| values[i].clone())
                .collect(),
        )
    }

    /// Decodes a stored row into a tuple carrying every column.
    pub fn decode(&self, values: &[Value]) -> Tuple {
        let mut tuple = Tuple::with_capacity(values.len());
        for (column, value) in self.schema.columns().iter().zip(values) {
            tuple.insert_column(column.name.clone(), value.clone());
        }
        tuple
    }
}
