//! Per-table row storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use trellis_common::schema::TableSchema;
use trellis_common::types::Value;

use crate::encoder::{RowEncoder, RowKey};

/// Rows of one table, ordered by primary key.
#[derive(Debug, Clone)]
pub struct TableStore {
    encoder: RowEncoder,
    rows: BTreeMap<RowKey, Vec<Value>>,
}

impl TableStore {
    /// Creates an empty table.
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            encoder: RowEncoder::new(schema),
            rows: BTreeMap::new(),
        }
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Arc<TableSchema> {
        self.encoder.schema()
    }

    /// Returns the row encoder.
    pub fn encoder(&self) -> &RowEncoder {
        &self.encoder
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Gets a row by key.
    pub fn get(&self, key: &RowKey) -> Option<&Vec<Value>> {
        self.rows.get(key)
    }

    /// Inserts or replaces a row, returning the previous one.
    pub fn put(&mut self, key: RowKey, values: Vec<Value>) -> Option<Vec<Value>> {
        self.rows.insert(key, values)
    }

    /// Deletes a row. Returns true if it existed.
    pub fn delete(&mut self, key: &RowKey) -> bool {
        self.rows.remove(key).is_some()
    }

    /// Applies a buffered change: `Some` writes the row, `None` deletes it.
    pub fn apply(&mut self, key: RowKey, change: Option<Vec<Value>>) {
        match change {
            Some(values) => {
                self.rows.insert(key, values);
            }
            None => {
                self.rows.remove(&key);
            }
        }
    }

    /// Returns a copy of all rows in key order.
    pub fn snapshot(&self) -> BTreeMap<RowKey, Vec<Value>> {
        self.rows.clone()
    }
}
