//! Storage engine shared by every endpoint of a cluster.
//!
//! `Database` owns the table catalog, the row data and the transaction
//! manager. It is synchronous; the async boundary lives in
//! [`crate::cluster`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::TableSchema;
use trellis_common::statement::{ResultSet, Statement};
use trellis_common::store::TransactionOptions;
use trellis_common::tuple::Tuple;
use trellis_common::types::{TxnId, Value};

use crate::query::SelectPlan;
use crate::table::TableStore;
use crate::txn::{RowChange, TransactionManager};

/// In-memory database: tables plus transactions.
#[derive(Debug, Default)]
pub struct Database {
    tables: RwLock<HashMap<String, TableStore>>,
    txns: TransactionManager,
}

impl Database {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transaction manager.
    pub fn transactions(&self) -> &TransactionManager {
        &self.txns
    }

    // =========================================================================
    // DDL Operations
    // =========================================================================

    /// Creates a table.
    ///
    /// Returns false if the table exists and `if_not_exists` is set.
    pub fn create_table(&self, schema: TableSchema, if_not_exists: bool) -> TrellisResult<bool> {
        let mut tables = self.tables.write();
        if tables.contains_key(schema.name()) {
            if if_not_exists {
                return Ok(false);
            }
            return Err(TrellisError::TableExists {
                table: schema.name().to_string(),
            });
        }
        debug!(table = schema.name(), columns = schema.len(), "creating table");
        let name = schema.name().to_string();
        tables.insert(name, TableStore::new(Arc::new(schema)));
        Ok(true)
    }

    /// Drops a table.
    ///
    /// Returns false if the table is absent and `if_exists` is set.
    pub fn drop_table(&self, name: &str, if_exists: bool) -> TrellisResult<bool> {
        if self.tables.write().remove(name).is_some() {
            debug!(table = name, "dropped table");
            return Ok(true);
        }
        if if_exists {
            Ok(false)
        } else {
            Err(TrellisError::TableNotFound {
                table: name.to_string(),
            })
        }
    }

    /// Returns the schema of a table.
    pub fn table_schema(&self, name: &str) -> TrellisResult<Arc<TableSchema>> {
        self.tables
            .read()
            .get(name)
            .map(|t| Arc::clone(t.schema()))
            .ok_or_else(|| not_found(name))
    }

    /// Lists all table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of committed rows of a table.
    pub fn row_count(&self, name: &str) -> TrellisResult<usize> {
        self.tables
            .read()
            .get(name)
            .map(TableStore::len)
            .ok_or_else(|| not_found(name))
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Inserts or replaces a row.
    pub fn upsert(&self, txn: Option<TxnId>, table: &str, row: &Tuple) -> TrellisResult<()> {
        match txn {
            None => {
                let mut tables = self.tables.write();
                let store = tables.get_mut(table).ok_or_else(|| not_found(table))?;
                let (key, values) = store.encoder().encode_row(row)?;
                store.put(key, values);
                Ok(())
            }
            Some(txn_id) => {
                let tables = self.tables.read();
                let store = tables.get(table).ok_or_else(|| not_found(table))?;
                let (key, values) = store.encoder().encode_row(row)?;
                self.txns
                    .with_txn(txn_id, |t| t.buffer(table, store.schema(), key, Some(values)))
            }
        }
    }

    /// Inserts a row unless its key exists. Returns true if written.
    pub fn insert(&self, txn: Option<TxnId>, table: &str, row: &Tuple) -> TrellisResult<bool> {
        match txn {
            None => {
                let mut tables = self.tables.write();
                let store = tables.get_mut(table).ok_or_else(|| not_found(table))?;
                let (key, values) = store.encoder().encode_row(row)?;
                if store.get(&key).is_some() {
                    return Ok(false);
                }
                store.put(key, values);
                Ok(true)
            }
            Some(txn_id) => {
                let tables = self.tables.read();
                let store = tables.get(table).ok_or_else(|| not_found(table))?;
                let (key, values) = store.encoder().encode_row(row)?;
                self.txns.with_txn(txn_id, |t| {
                    t.ensure_writable()?;
                    let exists = match t.buffered(table, &key) {
                        Some(change) => change.is_some(),
                        None => store.get(&key).is_some(),
                    };
                    if exists {
                        return Ok(false);
                    }
                    t.buffer(table, store.schema(), key, Some(values))?;
                    Ok(true)
                })
            }
        }
    }

    /// Reads a row by key.
    pub fn get(&self, txn: Option<TxnId>, table: &str, key: &Tuple) -> TrellisResult<Option<Tuple>> {
        let tables = self.tables.read();
        let store = tables.get(table).ok_or_else(|| not_found(table))?;
        let row_key = store.encoder().encode_key(key)?;

        let change: Option<RowChange> = match txn {
            None => None,
            Some(txn_id) => self
                .txns
                .with_txn(txn_id, |t| Ok(t.buffered(table, &row_key).cloned()))?,
        };

        let values = match change {
            Some(buffered) => buffered,
            None => store.get(&row_key).cloned(),
        };
        Ok(values.map(|v| store.encoder().decode(&v)))
    }

    /// Deletes a row by key. Returns true if it existed.
    pub fn delete(&self, txn: Option<TxnId>, table: &str, key: &Tuple) -> TrellisResult<bool> {
        match txn {
            None => {
                let mut tables = self.tables.write();
                let store = tables.get_mut(table).ok_or_else(|| not_found(table))?;
                let row_key = store.encoder().encode_key(key)?;
                Ok(store.delete(&row_key))
            }
            Some(txn_id) => {
                let tables = self.tables.read();
                let store = tables.get(table).ok_or_else(|| not_found(table))?;
                let row_key = store.encoder().encode_key(key)?;
                self.txns.with_txn(txn_id, |t| {
                    t.ensure_writable()?;
                    let existed = match t.buffered(table, &row_key) {
                        Some(change) => change.is_some(),
                        None => store.get(&row_key).is_some(),
                    };
                    if existed {
                        t.buffer(table, store.schema(), row_key, None)?;
                    }
                    Ok(existed)
                })
            }
        }
    }

    /// Returns the rows of a table as seen by `txn`, in key order.
    fn scan(&self, txn: Option<TxnId>, table: &str) -> TrellisResult<Vec<Vec<Value>>> {
        let tables = self.tables.read();
        let store = tables.get(table).ok_or_else(|| not_found(table))?;
        let mut rows = store.snapshot();
        if let Some(txn_id) = txn {
            self.txns.with_txn(txn_id, |t| {
                t.overlay(table, &mut rows);
                Ok(())
            })?;
        }
        Ok(rows.into_values().collect())
    }

    /// Executes a `SELECT` statement.
    pub fn query(&self, txn: Option<TxnId>, statement: &Statement) -> TrellisResult<ResultSet> {
        let plan = SelectPlan::parse(statement, |name| self.table_schema(name))?;
        let rows = self.scan(txn, plan.table())?;
        debug!(table = plan.table(), scanned = rows.len(), "executing query");
        Ok(plan.execute(rows))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Begins a transaction.
    pub fn begin(&self, options: TransactionOptions) -> TxnId {
        let txn_id = self.txns.begin(options);
        debug!(txn = %txn_id, read_only = options.is_read_only(), "transaction started");
        txn_id
    }

    /// Commits a transaction, applying its writes atomically.
    ///
    /// If a table written by the transaction was dropped meanwhile, nothing
    /// is applied and the commit fails with `TableNotFound`; if it was
    /// dropped and recreated, it fails with `ConstraintViolation`.
    pub fn commit(&self, txn_id: TxnId) -> TrellisResult<()> {
        let pending = self.txns.finish_commit(txn_id)?;
        let writes = pending.write_count();

        let mut tables = self.tables.write();
        pending.check_schemas(|name| tables.get(name).map(|t| Arc::clone(t.schema())))?;
        let changes = pending.into_writes();
        for (table, rows) in changes {
            if let Some(store) = tables.get_mut(&table) {
                for (key, change) in rows {
                    store.apply(key, change);
                }
            }
        }
        debug!(txn = %txn_id, writes, "transaction committed");
        Ok(())
    }

    /// Rolls a transaction back.
    pub fn rollback(&self, txn_id: TxnId) -> TrellisResult<()> {
        self.txns.rollback(txn_id)?;
        debug!(txn = %txn_id, "transaction rolled back");
        Ok(())
    }
}

fn not_found(table: &str) -> TrellisError {
    TrellisError::TableNotFound {
        table: table.to_string(),
    }
}
