//! Row store boundary.
//!
//! The client never talks to a cluster directly. Everything it needs (table
//! schemas, row reads and writes, SQL, transactions) goes through the
//! [`RowStore`] trait, and connections are opened by a [`Connector`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ Client/Views │────▶│  RowStore   │────▶│   Cluster    │
//! │              │◀────│  boundary   │◀────│  (endpoints) │
//! └──────────────┘     └─────────────┘     └──────────────┘
//! ```
//!
//! Methods return boxed `Send` futures so that a connection can be shared
//! as `Arc<dyn RowStore>` across tasks. Rows crossing the boundary are
//! `Tuple`s keyed by normalised column names; rows returned by the store
//! always carry every column of the table.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{TrellisError, TrellisResult};
use crate::schema::TableSchema;
use crate::statement::{ResultSet, Statement};
use crate::tuple::Tuple;
use crate::types::TxnId;

/// Boxed future returned by the boundary traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Reads and writes are allowed.
    #[default]
    ReadWrite,
    /// Only reads are allowed.
    ReadOnly,
}

/// Options for starting a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionOptions {
    /// Access mode.
    pub access_mode: AccessMode,
}

impl TransactionOptions {
    /// Options for a read-only transaction.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            access_mode: AccessMode::ReadOnly,
        }
    }

    /// Returns true if writes are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.access_mode == AccessMode::ReadOnly
    }
}

/// A connection to a row store.
///
/// `txn` is `None` for implicit single-operation transactions. Table names
/// are passed normalised.
pub trait RowStore: Send + Sync {
    /// Returns the endpoint this connection is attached to.
    fn endpoint(&self) -> &str;

    /// Fetches the schema of a table.
    ///
    /// Fails with `TableNotFound` if the table does not exist.
    fn table_schema<'a>(&'a self, table: &'a str) -> BoxFuture<'a, TrellisResult<Arc<TableSchema>>>;

    /// Creates a table. Returns false if it existed and `if_not_exists` is set.
    fn create_table(
        &self,
        schema: TableSchema,
        if_not_exists: bool,
    ) -> BoxFuture<'_, TrellisResult<bool>>;

    /// Drops a table. Returns false if it was absent and `if_exists` is set.
    fn drop_table<'a>(&'a self, table: &'a str, if_exists: bool) -> BoxFuture<'a, TrellisResult<bool>>;

    /// Inserts or replaces a row.
    fn upsert_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        row: Tuple,
    ) -> BoxFuture<'a, TrellisResult<()>>;

    /// Inserts a row unless its key exists. Returns true if written.
    fn insert_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        row: Tuple,
    ) -> BoxFuture<'a, TrellisResult<bool>>;

    /// Reads the row with the given key.
    fn get_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        key: Tuple,
    ) -> BoxFuture<'a, TrellisResult<Option<Tuple>>>;

    /// Deletes the row with the given key. Returns true if it existed.
    fn delete_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        key: Tuple,
    ) -> BoxFuture<'a, TrellisResult<bool>>;

    /// Executes a SQL statement.
    fn execute_query(
        &self,
        txn: Option<TxnId>,
        statement: Statement,
    ) -> BoxFuture<'_, TrellisResult<ResultSet>>;

    /// Starts a transaction.
    fn begin(&self, options: TransactionOptions) -> BoxFuture<'_, TrellisResult<TxnId>>;

    /// Commits a transaction.
    fn commit(&self, txn: TxnId) -> BoxFuture<'_, TrellisResult<()>>;

    /// Rolls a transaction back.
    fn rollback(&self, txn: TxnId) -> BoxFuture<'_, TrellisResult<()>>;

    /// Closes the connection. Later calls fail with `Connection`.
    fn close(&self) -> BoxFuture<'_, ()>;

    /// Returns true once the connection is closed.
    fn is_closed(&self) -> bool;
}

/// Opens row store connections.
pub trait Connector: Send + Sync {
    /// Connects to a single endpoint.
    fn connect_endpoint<'a>(
        &'a self,
        endpoint: &'a str,
    ) -> BoxFuture<'a, TrellisResult<Arc<dyn RowStore>>>;

    /// Connects to the first reachable endpoint, trying them in order.
    ///
    /// Fails with `Connection` if the list is empty or no endpoint answers.
    fn connect<'a>(
        &'a self,
        endpoints: &'a [String],
    ) -> BoxFuture<'a, TrellisResult<Arc<dyn RowStore>>> {
        Box::pin(async move {
            let mut failures = Vec::with_capacity(endpoints.len());
            for endpoint in endpoints {
                match self.connect_endpoint(endpoint).await {
                    Ok(store) => return Ok(store),
                    Err(e) => {
                        tracing::debug!(endpoint = %endpoint, error = %e, "endpoint unreachable");
                        failures.push(format!("{endpoint}: {e}"));
                    }
                }
            }
            if failures.is_empty() {
                return Err(TrellisError::connection("no endpoints configured"));
            }
            Err(TrellisError::connection(format!(
                "no reachable endpoint ({})",
                failures.join("; ")
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_options() {
        assert!(!TransactionOptions::default().is_read_only());
        assert!(TransactionOptions::read_only().is_read_only());
        assert_eq!(AccessMode::default(), AccessMode::ReadWrite);
    }
}
