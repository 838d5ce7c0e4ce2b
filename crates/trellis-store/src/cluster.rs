//! In-memory cluster for tests and demos.
//!
//! A `MemoryCluster` is a set of named endpoints in front of one shared
//! [`Database`]. Endpoints can be marked unreachable to simulate node
//! failures; connections to an unreachable endpoint fail with `Connection`,
//! both when connecting and on every later call.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use trellis_common::constants::DEFAULT_ENDPOINTS;
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::TableSchema;
use trellis_common::statement::{ResultSet, Statement};
use trellis_common::store::{BoxFuture, Connector, RowStore, TransactionOptions};
use trellis_common::tuple::Tuple;
use trellis_common::types::TxnId;

use crate::engine::Database;

/// State of one endpoint.
#[derive(Debug)]
struct Node {
    reachable: AtomicBool,
    connections: AtomicU64,
}

/// State shared by the cluster handle and its connections.
#[derive(Debug, Default)]
struct Shared {
    database: Database,
    nodes: DashMap<String, Node>,
}

impl Shared {
    fn is_reachable(&self, endpoint: &str) -> bool {
        self.nodes
            .get(endpoint)
            .is_some_and(|n| n.reachable.load(Ordering::Acquire))
    }
}

/// A shared in-process cluster.
///
/// Cloning the handle shares the cluster.
///
/// # Example
///
/// ```rust
/// use trellis_store::MemoryCluster;
///
/// let cluster = MemoryCluster::with_default_endpoints();
/// cluster.set_reachable("localhost:10800", false);
/// assert!(!cluster.is_reachable("localhost:10800"));
/// assert!(cluster.is_reachable("localhost:10801"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    shared: Arc<Shared>,
}

impl MemoryCluster {
    /// Creates a cluster with the given endpoints, all reachable.
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cluster = Self::default();
        for endpoint in endpoints {
            cluster.add_endpoint(endpoint);
        }
        cluster
    }

    /// Creates a cluster listening on the default local endpoints.
    pub fn with_default_endpoints() -> Self {
        Self::new(DEFAULT_ENDPOINTS)
    }

    /// Adds a reachable endpoint.
    pub fn add_endpoint(&self, endpoint: impl Into<String>) {
        self.shared.nodes.insert(
            endpoint.into(),
            Node {
                reachable: AtomicBool::new(true),
                connections: AtomicU64::new(0),
            },
        );
    }

    /// Marks an endpoint reachable or not. Returns false for unknown
    /// endpoints.
    pub fn set_reachable(&self, endpoint: &str, reachable: bool) -> bool {
        match self.shared.nodes.get(endpoint) {
            Some(node) => {
                node.reachable.store(reachable, Ordering::Release);
                info!(endpoint, reachable, "endpoint reachability changed");
                true
            }
            None => false,
        }
    }

    /// Returns true if the endpoint exists and is reachable.
    pub fn is_reachable(&self, endpoint: &str) -> bool {
        self.shared.is_reachable(endpoint)
    }

    /// Lists all endpoints, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self.shared.nodes.iter().map(|e| e.key().clone()).collect();
        endpoints.sort();
        endpoints
    }

    /// Returns how many connections were opened to an endpoint.
    pub fn connection_count(&self, endpoint: &str) -> u64 {
        self.shared
            .nodes
            .get(endpoint)
            .map_or(0, |n| n.connections.load(Ordering::Relaxed))
    }

    /// Returns the shared database, for seeding and inspection.
    pub fn database(&self) -> &Database {
        &self.shared.database
    }
}

impl Connector for MemoryCluster {
    fn connect_endpoint<'a>(
        &'a self,
        endpoint: &'a str,
    ) -> BoxFuture<'a, TrellisResult<Arc<dyn RowStore>>> {
        Box::pin(async move {
            let Some(node) = self.shared.nodes.get(endpoint) else {
                return Err(TrellisError::connection(format!("unknown endpoint {endpoint}")));
            };
            if !node.reachable.load(Ordering::Acquire) {
                return Err(TrellisError::connection(format!("{endpoint} is unreachable")));
            }
            node.connections.fetch_add(1, Ordering::Relaxed);
            drop(node);

            debug!(endpoint, "connected");
            let connection: Arc<dyn RowStore> = Arc::new(MemoryConnection {
                endpoint: endpoint.to_string(),
                shared: Arc::clone(&self.shared),
                closed: AtomicBool::new(false),
            });
            Ok(connection)
        })
    }
}

/// A connection to one endpoint of a [`MemoryCluster`].
#[derive(Debug)]
pub struct MemoryConnection {
    endpoint: String,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn check(&self) -> TrellisResult<&Database> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TrellisError::connection(format!(
                "connection to {} is closed",
                self.endpoint
            )));
        }
        if !self.shared.is_reachable(&self.endpoint) {
            return Err(TrellisError::connection(format!(
                "lost connection to {}",
                self.endpoint
            )));
        }
        Ok(&self.shared.database)
    }
}

impl RowStore for MemoryConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn table_schema<'a>(&'a self, table: &'a str) -> BoxFuture<'a, TrellisResult<Arc<TableSchema>>> {
        Box::pin(async move { self.check()?.table_schema(table) })
    }

    fn create_table(
        &self,
        schema: TableSchema,
        if_not_exists: bool,
    ) -> BoxFuture<'_, TrellisResult<bool>> {
        Box::pin(async move { self.check()?.create_table(schema, if_not_exists) })
    }

    fn drop_table<'a>(&'a self, table: &'a str, if_exists: bool) -> BoxFuture<'a, TrellisResult<bool>> {
        Box::pin(async move { self.check()?.drop_table(table, if_exists) })
    }

    fn upsert_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        row: Tuple,
    ) -> BoxFuture<'a, TrellisResult<()>> {
        Box::pin(async move { self.check()?.upsert(txn, table, &row) })
    }

    fn insert_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        row: Tuple,
    ) -> BoxFuture<'a, TrellisResult<bool>> {
        Box::pin(async move { self.check()?.insert(txn, table, &row) })
    }

    fn get_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        key: Tuple,
    ) -> BoxFuture<'a, TrellisResult<Option<Tuple>>> {
        Box::pin(async move { self.check()?.get(txn, table, &key) })
    }

    fn delete_row<'a>(
        &'a self,
        txn: Option<TxnId>,
        table: &'a str,
        key: Tuple,
    ) -> BoxFuture<'a, TrellisResult<bool>> {
        Box::pin(async move { self.check()?.delete(txn, table, &key) })
    }

    fn execute_query(
        &self,
        txn: Option<TxnId>,
        statement: Statement,
    ) -> BoxFuture<'_, TrellisResult<ResultSet>> {
        Box::pin(async move { self.check()?.query(txn, &statement) })
    }

    fn begin(&self, options: TransactionOptions) -> BoxFuture<'_, TrellisResult<TxnId>> {
        Box::pin(async move { Ok(self.check()?.begin(options)) })
    }

    fn commit(&self, txn: TxnId) -> BoxFuture<'_, TrellisResult<()>> {
        Box::pin(async move { self.check()?.commit(txn) })
    }

    fn rollback(&self, txn: TxnId) -> BoxFuture<'_, TrellisResult<()>> {
        Box::pin(async move { self.check()?.rollback(txn) })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::AcqRel) {
                debug!(endpoint = %self.endpoint, "connection closed");
            }
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::schema::ColumnSchema;
    use trellis_common::types::{DataType, Value};

    fn person() -> TableSchema {
        TableSchema::builder("Person2")
            .column(ColumnSchema::new("ID", DataType::Int32))
            .column(ColumnSchema::new("NAME", DataType::String).nullable(true))
            .primary_key(&["ID"])
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_skips_unreachable() {
        let cluster = MemoryCluster::with_default_endpoints();
        cluster.set_reachable("localhost:10800", false);

        let endpoints: Vec<String> = DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect();
        let store = cluster.connect(&endpoints).await.unwrap();
        assert_eq!(store.endpoint(), "localhost:10801");
        assert_eq!(cluster.connection_count("localhost:10801"), 1);
        assert_eq!(cluster.connection_count("localhost:10800"), 0);
    }

    #[tokio::test]
    async fn test_connect_fails_when_nothing_reachable() {
        let cluster = MemoryCluster::new(["a:1"]);
        cluster.set_reachable("a:1", false);
        let err = cluster
            .connect(&["a:1".to_string(), "b:2".to_string()])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TrellisError::Connection { .. }));

        let err = cluster.connect(&[]).await.err().unwrap();
        assert!(matches!(err, TrellisError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_row_operations_through_connection() {
        let cluster = MemoryCluster::new(["node:1"]);
        let store = cluster.connect_endpoint("node:1").await.unwrap();
        assert!(store.create_table(person(), true).await.unwrap());

        store
            .upsert_row(None, "PERSON2", Tuple::new().set("id", 5).set("name", "Joe"))
            .await
            .unwrap();
        let row = store
            .get_row(None, "PERSON2", Tuple::new().set("id", 5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("Joe")));

        let rs = store
            .execute_query(None, Statement::new("SELECT name FROM Person2 WHERE id = ?").bind(5))
            .await
            .unwrap();
        assert_eq!(rs.columns(), &["NAME".to_string()]);
        assert_eq!(cluster.database().row_count("PERSON2").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lost_and_closed_connection() {
        let cluster = MemoryCluster::new(["node:1"]);
        let store = cluster.connect_endpoint("node:1").await.unwrap();

        cluster.set_reachable("node:1", false);
        assert!(matches!(
            store.table_schema("PERSON2").await,
            Err(TrellisError::Connection { .. })
        ));

        cluster.set_reachable("node:1", true);
        store.close().await;
        assert!(store.is_closed());
        assert!(matches!(
            store.begin(TransactionOptions::default()).await,
            Err(TrellisError::Connection { .. })
        ));
    }
}
