//! Client connection management.
//!
//! Provides the main `Client` struct. A client holds one row store
//! connection, picked from the configured endpoints at connect time, and
//! hands out the table registry, catalog, SQL facade and transactions that
//! share it.

mod config;
mod session;

pub use config::ClientConfig;
pub use session::ClientStats;
pub(crate) use session::Session;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::store::{BoxFuture, Connector, RowStore, TransactionOptions};

use crate::catalog::Catalog;
use crate::error::ConnectionState;
use crate::query::Sql;
use crate::table::Tables;
use crate::transaction::Transaction;

/// Trellis client.
pub struct Client {
    config: ClientConfig,
    session: Arc<Session>,
    tables: Tables,
}

impl Client {
    /// Connects to the first reachable configured endpoint.
    ///
    /// Endpoints are tried in order, each bounded by the connect timeout.
    /// Fails with `InvalidConfig` for an unusable configuration and with
    /// `Connection` when no endpoint can be reached.
    pub async fn connect(config: ClientConfig, connector: &dyn Connector) -> TrellisResult<Self> {
        config.validate()?;

        let connector = TimedConnector {
            inner: connector,
            timeout: config.connect_timeout_duration(),
            stats: Mutex::new(ClientStats::default()),
        };
        let store = connector.connect(&config.endpoints).await?;
        let stats = connector.stats.into_inner();
        info!(
            endpoint = store.endpoint(),
            application = %config.application_name,
            attempts = stats.connection_attempts,
            "connected"
        );

        let session = Arc::new(Session::new(store, config.operation_timeout_duration(), stats));
        let tables = Tables::new(Arc::clone(&session));
        Ok(Self {
            config,
            session,
            tables,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Lists the endpoints this client is connected to.
    pub fn connections(&self) -> Vec<String> {
        vec![self.session.store().endpoint().to_string()]
    }

    /// Returns the connection state.
    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Returns client statistics.
    pub fn stats(&self) -> ClientStats {
        self.session.stats()
    }

    /// Returns how long the connection has been open.
    pub fn connection_duration(&self) -> Duration {
        self.session.connected_at().elapsed()
    }

    /// Returns the schema registry.
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Returns the catalog facade.
    pub fn catalog(&self) -> Catalog {
        Catalog::new(Arc::clone(&self.session), self.tables.clone())
    }

    /// Returns the SQL facade.
    pub fn sql(&self) -> Sql {
        Sql::new(Arc::clone(&self.session))
    }

    /// Begins a read-write transaction.
    pub async fn begin(&self) -> TrellisResult<Transaction> {
        self.begin_with(TransactionOptions::default()).await
    }

    /// Begins a transaction with explicit options.
    pub async fn begin_with(&self, options: TransactionOptions) -> TrellisResult<Transaction> {
        Transaction::begin(Arc::clone(&self.session), options).await
    }

    /// Closes the connection. Handles derived from this client fail with
    /// `Connection` afterwards.
    pub async fn close(&self) {
        self.session.close().await;
        info!(endpoint = self.session.store().endpoint(), "connection closed");
    }
}

/// Bounds each endpoint attempt by the connect timeout and counts attempts.
struct TimedConnector<'c> {
    inner: &'c dyn Connector,
    timeout: Duration,
    stats: Mutex<ClientStats>,
}

impl Connector for TimedConnector<'_> {
    fn connect_endpoint<'a>(
        &'a self,
        endpoint: &'a str,
    ) -> BoxFuture<'a, TrellisResult<Arc<dyn RowStore>>> {
        Box::pin(async move {
            self.stats.lock().connection_attempts += 1;
            let result = match tokio::time::timeout(self.timeout, self.inner.connect_endpoint(endpoint)).await {
                Ok(result) => result,
                Err(_) => Err(TrellisError::Timeout {
                    duration_ms: self.timeout.as_millis() as u64,
                }),
            };
            if let Err(e) = &result {
                warn!(endpoint, error = %e, "endpoint unavailable");
                self.stats.lock().connection_failures += 1;
            }
            result
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoints", &self.config.endpoints)
            .field("connected_to", &self.session.store().endpoint())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::store::{BoxFuture, RowStore};
    use trellis_store::MemoryCluster;

    use crate::testing::{connect, MusicStore};

    /// Connector whose endpoints never answer.
    struct Silent;

    impl Connector for Silent {
        fn connect_endpoint<'a>(
            &'a self,
            _endpoint: &'a str,
        ) -> BoxFuture<'a, TrellisResult<Arc<dyn RowStore>>> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn test_connect_fails_over() {
        let cluster = MemoryCluster::with_default_endpoints();
        cluster.set_reachable("localhost:10800", false);

        let client = Client::connect(ClientConfig::default(), &cluster).await.unwrap();
        assert_eq!(client.connections(), vec!["localhost:10801".to_string()]);
        assert_eq!(client.state(), ConnectionState::Connected);

        let stats = client.stats();
        assert_eq!(stats.connection_attempts, 2);
        assert_eq!(stats.connection_failures, 1);
    }

    #[tokio::test]
    async fn test_connect_without_reachable_endpoint() {
        let cluster = MemoryCluster::with_default_endpoints();
        for endpoint in cluster.endpoints() {
            cluster.set_reachable(&endpoint, false);
        }
        let err = Client::connect(ClientConfig::default(), &cluster).await.unwrap_err();
        assert!(matches!(err, TrellisError::Connection { .. }));
        assert!(err.to_string().contains("localhost:10802"));

        let unknown = ClientConfig::new().endpoints(["elsewhere:1"]);
        assert!(matches!(
            Client::connect(unknown, &cluster).await,
            Err(TrellisError::Connection { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let cluster = MemoryCluster::with_default_endpoints();
        let config = ClientConfig::new().endpoints(Vec::<String>::new());
        assert!(matches!(
            Client::connect(config, &cluster).await,
            Err(TrellisError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_timeout_is_connection_error() {
        let config = ClientConfig::new()
            .endpoints(["a:1", "b:2"])
            .connect_timeout(Duration::from_millis(50));
        let err = Client::connect(config, &Silent).await.unwrap_err();
        assert!(matches!(err, TrellisError::Connection { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_state_follows_endpoint_health() {
        let (cluster, client) = connect(MusicStore::Empty).await;
        let tables = client.tables().clone();

        cluster.set_reachable("node:1", false);
        assert!(matches!(
            tables.refresh("Artist").await,
            Err(TrellisError::Connection { .. })
        ));
        assert_eq!(client.state(), ConnectionState::Failed);

        cluster.set_reachable("node:1", true);
        tables.refresh("Artist").await.unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_close() {
        let (_cluster, client) = connect(MusicStore::Empty).await;
        let sql = client.sql();
        client.close().await;
        client.close().await;

        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(matches!(
            sql.execute(None, "SELECT * FROM Artist").await,
            Err(TrellisError::Connection { .. })
        ));
    }
}
