//! Shared connection state.
//!
//! Every handle derived from a [`Client`](super::Client) (tables, views,
//! transactions, the SQL facade) holds an `Arc<Session>`. The session owns
//! the row store connection and wraps each boundary call with the operation
//! timeout, the closed check and connection-state tracking.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::warn;
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::store::{BoxFuture, RowStore};

use crate::error::ConnectionState;

/// Statistics about client usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Total queries executed.
    pub queries_executed: u64,
    /// Total query time.
    pub total_query_time_ms: u64,
    /// Number of transactions.
    pub transactions: u64,
    /// Number of committed transactions.
    pub commits: u64,
    /// Number of rolled back transactions.
    pub rollbacks: u64,
    /// Connection attempts.
    pub connection_attempts: u64,
    /// Connection failures.
    pub connection_failures: u64,
    /// Row store calls that exceeded the operation timeout.
    pub timeouts: u64,
}

pub(crate) struct Session {
    store: Arc<dyn RowStore>,
    operation_timeout: Duration,
    state: RwLock<ConnectionState>,
    stats: RwLock<ClientStats>,
    connected_at: Instant,
}

impl Session {
    pub(crate) fn new(store: Arc<dyn RowStore>, operation_timeout: Duration, stats: ClientStats) -> Self {
        Self {
            store,
            operation_timeout,
            state: RwLock::new(ConnectionState::Connected),
            stats: RwLock::new(stats),
            connected_at: Instant::now(),
        }
    }

    pub(crate) fn store(&self) -> &dyn RowStore {
        self.store.as_ref()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn stats(&self) -> ClientStats {
        self.stats.read().clone()
    }

    pub(crate) fn record(&self, f: impl FnOnce(&mut ClientStats)) {
        f(&mut self.stats.write());
    }

    pub(crate) fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Awaits one boundary call.
    pub(crate) async fn call<T>(&self, op: BoxFuture<'_, TrellisResult<T>>) -> TrellisResult<T> {
        if !self.state().is_open() {
            return Err(TrellisError::connection("client is closed"));
        }

        let result = match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                self.record(|s| s.timeouts += 1);
                warn!(
                    endpoint = self.store.endpoint(),
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "row store call timed out"
                );
                Err(TrellisError::Timeout {
                    duration_ms: self.operation_timeout.as_millis() as u64,
                })
            }
        };

        let mut state = self.state.write();
        if *state != ConnectionState::Closed {
            match &result {
                Err(TrellisError::Connection { .. }) => *state = ConnectionState::Failed,
                Ok(_) => *state = ConnectionState::Connected,
                Err(_) => {}
            }
        }
        result
    }

    /// Closes the connection. Idempotent.
    pub(crate) async fn close(&self) {
        {
            let mut state = self.state.write();
            if *state == ConnectionState::Closed {
                return;
            }
            *state = ConnectionState::Closed;
        }
        self.store.close().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.store.endpoint())
            .field("state", &self.state())
            .finish()
    }
}
