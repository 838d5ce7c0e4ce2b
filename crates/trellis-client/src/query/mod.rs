//! SQL facade.
//!
//! [`Sql::execute`] forwards a [`Statement`] to the row store and returns
//! its [`ResultSet`]: a lazy, finite, non-restartable iterator of tuples.

mod builder;

pub use builder::QueryBuilder;

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use trellis_common::error::TrellisResult;
use trellis_common::statement::{ResultSet, Statement};

use crate::client::Session;
use crate::transaction::{txn_id, Transaction};

/// Entry point for SQL queries.
#[derive(Debug, Clone)]
pub struct Sql {
    session: Arc<Session>,
}

impl Sql {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Executes a statement.
    ///
    /// Accepts anything convertible to a [`Statement`]: a `&str`, a
    /// `Statement` with bound parameters, or a [`QueryBuilder`].
    pub async fn execute(
        &self,
        tx: Option<&Transaction>,
        statement: impl Into<Statement>,
    ) -> TrellisResult<ResultSet> {
        let statement = statement.into();
        debug!(sql = statement.text(), params = statement.params().len(), "executing query");

        let start = Instant::now();
        let result = self
            .session
            .call(self.session.store().execute_query(txn_id(tx), statement))
            .await;
        let elapsed = start.elapsed();

        self.session.record(|s| {
            s.queries_executed += 1;
            s.total_query_time_ms += elapsed.as_millis() as u64;
        });
        result
    }

    /// Starts a query builder.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new()
    }
}
