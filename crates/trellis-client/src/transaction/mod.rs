//! Transaction handle for explicit transaction control.
//!
//! A [`Transaction`] wraps a store-issued [`TxnId`] and is passed as
//! `Option<&Transaction>` to every view and SQL operation; `None` runs the
//! operation in its own implicit transaction. A handle dropped without
//! `commit` or `rollback` schedules a rollback on the current tokio runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};
use trellis_common::error::TrellisResult;
use trellis_common::store::TransactionOptions;
use trellis_common::types::TxnId;

use crate::client::Session;

/// A transaction handle.
///
/// Provides RAII-style transaction management. If the transaction is not
/// explicitly committed, it will be rolled back when dropped.
pub struct Transaction {
    session: Arc<Session>,
    id: TxnId,
    options: TransactionOptions,
    finished: AtomicBool,
}

impl Transaction {
    pub(crate) async fn begin(session: Arc<Session>, options: TransactionOptions) -> TrellisResult<Self> {
        let id = session.call(session.store().begin(options)).await?;
        session.record(|s| s.transactions += 1);
        debug!(txn = %id, read_only = options.is_read_only(), "transaction started");
        Ok(Self {
            session,
            id,
            options,
            finished: AtomicBool::new(false),
        })
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the options the transaction was started with.
    pub fn options(&self) -> TransactionOptions {
        self.options
    }

    /// Returns true if the transaction rejects writes.
    pub fn is_read_only(&self) -> bool {
        self.options.is_read_only()
    }

    /// Returns true if the transaction is still active.
    pub fn is_active(&self) -> bool {
        !self.finished.load(Ordering::Acquire)
    }

    /// Commits the transaction.
    ///
    /// If the commit call fails the handle stays active, and dropping it
    /// rolls the transaction back.
    pub async fn commit(self) -> TrellisResult<()> {
        self.session
            .call(self.session.store().commit(self.id))
            .await?;
        self.finished.store(true, Ordering::Release);
        self.session.record(|s| s.commits += 1);
        debug!(txn = %self.id, "transaction committed");
        Ok(())
    }

    /// Rolls back the transaction.
    pub async fn rollback(self) -> TrellisResult<()> {
        self.session
            .call(self.session.store().rollback(self.id))
            .await?;
        self.finished.store(true, Ordering::Release);
        self.session.record(|s| s.rollbacks += 1);
        debug!(txn = %self.id, "transaction rolled back");
        Ok(())
    }
}

/// Resolves the transaction argument of a view or SQL call.
pub(crate) fn txn_id(tx: Option<&Transaction>) -> Option<TxnId> {
    tx.map(Transaction::id)
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let session = Arc::clone(&self.session);
                handle.spawn(async move {
                    match session.call(session.store().rollback(id)).await {
                        Ok(()) => {
                            session.record(|s| s.rollbacks += 1);
                            debug!(txn = %id, "dropped transaction rolled back");
                        }
                        Err(e) => warn!(txn = %id, error = %e, "rollback of dropped transaction failed"),
                    }
                });
            }
            Err(_) => warn!(txn = %id, "transaction dropped outside a runtime; rollback skipped"),
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("read_only", &self.is_read_only())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use trellis_common::error::TrellisError;
    use trellis_common::store::TransactionOptions;
    use trellis_common::tuple::Tuple;
    use trellis_common::types::Value;

    use crate::testing::{connect, MusicStore};

    fn artist(id: i32, name: &str) -> Tuple {
        Tuple::new().set("artistId", id).set("name", name)
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let (_cluster, client) = connect(MusicStore::Empty).await;
        let view = client.tables().table("Artist").await.unwrap().record_view();
        let key = Tuple::new().set("artistId", 276);

        let tx = client.begin().await.unwrap();
        assert!(tx.is_active());
        view.upsert(Some(&tx), &artist(276, "New Discovery Band")).await.unwrap();

        assert!(view.get(Some(&tx), &key).await.unwrap().is_some());
        assert!(view.get(None, &key).await.unwrap().is_none());

        tx.commit().await.unwrap();
        let row = view.get(None, &key).await.unwrap().unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("New Discovery Band")));

        let stats = client.stats();
        assert_eq!(stats.transactions, 1);
        assert_eq!(stats.commits, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let (_cluster, client) = connect(MusicStore::Seeded).await;
        let view = client.tables().table("Artist").await.unwrap().record_view();
        let key = Tuple::new().set("artistId", 1);

        let tx = client.begin().await.unwrap();
        assert!(view.delete(Some(&tx), &key).await.unwrap());
        view.upsert(Some(&tx), &artist(3, "Aerosmith")).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(view.get(None, &key).await.unwrap().is_some());
        assert!(view.get(None, &Tuple::new().set("artistId", 3)).await.unwrap().is_none());
        assert_eq!(client.stats().rollbacks, 1);
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let (_cluster, client) = connect(MusicStore::Seeded).await;
        let view = client.tables().table("Artist").await.unwrap().record_view();

        let tx = client.begin_with(TransactionOptions::read_only()).await.unwrap();
        assert!(tx.is_read_only());
        assert!(view.get(Some(&tx), &Tuple::new().set("artistId", 2)).await.unwrap().is_some());
        assert!(matches!(
            view.upsert(Some(&tx), &artist(9, "Nope")).await,
            Err(TrellisError::ReadOnlyTransaction { .. })
        ));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (cluster, client) = connect(MusicStore::Empty).await;
        let view = client.tables().table("Artist").await.unwrap().record_view();

        {
            let tx = client.begin().await.unwrap();
            view.upsert(Some(&tx), &artist(5, "Ghost")).await.unwrap();
            assert_eq!(cluster.database().transactions().active_count(), 1);
        }

        for _ in 0..100 {
            if cluster.database().transactions().active_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cluster.database().transactions().active_count(), 0);
        assert!(view.get(None, &Tuple::new().set("artistId", 5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_on_drop() {
        let (cluster, client) = connect(MusicStore::Empty).await;
        let view = client.tables().table("Artist").await.unwrap().record_view();

        let tx = client.begin().await.unwrap();
        view.upsert(Some(&tx), &artist(7, "Lost")).await.unwrap();

        cluster.set_reachable("node:1", false);
        assert!(matches!(tx.commit().await, Err(TrellisError::Connection { .. })));
        cluster.set_reachable("node:1", true);

        for _ in 0..100 {
            if cluster.database().transactions().active_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cluster.database().transactions().active_count(), 0);
        assert!(view.get(None, &Tuple::new().set("artistId", 7)).await.unwrap().is_none());
        assert_eq!(client.stats().commits, 0);
    }
}
