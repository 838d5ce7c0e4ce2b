//! Buffered transactions.
//!
//! Writes made inside a transaction are kept in a per-transaction write
//! set. Reads through the same transaction see those writes first; other
//! readers see nothing until commit, when the whole write set is applied at
//! once.
//!
//! ```text
//! ┌───────┐   begin()   ┌────────┐   commit()   ┌───────────┐
//! │ Start │────────────▶│ Active │─────────────▶│ Committed │
//! └───────┘             └────────┘              └───────────┘
//!                            │      rollback()  ┌────────────┐
//!                            └─────────────────▶│ RolledBack │
//!                                               └────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::TableSchema;
use trellis_common::store::TransactionOptions;
use trellis_common::types::{TxnId, Value};

use crate::encoder::RowKey;

/// Buffered change of one row: `Some` writes it, `None` deletes it.
pub type RowChange = Option<Vec<Value>>;

/// State of an active transaction.
#[derive(Debug)]
pub struct PendingTxn {
    id: TxnId,
    options: TransactionOptions,
    writes: HashMap<String, BTreeMap<RowKey, RowChange>>,
    schemas: HashMap<String, Arc<TableSchema>>,
}

impl PendingTxn {
    fn new(id: TxnId, options: TransactionOptions) -> Self {
        Self {
            id,
            options,
            writes: HashMap::new(),
            schemas: HashMap::new(),
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Fails if the transaction is read-only.
    pub fn ensure_writable(&self) -> TrellisResult<()> {
        if self.options.is_read_only() {
            return Err(TrellisError::ReadOnlyTransaction { txn_id: self.id });
        }
        Ok(())
    }

    /// Returns the buffered change of a row, if any.
    pub fn buffered(&self, table: &str, key: &RowKey) -> Option<&RowChange> {
        self.writes.get(table).and_then(|rows| rows.get(key))
    }

    /// Buffers a change encoded against `schema`.
    ///
    /// All changes of one table must be encoded against the same schema
    /// instance; a table recreated after the first write is rejected.
    pub fn buffer(
        &mut self,
        table: &str,
        schema: &Arc<TableSchema>,
        key: RowKey,
        change: RowChange,
    ) -> TrellisResult<()> {
        self.ensure_writable()?;
        let recorded = self
            .schemas
            .entry(table.to_string())
            .or_insert_with(|| Arc::clone(schema));
        if !Arc::ptr_eq(recorded, schema) {
            return Err(recreated(table));
        }
        self.writes
            .entry(table.to_string())
            .or_default()
            .insert(key, change);
        Ok(())
    }

    /// Applies the buffered changes of a table on top of a snapshot.
    pub fn overlay(&self, table: &str, rows: &mut BTreeMap<RowKey, Vec<Value>>) {
        if let Some(changes) = self.writes.get(table) {
            for (key, change) in changes {
                match change {
                    Some(values) => {
                        rows.insert(key.clone(), values.clone());
                    }
                    None => {
                        rows.remove(key);
                    }
                }
            }
        }
    }

    /// Returns the number of buffered changes.
    pub fn write_count(&self) -> usize {
        self.writes.values().map(BTreeMap::len).sum()
    }

    /// Fails if a written table's current schema is not the one its
    /// changes were encoded against.
    pub fn check_schemas(
        &self,
        current: impl Fn(&str) -> Option<Arc<TableSchema>>,
    ) -> TrellisResult<()> {
        for (table, schema) in &self.schemas {
            match current(table) {
                None => {
                    return Err(TrellisError::TableNotFound {
                        table: table.clone(),
                    })
                }
                Some(now) if !Arc::ptr_eq(&now, schema) => return Err(recreated(table)),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Consumes the transaction, returning its write set.
    pub fn into_writes(self) -> HashMap<String, BTreeMap<RowKey, RowChange>> {
        self.writes
    }
}

fn recreated(table: &str) -> TrellisError {
    TrellisError::ConstraintViolation {
        table: table.to_string(),
        message: "table was recreated after the transaction wrote to it".to_string(),
    }
}

/// Statistics about the transaction manager.
#[derive(Debug, Default)]
pub struct TransactionStats {
    /// Total transactions started.
    pub started: AtomicU64,
    /// Total transactions committed.
    pub committed: AtomicU64,
    /// Total transactions rolled back.
    pub rolled_back: AtomicU64,
}

/// Tracks active transactions.
#[derive(Debug)]
pub struct TransactionManager {
    transactions: RwLock<HashMap<TxnId, Mutex<PendingTxn>>>,
    stats: TransactionStats,
    next_txn_id: AtomicU64,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// Creates a transaction manager.
    pub fn new() -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
            stats: TransactionStats::default(),
            next_txn_id: AtomicU64::new(TxnId::MIN.as_u64()),
        }
    }

    /// Begins a transaction.
    pub fn begin(&self, options: TransactionOptions) -> TxnId {
        let txn_id = TxnId::new(self.next_txn_id.fetch_add(1, AtomicOrdering::SeqCst));
        self.transactions
            .write()
            .insert(txn_id, Mutex::new(PendingTxn::new(txn_id, options)));
        self.stats.started.fetch_add(1, AtomicOrdering::Relaxed);
        txn_id
    }

    /// Runs `f` against an active transaction.
    pub fn with_txn<R>(
        &self,
        txn_id: TxnId,
        f: impl FnOnce(&mut PendingTxn) -> TrellisResult<R>,
    ) -> TrellisResult<R> {
        let txns = self.transactions.read();
        let txn = txns
            .get(&txn_id)
            .ok_or(TrellisError::TransactionNotFound { txn_id })?;
        let mut guard = txn.lock();
        f(&mut guard)
    }

    /// Removes a transaction for commit.
    pub fn finish_commit(&self, txn_id: TxnId) -> TrellisResult<PendingTxn> {
        let txn = self.take(txn_id)?;
        self.stats.committed.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(txn)
    }

    /// Discards a transaction.
    pub fn rollback(&self, txn_id: TxnId) -> TrellisResult<()> {
        self.take(txn_id)?;
        self.stats.rolled_back.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(())
    }

    fn take(&self, txn_id: TxnId) -> TrellisResult<PendingTxn> {
        self.transactions
            .write()
            .remove(&txn_id)
            .map(Mutex::into_inner)
            .ok_or(TrellisError::TransactionNotFound { txn_id })
    }

    /// Returns true if the transaction is active.
    pub fn is_active(&self, txn_id: TxnId) -> bool {
        self.transactions.read().contains_key(&txn_id)
    }

    /// Returns the number of active transactions.
    pub fn active_count(&self) -> usize {
        self.transactions.read().len()
    }

    /// Returns statistics.
    pub fn stats(&self) -> &TransactionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trellis_common::schema::{ColumnSchema, TableSchema};
    use trellis_common::tuple::Tuple;
    use trellis_common::types::DataType;

    use crate::encoder::RowEncoder;

    fn schema() -> Arc<TableSchema> {
        Arc::new(
            TableSchema::builder("t")
                .column(ColumnSchema::new("id", DataType::Int32))
                .primary_key(&["id"])
                .build()
                .unwrap(),
        )
    }

    fn key(id: i32) -> RowKey {
        RowEncoder::new(schema())
            .encode_key(&Tuple::new().set("id", id))
            .unwrap()
    }

    #[test]
    fn test_begin_commit_lifecycle() {
        let mgr = TransactionManager::new();
        let table = schema();
        let txn = mgr.begin(TransactionOptions::default());
        assert!(txn.is_valid());
        assert!(mgr.is_active(txn));

        mgr.with_txn(txn, |t| t.buffer("T", &table, key(1), Some(vec![Value::Int32(1)])))
            .unwrap();
        let pending = mgr.finish_commit(txn).unwrap();
        assert_eq!(pending.write_count(), 1);
        assert!(!mgr.is_active(txn));
        assert!(matches!(
            mgr.rollback(txn),
            Err(TrellisError::TransactionNotFound { .. })
        ));
        assert_eq!(mgr.stats().committed.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let mgr = TransactionManager::new();
        let table = schema();
        let txn = mgr.begin(TransactionOptions::read_only());
        let err = mgr
            .with_txn(txn, |t| t.buffer("T", &table, key(1), None))
            .unwrap_err();
        assert!(matches!(err, TrellisError::ReadOnlyTransaction { .. }));
        mgr.rollback(txn).unwrap();
        assert_eq!(mgr.active_count(), 0);
    }

    #[test]
    fn test_overlay() {
        let mgr = TransactionManager::new();
        let table = schema();
        let txn = mgr.begin(TransactionOptions::default());
        mgr.with_txn(txn, |t| {
            t.buffer("T", &table, key(1), None)?;
            t.buffer("T", &table, key(2), Some(vec![Value::Int32(2)]))
        })
        .unwrap();

        let mut rows = BTreeMap::new();
        rows.insert(key(1), vec![Value::Int32(1)]);
        mgr.with_txn(txn, |t| {
            t.overlay("T", &mut rows);
            assert!(t.buffered("T", &key(1)).is_some_and(Option::is_none));
            Ok(())
        })
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows.contains_key(&key(2)));
    }

    #[test]
    fn test_buffer_rejects_recreated_table() {
        let mgr = TransactionManager::new();
        let old = schema();
        let txn = mgr.begin(TransactionOptions::default());
        mgr.with_txn(txn, |t| t.buffer("T", &old, key(1), None)).unwrap();

        let new = schema();
        let err = mgr
            .with_txn(txn, |t| t.buffer("T", &new, key(2), None))
            .unwrap_err();
        assert!(matches!(err, TrellisError::ConstraintViolation { .. }));

        mgr.with_txn(txn, |t| {
            assert!(t.check_schemas(|_| Some(Arc::clone(&old))).is_ok());
            assert!(matches!(
                t.check_schemas(|_| Some(Arc::clone(&new))),
                Err(TrellisError::ConstraintViolation { .. })
            ));
            assert!(matches!(
                t.check_schemas(|_| None),
                Err(TrellisError::TableNotFound { .. })
            ));
            Ok(())
        })
        .unwrap();
    }
}
