//! Record views.

use std::sync::Arc;

use trellis_common::error::TrellisResult;
use trellis_common::schema::TableSchema;

use super::{check_key, check_row, TupleCodec};
use crate::table::Table;
use crate::transaction::{txn_id, Transaction};

/// Whole rows addressed by their embedded key.
///
/// `RecordView<Tuple>` works on tuples; `RecordView<T>` for a
/// [`Mapped`](crate::mapping::Mapped) type converts through the type's
/// mapping. In both cases `get` and `delete` take a value of the same shape
/// of which only the key columns are used.
///
/// # Example
///
/// ```rust,ignore
/// let view = client.tables().table("Artist").await?.record_view();
/// view.upsert(None, &Tuple::new().set("artistId", 276).set("name", "New Discovery Band")).await?;
///
/// let row = view.get(None, &Tuple::new().set("artistId", 276)).await?;
/// ```
pub struct RecordView<R> {
    table: Table,
    row: Arc<dyn TupleCodec<R>>,
    key: Arc<dyn TupleCodec<R>>,
}

impl<R> Clone for RecordView<R> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            row: Arc::clone(&self.row),
            key: Arc::clone(&self.key),
        }
    }
}

impl<R: Send + Sync + 'static> RecordView<R> {
    pub(crate) fn new(table: Table, row: Arc<dyn TupleCodec<R>>, key: Arc<dyn TupleCodec<R>>) -> Self {
        Self { table, row, key }
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    fn schema(&self) -> &TableSchema {
        self.table.schema()
    }

    /// Inserts or replaces a row.
    ///
    /// The record must carry every key column. Value columns it leaves out
    /// are stored as NULL.
    pub async fn upsert(&self, tx: Option<&Transaction>, record: &R) -> TrellisResult<()> {
        let row = self.row.encode(record);
        check_row(self.schema(), &row)?;
        let session = self.table.session();
        session
            .call(session.store().upsert_row(txn_id(tx), self.table.name(), row))
            .await
    }

    /// Upserts several rows, in order.
    ///
    /// Every record is validated before the first write. Without a
    /// transaction, a failure part-way leaves the earlier rows written.
    pub async fn upsert_all(&self, tx: Option<&Transaction>, records: &[R]) -> TrellisResult<()> {
        let rows = records
            .iter()
            .map(|r| {
                let row = self.row.encode(r);
                check_row(self.schema(), &row).map(|()| row)
            })
            .collect::<TrellisResult<Vec<_>>>()?;

        let session = self.table.session();
        for row in rows {
            session
                .call(session.store().upsert_row(txn_id(tx), self.table.name(), row))
                .await?;
        }
        Ok(())
    }

    /// Inserts a row unless its key exists. Returns true if written.
    pub async fn insert(&self, tx: Option<&Transaction>, record: &R) -> TrellisResult<bool> {
        let row = self.row.encode(record);
        check_row(self.schema(), &row)?;
        let session = self.table.session();
        session
            .call(session.store().insert_row(txn_id(tx), self.table.name(), row))
            .await
    }

    /// Reads the row with the key of `key`.
    pub async fn get(&self, tx: Option<&Transaction>, key: &R) -> TrellisResult<Option<R>> {
        let key = self.key.encode(key);
        check_key(self.schema(), &key)?;
        let session = self.table.session();
        let row = session
            .call(session.store().get_row(txn_id(tx), self.table.name(), key))
            .await?;
        row.map(|row| self.row.decode(row)).transpose()
    }

    /// Reads several rows; the result is positionally aligned with `keys`.
    pub async fn get_all(&self, tx: Option<&Transaction>, keys: &[R]) -> TrellisResult<Vec<Option<R>>> {
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            rows.push(self.get(tx, key).await?);
        }
        Ok(rows)
    }

    /// Deletes the row with the key of `key`. Returns true if it existed.
    pub async fn delete(&self, tx: Option<&Transaction>, key: &R) -> TrellisResult<bool> {
        let key = self.key.encode(key);
        check_key(self.schema(), &key)?;
        let session = self.table.session();
        session
            .call(session.store().delete_row(txn_id(tx), self.table.name(), key))
            .await
    }
}

impl<R> std::fmt::Debug for RecordView<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordView")
            .field("table", &self.table.name())
            .field("shape", &std::any::type_name::<R>())
            .finish()
    }
}
