//! Key/value views.

use std::sync::Arc;

use trellis_common::error::TrellisResult;
use trellis_common::schema::TableSchema;
use trellis_common::tuple::Tuple;

use super::{check_key, check_value, concat, split, TupleCodec};
use crate::table::Table;
use crate::transaction::{txn_id, Transaction};

/// A table seen as a map from key columns to value columns.
///
/// `put` joins key and value into one row; `get` splits the stored row by
/// column role and returns the value half.
pub struct KeyValueView<K, V> {
    table: Table,
    key: Arc<dyn TupleCodec<K>>,
    value: Arc<dyn TupleCodec<V>>,
}

impl<K, V> Clone for KeyValueView<K, V> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            key: Arc::clone(&self.key),
            value: Arc::clone(&self.value),
        }
    }
}

impl<K, V> KeyValueView<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub(crate) fn new(table: Table, key: Arc<dyn TupleCodec<K>>, value: Arc<dyn TupleCodec<V>>) -> Self {
        Self { table, key, value }
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    fn schema(&self) -> &TableSchema {
        self.table.schema()
    }

    fn key_tuple(&self, key: &K) -> TrellisResult<Tuple> {
        let key = self.key.encode(key);
        check_key(self.schema(), &key)?;
        Ok(key)
    }

    fn row(&self, key: &K, value: &V) -> TrellisResult<Tuple> {
        let key = self.key_tuple(key)?;
        let value = self.value.encode(value);
        check_value(self.schema(), &value)?;
        Ok(concat(key, value))
    }

    /// Associates `value` with `key`, replacing any previous value.
    pub async fn put(&self, tx: Option<&Transaction>, key: &K, value: &V) -> TrellisResult<()> {
        let row = self.row(key, value)?;
        let session = self.table.session();
        session
            .call(session.store().upsert_row(txn_id(tx), self.table.name(), row))
            .await
    }

    /// Puts several pairs, in order. Every pair is validated first.
    pub async fn put_all(&self, tx: Option<&Transaction>, pairs: &[(K, V)]) -> TrellisResult<()> {
        let rows = pairs
            .iter()
            .map(|(k, v)| self.row(k, v))
            .collect::<TrellisResult<Vec<_>>>()?;

        let session = self.table.session();
        for row in rows {
            session
                .call(session.store().upsert_row(txn_id(tx), self.table.name(), row))
                .await?;
        }
        Ok(())
    }

    /// Puts a pair unless the key exists. Returns true if written.
    pub async fn put_if_absent(&self, tx: Option<&Transaction>, key: &K, value: &V) -> TrellisResult<bool> {
        let row = self.row(key, value)?;
        let session = self.table.session();
        session
            .call(session.store().insert_row(txn_id(tx), self.table.name(), row))
            .await
    }

    /// Returns the value stored under `key`.
    pub async fn get(&self, tx: Option<&Transaction>, key: &K) -> TrellisResult<Option<V>> {
        let key = self.key_tuple(key)?;
        let session = self.table.session();
        let row = session
            .call(session.store().get_row(txn_id(tx), self.table.name(), key))
            .await?;
        match row {
            Some(row) => {
                let (_, value) = split(self.schema(), row);
                self.value.decode(value).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Returns the values of several keys, positionally aligned with `keys`.
    pub async fn get_all(&self, tx: Option<&Transaction>, keys: &[K]) -> TrellisResult<Vec<Option<V>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(tx, key).await?);
        }
        Ok(values)
    }

    /// Returns true if a value is stored under `key`.
    pub async fn contains(&self, tx: Option<&Transaction>, key: &K) -> TrellisResult<bool> {
        let key = self.key_tuple(key)?;
        let session = self.table.session();
        let row = session
            .call(session.store().get_row(txn_id(tx), self.table.name(), key))
            .await?;
        Ok(row.is_some())
    }

    /// Removes the pair stored under `key`. Returns true if it existed.
    pub async fn remove(&self, tx: Option<&Transaction>, key: &K) -> TrellisResult<bool> {
        let key = self.key_tuple(key)?;
        let session = self.table.session();
        session
            .call(session.store().delete_row(txn_id(tx), self.table.name(), key))
            .await
    }
}

impl<K, V> std::fmt::Debug for KeyValueView<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueView")
            .field("table", &self.table.name())
            .field("key", &std::any::type_name::<K>())
            .field("value", &std::any::type_name::<V>())
            .finish()
    }
}
