//! Table handles.
//!
//! A [`Table`] pairs a cached schema with the client session and hands out
//! the four views:
//!
//! ```text
//!                          ┌──────────────────────────────┐
//!                          │            Table             │
//!                          └──────────────┬───────────────┘
//!        ┌───────────────────┬────────────┴──────┬────────────────────────┐
//!        ▼                   ▼                   ▼                        ▼
//! RecordView<Tuple>   RecordView<T>   KeyValueView<Tuple, Tuple>   KeyValueView<K, V>
//! ```

mod registry;

pub use registry::Tables;

use std::sync::Arc;

use trellis_common::error::TrellisResult;
use trellis_common::schema::TableSchema;
use trellis_common::tuple::Tuple;

use crate::client::Session;
use crate::mapping::{BoundMapping, Mapped, MappingCache, Scope};
use crate::view::{KeyValueView, Passthrough, RecordView};

/// Handle to one table.
#[derive(Clone)]
pub struct Table {
    schema: Arc<TableSchema>,
    session: Arc<Session>,
    mappings: Arc<MappingCache>,
}

impl Table {
    pub(crate) fn new(schema: Arc<TableSchema>, session: Arc<Session>, mappings: Arc<MappingCache>) -> Self {
        Self {
            schema,
            session,
            mappings,
        }
    }

    /// Returns the normalised table name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Returns a view of whole rows as tuples.
    pub fn record_view(&self) -> RecordView<Tuple> {
        RecordView::new(self.clone(), Arc::new(Passthrough), Arc::new(Passthrough))
    }

    /// Returns a view of whole rows as objects of type `T`.
    ///
    /// Fails with `Mapping` if a key column has no mapped field or two fields
    /// map to the same column.
    pub fn record_view_of<T: Mapped>(&self) -> TrellisResult<RecordView<T>> {
        let mapping = self.mappings.get::<T>();
        let row = BoundMapping::bind(Arc::clone(&mapping), &self.schema, Scope::Row)?;
        let key = BoundMapping::bind(mapping, &self.schema, Scope::Key)?;
        Ok(RecordView::new(self.clone(), Arc::new(row), Arc::new(key)))
    }

    /// Returns a view of the table as key tuple to value tuple.
    pub fn key_value_view(&self) -> KeyValueView<Tuple, Tuple> {
        KeyValueView::new(self.clone(), Arc::new(Passthrough), Arc::new(Passthrough))
    }

    /// Returns a view of the table as `K` to `V`.
    ///
    /// `K` is bound to the key columns and `V` to the value columns.
    pub fn key_value_view_of<K: Mapped, V: Mapped>(&self) -> TrellisResult<KeyValueView<K, V>> {
        let key = BoundMapping::bind(self.mappings.get::<K>(), &self.schema, Scope::Key)?;
        let value = BoundMapping::bind(self.mappings.get::<V>(), &self.schema, Scope::Value)?;
        Ok(KeyValueView::new(self.clone(), Arc::new(key), Arc::new(value)))
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema.to_string())
            .finish()
    }
}
