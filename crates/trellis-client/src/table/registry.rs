//! Schema registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::TableSchema;
use trellis_common::types::normalize_identifier;

use super::Table;
use crate::client::Session;
use crate::mapping::MappingCache;

/// Table name to schema registry.
///
/// Schemas are fetched from the row store on first request and cached for
/// the lifetime of the client. Entries are never invalidated automatically;
/// use [`Tables::refresh`] after altering a table elsewhere. Object mappings
/// are cached here too, one per Rust type.
#[derive(Clone)]
pub struct Tables {
    session: Arc<Session>,
    schemas: Arc<RwLock<HashMap<String, Arc<TableSchema>>>>,
    mappings: Arc<MappingCache>,
}

impl Tables {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            schemas: Arc::new(RwLock::new(HashMap::new())),
            mappings: Arc::new(MappingCache::default()),
        }
    }

    /// Returns a handle to a table.
    ///
    /// Fails with `TableNotFound` if the table does not exist, and with
    /// `Connection` once the client is closed, even for cached tables.
    pub async fn table(&self, name: &str) -> TrellisResult<Table> {
        if !self.session.state().is_open() {
            return Err(TrellisError::connection("client is closed"));
        }
        let name = normalize_identifier(name);
        let cached = self.schemas.read().get(&name).cloned();
        let schema = match cached {
            Some(schema) => schema,
            None => self.fetch(&name).await?,
        };
        Ok(self.handle(schema))
    }

    /// Re-fetches a table schema, replacing the cached entry.
    pub async fn refresh(&self, name: &str) -> TrellisResult<Table> {
        let name = normalize_identifier(name);
        self.schemas.write().remove(&name);
        let schema = self.fetch(&name).await?;
        Ok(self.handle(schema))
    }

    /// Drops a cached schema. Returns true if it was cached.
    pub fn invalidate(&self, name: &str) -> bool {
        self.schemas
            .write()
            .remove(&normalize_identifier(name))
            .is_some()
    }

    /// Drops every cached schema and mapping.
    pub fn clear(&self) {
        self.schemas.write().clear();
        self.mappings.clear();
    }

    /// Lists the cached table names, sorted.
    pub fn cached(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().keys().cloned().collect();
        names.sort();
        names
    }

    async fn fetch(&self, name: &str) -> TrellisResult<Arc<TableSchema>> {
        let schema = self
            .session
            .call(self.session.store().table_schema(name))
            .await?;
        debug!(table = name, columns = schema.len(), "cached table schema");
        self.schemas
            .write()
            .insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn handle(&self, schema: Arc<TableSchema>) -> Table {
        Table::new(schema, Arc::clone(&self.session), Arc::clone(&self.mappings))
    }
}

impl std::fmt::Debug for Tables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tables")
            .field("cached", &self.cached())
            .field("mappings", &self.mappings)
            .finish()
    }
}
