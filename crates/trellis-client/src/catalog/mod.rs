//! Table creation and removal.

use std::sync::Arc;

use tracing::info;
use trellis_common::error::TrellisResult;
use trellis_common::schema::{ColumnSchema, TableSchema};

use crate::client::Session;
use crate::table::Tables;

/// Definition of a table to create.
///
/// ```rust
/// use trellis_client::catalog::TableDefinition;
/// use trellis_common::schema::ColumnSchema;
/// use trellis_common::types::DataType;
///
/// let person = TableDefinition::new("Person2")
///     .if_not_exists()
///     .column(ColumnSchema::new("id", DataType::Int32))
///     .column(ColumnSchema::new("name", DataType::String).nullable(true))
///     .primary_key(&["id"]);
///
/// assert_eq!(person.to_schema().unwrap().to_string(),
///     "PERSON2 (ID INT NOT NULL, NAME VARCHAR, PRIMARY KEY (ID))");
/// ```
#[derive(Debug, Clone)]
pub struct TableDefinition {
    name: String,
    columns: Vec<ColumnSchema>,
    primary_key: Vec<String>,
    if_not_exists: bool,
}

impl TableDefinition {
    /// Starts a definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            if_not_exists: false,
        }
    }

    /// Makes creation a no-op when the table exists.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Appends a column.
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares the primary key, in key order.
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Validates the definition and builds the schema.
    pub fn to_schema(&self) -> TrellisResult<TableSchema> {
        let key: Vec<&str> = self.primary_key.iter().map(String::as_str).collect();
        self.columns
            .iter()
            .cloned()
            .fold(TableSchema::builder(&self.name), |b, c| b.column(c))
            .primary_key(&key)
            .build()
    }
}

/// Creates and drops tables.
///
/// Changes are reflected in the schema registry immediately.
#[derive(Debug, Clone)]
pub struct Catalog {
    session: Arc<Session>,
    tables: Tables,
}

impl Catalog {
    pub(crate) fn new(session: Arc<Session>, tables: Tables) -> Self {
        Self { session, tables }
    }

    /// Creates a table. Returns false if it already existed and the
    /// definition allows that.
    pub async fn create_table(&self, definition: TableDefinition) -> TrellisResult<bool> {
        let schema = definition.to_schema()?;
        let name = schema.name().to_string();
        let created = self
            .session
            .call(self.session.store().create_table(schema, definition.if_not_exists))
            .await?;
        if created {
            self.tables.invalidate(&name);
            info!(table = %name, "table created");
        }
        Ok(created)
    }

    /// Drops a table. Returns false if it was absent and `if_exists` is set.
    pub async fn drop_table(&self, name: &str, if_exists: bool) -> TrellisResult<bool> {
        let name = trellis_common::types::normalize_identifier(name);
        let dropped = self
            .session
            .call(self.session.store().drop_table(&name, if_exists))
            .await?;
        self.tables.invalidate(&name);
        if dropped {
            info!(table = %name, "table dropped");
        }
        Ok(dropped)
    }
}
