//! # trellis-client
//!
//! Client library for Trellis.
//!
//! A [`Client`] connects to the first reachable endpoint of a row store
//! cluster and exposes every table through four typed views:
//!
//! | View                             | Row shape         | Key shape | Value shape |
//! |----------------------------------|-------------------|-----------|-------------|
//! | `RecordView<Tuple>`              | `Tuple`           | `Tuple`   |             |
//! | `RecordView<T>`                  | mapped `T`        | mapped `T`|             |
//! | `KeyValueView<Tuple, Tuple>`     |                   | `Tuple`   | `Tuple`     |
//! | `KeyValueView<K, V>`             |                   | mapped `K`| mapped `V`  |
//!
//! All views of one table share its schema, so a row written through one
//! view is readable through every other.
//!
//! It also includes:
//!
//! - **Schema Registry**: cached table schemas by normalized name
//! - **Object Mapping**: field-to-column mappings for Rust types
//! - **Catalog**: table creation and removal
//! - **SQL**: parameterised queries and a fluent query builder
//! - **Transactions**: explicit transactions passed to every operation
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis_client::{Client, ClientConfig, TableDefinition, Tuple};
//! use trellis_common::schema::ColumnSchema;
//! use trellis_common::types::DataType;
//! use trellis_store::MemoryCluster;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trellis_client::TrellisResult<()> {
//! let cluster = MemoryCluster::with_default_endpoints();
//! let client = Client::connect(ClientConfig::default(), &cluster).await?;
//!
//! client
//!     .catalog()
//!     .create_table(
//!         TableDefinition::new("Artist")
//!             .column(ColumnSchema::new("artistId", DataType::Int32))
//!             .column(ColumnSchema::new("name", DataType::String).nullable(true))
//!             .primary_key(&["artistId"]),
//!     )
//!     .await?;
//!
//! let artists = client.tables().table("Artist").await?.key_value_view();
//! let key = Tuple::new().set("artistId", 277);
//! artists.put(None, &key, &Tuple::new().set("name", "New Order")).await?;
//! assert!(artists.contains(None, &key).await?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Client connection.
pub mod client;

pub mod catalog;
pub mod mapping;
pub mod query;

/// Tables and the schema registry.
pub mod table;

pub mod transaction;

/// Record and key/value views.
pub mod view;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use catalog::{Catalog, TableDefinition};
pub use client::{Client, ClientConfig, ClientStats};
pub use error::{ConnectionState, ErrorCode, TrellisError, TrellisResult};
pub use mapping::{BoundMapping, Mapped, ObjectMapping, ObjectMappingBuilder, Scope};
pub use query::{QueryBuilder, Sql};
pub use table::{Table, Tables};
pub use transaction::Transaction;
pub use view::{KeyValueView, RecordView};

pub use trellis_common::schema::{ColumnSchema, TableSchema};
pub use trellis_common::statement::{ResultSet, Statement};
pub use trellis_common::store::{AccessMode, TransactionOptions};
pub use trellis_common::tuple::Tuple;
pub use trellis_common::types::{DataType, Value};
