//! # trellis-store
//!
//! In-memory row store for Trellis.
//!
//! This crate implements the `RowStore` boundary entirely in process so that
//! the client and its views can be exercised end to end:
//!
//! - **Cluster**: named endpoints with reachability control, sharing one
//!   database
//! - **Engine**: table catalog and row storage ordered by primary key
//! - **Transactions**: buffered write sets applied atomically at commit
//! - **Query**: single-table `SELECT` parsed with `sqlparser`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  MemoryCluster (Connector)                           │
//! │   endpoints ──▶ MemoryConnection (RowStore)          │
//! └──────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌──────────────────────────────────────────────────────┐
//! │  Database                                            │
//! │  ┌────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │ TableStore │  │ Transaction │  │  SelectPlan  │   │
//! │  │ (per table)│  │   Manager   │  │  (sqlparser) │   │
//! │  └────────────┘  └─────────────┘  └──────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use trellis_common::schema::{ColumnSchema, TableSchema};
//! use trellis_common::types::DataType;
//! use trellis_store::MemoryCluster;
//!
//! let cluster = MemoryCluster::with_default_endpoints();
//! let artist = TableSchema::builder("Artist")
//!     .column(ColumnSchema::new("artistId", DataType::Int32))
//!     .column(ColumnSchema::new("name", DataType::String).nullable(true))
//!     .primary_key(&["artistId"])
//!     .build()
//!     .unwrap();
//! cluster.database().create_table(artist, false).unwrap();
//! assert_eq!(cluster.database().table_names(), vec!["ARTIST"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod encoder;
pub mod engine;
pub mod query;
pub mod table;
pub mod txn;

pub use cluster::{MemoryCluster, MemoryConnection};
pub use engine::Database;
pub use txn::{TransactionManager, TransactionStats};
