//! # trellis-common
//!
//! Common types, errors and the row store boundary for Trellis.
//!
//! This crate provides the foundational types shared by the client, the
//! views and every row store implementation:
//!
//! - **Types**: column values, data types, identifiers and `TxnId`
//! - **Tuple**: the dynamically-keyed row used at every layer
//! - **Schema**: column and table schemas with key/value roles
//! - **Errors**: unified error handling with `TrellisError`
//! - **Store**: the `RowStore` and `Connector` boundary traits
//!
//! ## Example
//!
//! ```rust
//! use trellis_common::error::TrellisResult;
//! use trellis_common::tuple::Tuple;
//! use trellis_common::types::Value;
//!
//! fn example() -> TrellisResult<()> {
//!     let key = Tuple::new().set("artistId", 277);
//!     let value = Tuple::new().set("name", "New Order");
//!     assert_eq!(key.get("ARTISTID"), Some(&Value::Int32(277)));
//!     assert_eq!(value.get_as::<String>("name")?, Some("New Order".to_string()));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod error;
pub mod schema;
pub mod statement;
pub mod store;
pub mod tuple;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorCode, TrellisError, TrellisResult};
pub use schema::{ColumnRole, ColumnSchema, TableSchema};
pub use statement::{ResultSet, Statement};
pub use store::{AccessMode, BoxFuture, Connector, RowStore, TransactionOptions};
pub use tuple::Tuple;
pub use types::{ColumnValue, DataType, TxnId, Value};
