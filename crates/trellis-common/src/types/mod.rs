//! Type definitions for Trellis.
//!
//! Identifiers, column values and data types shared by every crate.

mod ident;
mod ids;
mod value;

pub use ident::{normalize_identifier, quote_identifier};
pub use ids::TxnId;
pub use value::{ColumnValue, DataType, Value};
