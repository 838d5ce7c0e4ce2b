//! Error handling for Trellis.
//!
//! A single error type is shared by the client, the views and every row
//! store implementation, so that a failure keeps its kind as it crosses the
//! store boundary.

mod kind;

pub use kind::{ErrorCode, TrellisError};

/// Result type alias for Trellis operations.
pub type TrellisResult<T> = std::result::Result<T, TrellisError>;
