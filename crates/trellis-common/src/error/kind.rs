//! Error kinds and codes.

use std::fmt;
use thiserror::Error;

use crate::types::TxnId;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug).
    Internal = 0x0000,
    /// Operation not supported.
    Unsupported = 0x0001,
    /// Invalid configuration.
    InvalidConfig = 0x0002,
    /// Operation timed out.
    Timeout = 0x0003,

    // Connection errors (0x0100 - 0x01FF)
    /// No reachable endpoint, or the connection was closed.
    Connection = 0x0100,

    // Schema errors (0x0200 - 0x02FF)
    /// Table not found.
    TableNotFound = 0x0200,
    /// Table already exists.
    TableExists = 0x0201,
    /// Column not part of the schema or used in the wrong role.
    SchemaMismatch = 0x0202,
    /// Key column missing or null.
    KeyIncomplete = 0x0203,
    /// Object mapping inconsistent with the schema.
    Mapping = 0x0204,
    /// Value type does not fit the column type.
    TypeMismatch = 0x0205,
    /// Row violates a column constraint.
    ConstraintViolation = 0x0206,
    /// Table definition is malformed.
    InvalidSchema = 0x0207,

    // Transaction errors (0x0300 - 0x03FF)
    /// Transaction not found.
    TransactionNotFound = 0x0300,
    /// Transaction already committed or rolled back.
    TransactionFinished = 0x0301,
    /// Write attempted in a read-only transaction.
    ReadOnlyTransaction = 0x0302,

    // Query errors (0x0400 - 0x04FF)
    /// SQL syntax error.
    SyntaxError = 0x0400,
    /// Query execution failed.
    QueryFailed = 0x0401,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Connection",
            0x02 => "Schema",
            0x03 => "Transaction",
            0x04 => "Query",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The main error type for Trellis.
///
/// # Example
///
/// ```rust
/// use trellis_common::error::{ErrorCode, TrellisError, TrellisResult};
///
/// fn open(name: &str) -> TrellisResult<()> {
///     Err(TrellisError::TableNotFound { table: name.to_string() })
/// }
///
/// assert_eq!(open("ALBUM").unwrap_err().code(), ErrorCode::TableNotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrellisError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Operation not supported.
    #[error("operation not supported: {feature}")]
    Unsupported {
        /// The unsupported feature.
        feature: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        duration_ms: u64,
    },

    // ==========================================================================
    // Connection Errors
    // ==========================================================================
    /// The row store could not be reached.
    #[error("connection failed: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Schema Errors
    // ==========================================================================
    /// Table not found.
    #[error("table {table} not found")]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// Table already exists.
    #[error("table {table} already exists")]
    TableExists {
        /// The existing table.
        table: String,
    },

    /// A column is not in the schema, or appears where its role forbids it.
    #[error("column {column} does not fit table {table}: {reason}")]
    SchemaMismatch {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
        /// What is wrong with the column.
        reason: String,
    },

    /// A key column is missing or null.
    #[error("key column {column} of table {table} is missing or null")]
    KeyIncomplete {
        /// Table name.
        table: String,
        /// The missing key column.
        column: String,
    },

    /// The object mapping of a type cannot be used with a table.
    #[error("mapping for {type_name} is invalid: {message}")]
    Mapping {
        /// Mapped Rust type.
        type_name: String,
        /// Error message.
        message: String,
    },

    /// Value type does not fit the column type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// A row violates a column constraint (nullability, length, type).
    #[error("constraint violation on table {table}: {message}")]
    ConstraintViolation {
        /// Table name.
        table: String,
        /// Error message.
        message: String,
    },

    /// A table definition is malformed.
    #[error("invalid definition of table {table}: {message}")]
    InvalidSchema {
        /// Table name.
        table: String,
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Transaction Errors
    // ==========================================================================
    /// Transaction not found.
    #[error("transaction {txn_id} not found")]
    TransactionNotFound {
        /// The missing transaction.
        txn_id: TxnId,
    },

    /// Transaction already committed or rolled back.
    #[error("transaction {txn_id} is already finished")]
    TransactionFinished {
        /// The finished transaction.
        txn_id: TxnId,
    },

    /// Write attempted in a read-only transaction.
    #[error("transaction {txn_id} is read-only")]
    ReadOnlyTransaction {
        /// The read-only transaction.
        txn_id: TxnId,
    },

    // ==========================================================================
    // Query Errors
    // ==========================================================================
    /// SQL syntax error.
    #[error("syntax error: {message}")]
    SyntaxError {
        /// Error message.
        message: String,
    },

    /// Query execution failed.
    #[error("query failed: {message}")]
    QueryFailed {
        /// Error message.
        message: String,
    },
}

impl TrellisError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::Unsupported { .. } => ErrorCode::Unsupported,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Connection { .. } => ErrorCode::Connection,
            Self::TableNotFound { .. } => ErrorCode::TableNotFound,
            Self::TableExists { .. } => ErrorCode::TableExists,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::KeyIncomplete { .. } => ErrorCode::KeyIncomplete,
            Self::Mapping { .. } => ErrorCode::Mapping,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::ConstraintViolation { .. } => ErrorCode::ConstraintViolation,
            Self::InvalidSchema { .. } => ErrorCode::InvalidSchema,
            Self::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
            Self::TransactionFinished { .. } => ErrorCode::TransactionFinished,
            Self::ReadOnlyTransaction { .. } => ErrorCode::ReadOnlyTransaction,
            Self::SyntaxError { .. } => ErrorCode::SyntaxError,
            Self::QueryFailed { .. } => ErrorCode::QueryFailed,
        }
    }

    /// Returns true if a later attempt of the same call may succeed.
    ///
    /// Trellis itself never retries; this only classifies the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection { .. })
    }

    /// Returns true if the caller's data disagrees with the table schema.
    ///
    /// These errors are raised by the view layer before the row store is
    /// contacted.
    #[must_use]
    pub const fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. } | Self::KeyIncomplete { .. } | Self::Mapping { .. }
        )
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a mapping error for type `T`.
    #[must_use]
    pub fn mapping<T: ?Sized>(message: impl Into<String>) -> Self {
        Self::Mapping {
            type_name: std::any::type_name::<T>().to_string(),
            message: message.into(),
        }
    }

    /// Creates an unsupported-operation error.
    #[must_use]
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    /// Creates a query execution error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
