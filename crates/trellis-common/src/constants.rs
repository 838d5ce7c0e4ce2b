//! System-wide constants for Trellis.

// =============================================================================
// Endpoints
// =============================================================================

/// Default client port of a cluster node.
pub const DEFAULT_PORT: u16 = 10800;

/// Endpoints tried when no endpoint is configured.
///
/// A three-node local cluster listening on consecutive ports.
pub const DEFAULT_ENDPOINTS: [&str; 3] = ["localhost:10800", "localhost:10801", "localhost:10802"];

// =============================================================================
// Timeouts
// =============================================================================

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default operation timeout in milliseconds.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Limits
// =============================================================================

/// Maximum number of columns in a table.
pub const MAX_COLUMNS: usize = 1024;

/// Maximum length of a table or column identifier.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Application name reported by clients that do not set one.
pub const DEFAULT_APPLICATION_NAME: &str = "trellis";
