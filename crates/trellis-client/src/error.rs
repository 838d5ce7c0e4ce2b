//! Error types for the client library.
//!
//! Every operation reports a [`TrellisError`]; this module re-exports it
//! together with the connection state reported by [`crate::Client::state`].

use std::fmt;

pub use trellis_common::error::{ErrorCode, TrellisError, TrellisResult};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected and ready.
    Connected,
    /// The last call failed because the endpoint became unreachable.
    Failed,
    /// Closed by the caller.
    Closed,
}

impl ConnectionState {
    /// Returns true if calls may still be issued.
    pub fn is_open(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Failed.to_string(), "failed");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
        assert!(ConnectionState::Failed.is_open());
        assert!(!ConnectionState::Closed.is_open());
    }
}
