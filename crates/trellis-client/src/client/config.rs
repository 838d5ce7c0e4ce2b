//! Client configuration.
//!
//! A `ClientConfig` is built in code with the builder methods or loaded from
//! a TOML file:
//!
//! ```toml
//! endpoints = ["node-a:10800", "node-b:10800"]
//! connect_timeout_ms = 2000
//! operation_timeout_ms = 10000
//! application_name = "inventory"
//! ```
//!
//! Missing keys fall back to the defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use trellis_common::constants::{
    DEFAULT_APPLICATION_NAME, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_ENDPOINTS,
    DEFAULT_OPERATION_TIMEOUT_MS,
};
use trellis_common::error::{TrellisError, TrellisResult};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoints tried in order when connecting.
    pub endpoints: Vec<String>,
    /// Per-endpoint connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Timeout of each row store call in milliseconds.
    pub operation_timeout_ms: u64,
    /// Application name for identification.
    pub application_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a new client configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the endpoint list.
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Appends an endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the operation timeout.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Returns the connection timeout.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the operation timeout.
    pub fn operation_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Parses a TOML document and validates it.
    pub fn from_toml_str(text: &str) -> TrellisResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| TrellisError::invalid_config(format!("malformed TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> TrellisResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrellisError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks the configuration for values that can never work.
    pub fn validate(&self) -> TrellisResult<()> {
        if self.endpoints.is_empty() {
            return Err(TrellisError::invalid_config("no endpoints configured"));
        }
        if self.endpoints.iter().any(|e| e.trim().is_empty()) {
            return Err(TrellisError::invalid_config("empty endpoint address"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(TrellisError::invalid_config("connect_timeout_ms must be positive"));
        }
        if self.operation_timeout_ms == 0 {
            return Err(TrellisError::invalid_config("operation_timeout_ms must be positive"));
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
