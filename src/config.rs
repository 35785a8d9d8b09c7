//! Startup configuration read from the process environment
//!
//! Values are read once and then passed around as an immutable [`Config`].
//! Empty variables count as unset, so `POD_NAME=""` still yields `"unknown"`.
//! Numeric values are trimmed before parsing; string values are taken as-is.

use std::time::Duration;
use thiserror::Error;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Placeholder for pod and namespace when the orchestrator does not inject them
pub const UNKNOWN: &str = "unknown";

/// Runtime environment label used when `NODE_ENV` is unset
pub const DEFAULT_NODE_ENV: &str = "development";

/// Upper bound on how long shutdown waits for in-flight requests
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT {value:?}: expected an integer between 0 and 65535")]
    InvalidPort { value: String },

    #[error("invalid SHUTDOWN_TIMEOUT_SECS {value:?}: expected a whole number of seconds")]
    InvalidShutdownTimeout { value: String },
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub pod_name: String,
    pub namespace: String,
    pub node_env: String,
    pub shutdown_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            pod_name: UNKNOWN.to_string(),
            namespace: UNKNOWN.to_string(),
            node_env: DEFAULT_NODE_ENV.to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Tests use this instead of mutating the process environment, which
    /// races with other tests running in parallel.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let get_number = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get_number("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value })?,
            None => DEFAULT_PORT,
        };

        let shutdown_timeout = match get_number("SHUTDOWN_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidShutdownTimeout { value })?,
            None => DEFAULT_SHUTDOWN_TIMEOUT,
        };

        Ok(Self {
            port,
            pod_name: get("POD_NAME").unwrap_or_else(|| UNKNOWN.to_string()),
            namespace: get("POD_NAMESPACE").unwrap_or_else(|| UNKNOWN.to_string()),
            node_env: get("NODE_ENV").unwrap_or_else(|| DEFAULT_NODE_ENV.to_string()),
            shutdown_timeout,
        })
    }
}
