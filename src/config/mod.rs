/// Configuration management for the Wireflow engine
///
/// Handles server configuration and runtime execution parameters.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Execution engine configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Execution engine configuration
///
/// Bounds and defaults applied to every run. The step budget is the sole
/// protection against cyclic graphs running forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of node hops per run
    pub max_steps: usize,
    /// Delay applied by DELAY nodes that don't specify one, in milliseconds
    pub default_delay_ms: i64,
    /// Timeout for outbound HTTP requests made by REQUEST nodes, in seconds
    pub request_timeout_secs: u64,
    /// Relay endpoint that proxied REQUEST nodes post their envelope to.
    /// None means proxied requests fail with a configuration error.
    pub relay_url: Option<String>,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("WIREFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("WIREFLOW_PORT")
                    .unwrap_or_else(|_| "3006".to_string())
                    .parse()
                    .unwrap_or(3006),
            },
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: std::env::var("WIREFLOW_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            default_delay_ms: std::env::var("WIREFLOW_DEFAULT_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            request_timeout_secs: std::env::var("WIREFLOW_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            relay_url: std::env::var("WIREFLOW_RELAY_URL").ok(),
        }
    }
}
