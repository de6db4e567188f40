//! Configuration management with environment variable support.
//!
//! Settings are read from `CMDGATE_`-prefixed environment variables, after
//! loading a `.env` file if one exists. Variables already set in the
//! environment take precedence over the file.
//!
//! # Example
//!
//! ```ignore
//! use cmdgate_server::config::{load_dotenv, GatewayConfig};
//!
//! load_dotenv();
//! let config = GatewayConfig::from_env()?;
//! println!("Listening on {}", config.bind);
//! ```

use cmdgate_ws::WsConfig;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Prefix of every configuration variable
pub const ENV_PREFIX: &str = "CMDGATE_";

/// Error type for configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    #[error("Configuration error: {0}")]
    EnvyError(#[from] envy::Error),
    /// A value parsed but makes no sense.
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: format!("{ENV_PREFIX}{name}"),
            reason: reason.into(),
        }
    }
}

/// Environment profile for the gateway.
///
/// Detected from the `CMDGATE_ENV` environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Development environment with debug logging.
    Development,
    /// Production environment.
    Production,
    /// Custom environment name for specialized deployments.
    Custom(String),
}

impl Environment {
    /// Detect the current environment from `CMDGATE_ENV`.
    ///
    /// Returns:
    /// - `Production` if `CMDGATE_ENV` is "production" or "prod"
    /// - `Development` if `CMDGATE_ENV` is "development", "dev", or not set
    /// - `Custom(name)` for any other value
    pub fn current() -> Self {
        match std::env::var("CMDGATE_ENV").as_deref() {
            Ok("production") | Ok("prod") => Self::Production,
            Ok("development") | Ok("dev") | Err(_) => Self::Development,
            Ok(other) => Self::Custom(other.to_string()),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Get the environment name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Get the default log level for this environment.
    ///
    /// - Development: "debug"
    /// - Production: "info"
    /// - Custom: "info"
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production | Self::Custom(_) => "info",
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_bind() -> String {
    "127.0.0.1:7379".to_string()
}

fn default_max_request_head() -> usize {
    8192
}

/// Gateway settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    /// Address to listen on (`CMDGATE_BIND`)
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Database index for new backend sessions (`CMDGATE_DATABASE`)
    #[serde(default)]
    pub database: u32,
    /// Largest WebSocket message accepted (`CMDGATE_MAX_MESSAGE_SIZE`)
    #[serde(default)]
    pub max_message_size: Option<usize>,
    /// Largest HTTP request head accepted (`CMDGATE_MAX_REQUEST_HEAD`)
    #[serde(default = "default_max_request_head")]
    pub max_request_head: usize,
    /// Log filter directive (`CMDGATE_LOG`)
    #[serde(default)]
    pub log: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database: 0,
            max_message_size: None,
            max_request_head: default_max_request_head(),
            log: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from `CMDGATE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable fails to parse or holds a value that
    /// cannot work, such as a zero size limit.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .map_err(ConfigError::from)?
            .validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::invalid("BIND", "must not be empty"));
        }
        if self.max_message_size == Some(0) {
            return Err(ConfigError::invalid("MAX_MESSAGE_SIZE", "must be positive"));
        }
        if self.max_request_head < 16 {
            return Err(ConfigError::invalid("MAX_REQUEST_HEAD", "must be at least 16"));
        }
        Ok(self)
    }

    /// Per-connection settings for the WebSocket core
    pub fn ws_config(&self) -> WsConfig {
        WsConfig::new()
            .database(self.database)
            .max_message_size(self.max_message_size)
    }

    /// Log filter to use when `RUST_LOG` is not set
    pub fn log_filter(&self, env: &Environment) -> String {
        self.log
            .clone()
            .unwrap_or_else(|| format!("{},cmdgate=debug", env.default_log_level()))
    }
}

/// Load environment variables from a `.env` file.
///
/// Silently does nothing if the file does not exist. Existing environment
/// variables take precedence over `.env` values.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
