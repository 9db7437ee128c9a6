//! Service Configuration Settings
//!
//! Configuration types for the pricing service, loaded from environment
//! variables. Batches have no expiry setting; a batch stays open until it
//! is completed or cancelled.

use std::net::IpAddr;
use std::time::Duration;

use crate::application::services::DEFAULT_TOMBSTONE_LIMIT;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Parse environment from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Get the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Address to bind.
    pub host: IpAddr,
    /// HTTP port.
    pub port: u16,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Time allowed for in-flight requests during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            max_body_bytes: 2 * 1024 * 1024,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Batch registry settings.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Cancelled batch ids remembered so a follow-up complete is
    /// acknowledged. Oldest are evicted past this limit.
    pub max_cancelled_tombstones: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_cancelled_tombstones: DEFAULT_TOMBSTONE_LIMIT,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Deployment environment.
    pub environment: Environment,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Batch registry settings.
    pub batches: BatchSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICING_HTTP_HOST` is set but is not an IP address.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("PRICING_ENV")
            .map(|s| Environment::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let defaults = ServerSettings::default();

        let host = match std::env::var("PRICING_HTTP_HOST") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PRICING_HTTP_HOST".to_string(), raw))?,
            Err(_) => defaults.host,
        };

        let server = ServerSettings {
            host,
            port: parse_env_u16("PRICING_HTTP_PORT", defaults.port),
            max_body_bytes: parse_env_usize("PRICING_MAX_BODY_BYTES", defaults.max_body_bytes),
            shutdown_timeout: parse_env_duration_secs(
                "PRICING_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout,
            ),
        };

        let batches = BatchSettings {
            max_cancelled_tombstones: parse_env_usize(
                "PRICING_MAX_CANCELLED_TOMBSTONES",
                BatchSettings::default().max_cancelled_tombstones,
            ),
        };

        Ok(Self {
            environment,
            server,
            batches,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable holds a value that cannot be used.
    #[error("environment variable {0} has invalid value {1:?}")]
    InvalidValue(String, String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}
