//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid API base URL")]
    InvalidApiUrl,

    #[error("Invalid request timeout (must be 1..=120 seconds)")]
    InvalidTimeout,

    #[error("Gateway URL must use ws:// or wss://")]
    InvalidGatewayUrl,

    #[error("Reconnect delays must be non-zero and base must not exceed max")]
    InvalidReconnectDelay,

    #[error("Idle timeout out of range (must be 10..=3600 seconds)")]
    InvalidIdleTimeout,

    #[error("Gateway URL must use wss:// in production")]
    GatewayMustBeSecure,
}
