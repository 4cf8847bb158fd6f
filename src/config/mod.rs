//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `UNIMATE` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment yields a local
//! development kiosk.
//!
//! # Example
//!
//! ```no_run
//! use unimate_kiosk::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Gateway at {}", config.gateway_url().expect("gateway url"));
//! ```

mod api;
mod error;
mod gateway;
mod runtime;
mod session;

pub use api::ApiConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::{GatewayConfig, ReconnectStrategy};
pub use runtime::{Environment, LogFormat, RuntimeConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Environment and logging
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Kiosk REST API
    #[serde(default)]
    pub api: ApiConfig,

    /// Realtime gateway socket and reconnect policy
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Idle timeout and token storage
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `UNIMATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `UNIMATE__SESSION__IDLE_TIMEOUT_SECS=180` -> `session.idle_timeout_secs = 180`
    /// - `UNIMATE__GATEWAY__KIOSK_ID=lobby-2` -> `gateway.kiosk_id = "lobby-2"`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("UNIMATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.api.validate()?;
        self.gateway
            .validate(&self.api, self.runtime.environment)?;
        self.session.validate()?;
        Ok(())
    }

    /// Gateway socket URL (configured or derived from the API host)
    pub fn gateway_url(&self) -> Result<String, ValidationError> {
        self.gateway.resolve_url(&self.api)
    }

    /// Whether an empty token store should fall back to the demo timetable
    pub fn demo_mode(&self) -> bool {
        self.session.demo_when_local && self.api.is_local_host()
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.runtime.is_production()
    }
}
