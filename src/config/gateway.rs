//! Realtime gateway configuration

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::api::ApiConfig;
use super::error::ValidationError;
use super::runtime::Environment;
use crate::domain::connection::ReconnectPolicy;

/// Gateway socket and reconnect settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Explicit socket URL; derived from the API base URL when absent
    pub url: Option<String>,

    /// Kiosk identity; selects the kiosk-scoped path and enables registration
    pub kiosk_id: Option<String>,

    /// Set to false to run REST-only
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub reconnect_strategy: ReconnectStrategy,

    /// First exponential delay in milliseconds
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,

    /// Exponential delay cap in milliseconds
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay between attempts for the fixed strategy
    #[serde(default = "default_fixed_interval_ms")]
    pub fixed_interval_ms: u64,
}

/// Reconnect delay strategy
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    /// Same delay every time, retried indefinitely
    Fixed,
    #[default]
    Exponential,
}

impl GatewayConfig {
    /// Reconnect policy described by this section
    pub fn policy(&self) -> ReconnectPolicy {
        match self.reconnect_strategy {
            ReconnectStrategy::Fixed => {
                ReconnectPolicy::fixed(Duration::from_millis(self.fixed_interval_ms))
            }
            ReconnectStrategy::Exponential => ReconnectPolicy::exponential(
                Duration::from_millis(self.reconnect_base_ms),
                Duration::from_millis(self.reconnect_max_ms),
                self.max_reconnect_attempts,
            ),
        }
    }

    /// Socket URL, either configured or derived from the API host:
    /// `ws(s)://<host>/ws/unimate/` or `ws(s)://<host>/ws/kiosk/<id>/`.
    pub fn resolve_url(&self, api: &ApiConfig) -> Result<String, ValidationError> {
        if let Some(url) = &self.url {
            let parsed = Url::parse(url).map_err(|_| ValidationError::InvalidGatewayUrl)?;
            return match parsed.scheme() {
                "ws" | "wss" => Ok(url.clone()),
                _ => Err(ValidationError::InvalidGatewayUrl),
            };
        }

        let mut url = api.url()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ValidationError::InvalidGatewayUrl)?;
        match &self.kiosk_id {
            Some(id) => url.set_path(&format!("/ws/kiosk/{}/", id)),
            None => url.set_path("/ws/unimate/"),
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(url.to_string())
    }

    /// Validate gateway configuration
    pub fn validate(
        &self,
        api: &ApiConfig,
        environment: Environment,
    ) -> Result<(), ValidationError> {
        if let Some(id) = &self.kiosk_id {
            if id.trim().is_empty() {
                return Err(ValidationError::MissingRequired("gateway.kiosk_id"));
            }
        }

        match self.reconnect_strategy {
            ReconnectStrategy::Fixed if self.fixed_interval_ms == 0 => {
                return Err(ValidationError::InvalidReconnectDelay)
            }
            ReconnectStrategy::Exponential
                if self.reconnect_base_ms == 0 || self.reconnect_base_ms > self.reconnect_max_ms =>
            {
                return Err(ValidationError::InvalidReconnectDelay)
            }
            _ => {}
        }

        if !self.enabled {
            return Ok(());
        }
        let url = self.resolve_url(api)?;
        if environment == Environment::Production && !url.starts_with("wss://") {
            return Err(ValidationError::GatewayMustBeSecure);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            kiosk_id: None,
            enabled: default_enabled(),
            reconnect_strategy: ReconnectStrategy::default(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            fixed_interval_ms: default_fixed_interval_ms(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_reconnect_base_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_fixed_interval_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_derives_shared_path_from_api_host() {
        let gateway = GatewayConfig::default();
        assert_eq!(
            gateway.resolve_url(&api("http://localhost:8000")).unwrap(),
            "ws://localhost:8000/ws/unimate/"
        );
    }

    #[test]
    fn test_derives_secure_kiosk_path() {
        let gateway = GatewayConfig {
            kiosk_id: Some("lobby-2".to_string()),
            ..GatewayConfig::default()
        };
        assert_eq!(
            gateway.resolve_url(&api("https://unimate.example.ac.nz/api")).unwrap(),
            "wss://unimate.example.ac.nz/ws/kiosk/lobby-2/"
        );
    }

    #[test]
    fn test_explicit_url_must_be_websocket() {
        let gateway = GatewayConfig {
            url: Some("http://example.com/ws/".to_string()),
            ..GatewayConfig::default()
        };
        assert_eq!(
            gateway.resolve_url(&ApiConfig::default()),
            Err(ValidationError::InvalidGatewayUrl)
        );
    }

    #[test]
    fn test_default_policy_is_exponential() {
        let policy = GatewayConfig::default().policy();
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_for(6), None);
    }

    #[test]
    fn test_fixed_policy_never_gives_up() {
        let gateway = GatewayConfig {
            reconnect_strategy: ReconnectStrategy::Fixed,
            ..GatewayConfig::default()
        };
        assert_eq!(gateway.policy().delay_for(50), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_production_requires_wss() {
        let gateway = GatewayConfig::default();
        assert_eq!(
            gateway.validate(&api("http://kiosk.example.com"), Environment::Production),
            Err(ValidationError::GatewayMustBeSecure)
        );
        assert!(gateway
            .validate(&api("https://kiosk.example.com"), Environment::Production)
            .is_ok());
    }

    #[test]
    fn test_rejects_inverted_backoff() {
        let gateway = GatewayConfig {
            reconnect_base_ms: 60_000,
            ..GatewayConfig::default()
        };
        assert_eq!(
            gateway.validate(&ApiConfig::default(), Environment::Development),
            Err(ValidationError::InvalidReconnectDelay)
        );
    }
}
