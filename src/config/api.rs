//! Kiosk REST API configuration

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::ValidationError;

/// Where the kiosk backend lives and how to talk to it
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Location id of this kiosk, used as the start of every route
    #[serde(default = "default_from_location")]
    pub from_location: String,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed base URL
    pub fn url(&self) -> Result<Url, ValidationError> {
        let url = Url::parse(&self.base_url).map_err(|_| ValidationError::InvalidApiUrl)?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(ValidationError::InvalidApiUrl),
        }
    }

    /// True when the API runs on this machine (local development)
    pub fn is_local_host(&self) -> bool {
        self.url()
            .ok()
            .and_then(|u| u.host_str().map(|h| h == "localhost" || h == "127.0.0.1"))
            .unwrap_or(false)
    }

    /// Validate API configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.url()?;
        if !(1..=120).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.from_location.trim().is_empty() {
            return Err(ValidationError::MissingRequired("api.from_location"));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            from_location: default_from_location(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_from_location() -> String {
    "kiosk-1".to_string()
}
