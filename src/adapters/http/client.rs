//! `reqwest` implementation of the kiosk REST API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::domain::route::{RouteRequest, RouteResult};
use crate::domain::session::{LoginPayload, TimetableEvent};
use crate::ports::{ApiError, KioskApi};

/// Connection settings for the kiosk backend.
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpApiConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// Kiosk REST client.
pub struct HttpKioskApi {
    base: Url,
    timeout: Duration,
    client: Client,
}

impl HttpKioskApi {
    /// Creates a client for the backend at `config.base_url`.
    pub fn new(config: HttpApiConfig) -> Result<Self, ApiError> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Network(format!("invalid base url: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base,
            timeout: config.timeout,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Network(format!("invalid endpoint {}: {}", path, e)))
    }

    fn route_url(&self, request: &RouteRequest) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/route/")?;
        url.query_pairs_mut()
            .append_pair("from", &request.from)
            .append_pair("to", &request.to);
        Ok(url)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            tracing::warn!(timeout_secs = self.timeout.as_secs(), "Kiosk API request timed out");
            ApiError::Timeout
        } else if e.is_connect() {
            tracing::warn!(error = %e, "Kiosk API unreachable");
            ApiError::Network(format!("Connection failed: {}", e))
        } else {
            ApiError::Network(e.to_string())
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("Failed to parse response: {}", e)))
    }
}

/// Maps a non-success status to an `ApiError`.
fn map_status(status: StatusCode, body: String) -> ApiError {
    match status.as_u16() {
        400 | 401 | 403 => ApiError::Unauthorized,
        code => {
            tracing::error!(status = code, "Kiosk API returned an error status");
            ApiError::Status { status: code, body }
        }
    }
}

#[async_trait]
impl KioskApi for HttpKioskApi {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginPayload, ApiError> {
        let response = self
            .client
            .post(self.endpoint("api/login/")?)
            .json(&LoginBody {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        Self::parse(response).await
    }

    async fn events(&self, access_token: &str) -> Result<Vec<TimetableEvent>, ApiError> {
        let response = self
            .client
            .get(self.endpoint("api/events/")?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        Self::parse(response).await
    }

    async fn route(&self, request: &RouteRequest) -> Result<RouteResult, ApiError> {
        let response = self
            .client
            .get(self.route_url(request)?)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        Self::parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpKioskApi {
        HttpKioskApi::new(HttpApiConfig::new(base, Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn endpoints_join_onto_base() {
        let api = api("http://localhost:8000");
        assert_eq!(
            api.endpoint("api/login/").unwrap().as_str(),
            "http://localhost:8000/api/login/"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let api = api("https://campus.example/unimate");
        assert_eq!(
            api.endpoint("api/events/").unwrap().as_str(),
            "https://campus.example/unimate/api/events/"
        );
    }

    #[test]
    fn route_url_carries_query() {
        let api = api("http://localhost:8000");
        let request = RouteRequest::new("kiosk-1", "ENG 401").unwrap();
        assert_eq!(
            api.route_url(&request).unwrap().as_str(),
            "http://localhost:8000/api/route/?from=kiosk-1&to=ENG+401"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpKioskApi::new(HttpApiConfig::new("::nope", Duration::from_secs(1))).is_err());
    }

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        for code in [400, 401, 403] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(map_status(status, String::new()), ApiError::Unauthorized);
        }
    }

    #[test]
    fn server_errors_keep_status_and_body() {
        let err = map_status(StatusCode::BAD_GATEWAY, "upstream down".into());
        assert_eq!(
            err,
            ApiError::Status {
                status: 502,
                body: "upstream down".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let api = HttpKioskApi::new(HttpApiConfig::new(
            "http://127.0.0.1:9",
            Duration::from_secs(2),
        ))
        .unwrap();
        let err = api.events("token").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_) | ApiError::Timeout));
    }
}
