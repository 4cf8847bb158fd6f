//! KioskApi port - The backend REST endpoints used by the kiosk.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::domain::route::{RouteRequest, RouteResult};
use crate::domain::session::{LoginPayload, TimetableEvent};

/// Errors from the kiosk REST API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server refused the credentials or token (400/401/403).
    #[error("unauthorized")]
    Unauthorized,

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("response decode failed: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Port for the kiosk backend.
#[async_trait]
pub trait KioskApi: Send + Sync {
    /// `POST /api/login/` - exchange credentials for tokens.
    async fn login(&self, username: &str, password: &SecretString)
        -> Result<LoginPayload, ApiError>;

    /// `GET /api/events/` - the user's timetable.
    async fn events(&self, access_token: &str) -> Result<Vec<TimetableEvent>, ApiError>;

    /// `GET /api/route/?from=..&to=..` - walking route between two rooms.
    async fn route(&self, request: &RouteRequest) -> Result<RouteResult, ApiError>;
}
