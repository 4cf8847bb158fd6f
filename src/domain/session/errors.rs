//! Authentication error types.

use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// Errors raised by the Session Store.
///
/// Only `InvalidCredentials`, `Network` and `Storage` are meant for the
/// person at the kiosk; everything else is logged at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Login payload rejected: {0}")]
    InvalidPayload(#[from] ValidationError),

    #[error("Access token rejected by the API")]
    Unauthorized,

    #[error("API unreachable: {0}")]
    Network(String),

    #[error("Could not persist session: {0}")]
    Storage(String),

    #[error("Login response arrived after the session changed")]
    Superseded,

    #[error("No active session")]
    NotLoggedIn,
}

impl AuthError {
    /// Message suitable for an inline error on the login screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::Network(_) => "Service unavailable, please try again",
            _ => "Login failed",
        }
    }
}
