//! Mock kiosk API for testing.
//!
//! Accounts, timetables and route answers are configured up front; every
//! call is recorded for verification.
//!
//! # Example
//!
//! ```ignore
//! let api = MockKioskApi::new()
//!     .with_account("alice", "pw", LoginPayload::new("A", "R", "alice", vec![]))
//!     .with_events(Ok(vec![]));
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::route::{RouteRequest, RouteResult};
use crate::domain::session::{LoginPayload, TimetableEvent};
use crate::ports::{ApiError, KioskApi};

#[derive(Debug)]
struct MockState {
    accounts: HashMap<String, (String, LoginPayload)>,
    login_failure: Option<ApiError>,
    events: Result<Vec<TimetableEvent>, ApiError>,
    route: Result<RouteResult, ApiError>,
    login_calls: Vec<String>,
    event_calls: Vec<String>,
    route_calls: Vec<RouteRequest>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            login_failure: None,
            events: Ok(Vec::new()),
            route: Ok(RouteResult::default()),
            login_calls: Vec::new(),
            event_calls: Vec::new(),
            route_calls: Vec::new(),
        }
    }
}

/// Mock kiosk API.
#[derive(Debug, Clone, Default)]
pub struct MockKioskApi {
    state: Arc<Mutex<MockState>>,
    login_delay: Duration,
}

impl MockKioskApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Accept `username`/`password` and answer with `payload`.
    pub fn with_account(self, username: &str, password: &str, payload: LoginPayload) -> Self {
        self.state()
            .accounts
            .insert(username.to_string(), (password.to_string(), payload));
        self
    }

    /// Fail every login with `error`, regardless of credentials.
    pub fn with_login_failure(self, error: ApiError) -> Self {
        self.state().login_failure = Some(error);
        self
    }

    /// Hold every login response for `delay` before answering.
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay = delay;
        self
    }

    pub fn with_events(self, events: Result<Vec<TimetableEvent>, ApiError>) -> Self {
        self.set_events(events);
        self
    }

    pub fn with_route(self, route: Result<RouteResult, ApiError>) -> Self {
        self.set_route(route);
        self
    }

    pub fn set_events(&self, events: Result<Vec<TimetableEvent>, ApiError>) {
        self.state().events = events;
    }

    pub fn set_route(&self, route: Result<RouteResult, ApiError>) {
        self.state().route = route;
    }

    /// Usernames passed to `login`, in order.
    pub fn login_calls(&self) -> Vec<String> {
        self.state().login_calls.clone()
    }

    /// Access tokens passed to `events`, in order.
    pub fn event_calls(&self) -> Vec<String> {
        self.state().event_calls.clone()
    }

    pub fn route_calls(&self) -> Vec<RouteRequest> {
        self.state().route_calls.clone()
    }
}

#[async_trait]
impl KioskApi for MockKioskApi {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginPayload, ApiError> {
        let outcome = {
            let mut state = self.state();
            state.login_calls.push(username.to_string());
            match (&state.login_failure, state.accounts.get(username)) {
                (Some(error), _) => Err(error.clone()),
                (None, Some((expected, payload))) if expected == password.expose_secret() => {
                    Ok(payload.clone())
                }
                (None, _) => Err(ApiError::Unauthorized),
            }
        };

        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }
        outcome
    }

    async fn events(&self, access_token: &str) -> Result<Vec<TimetableEvent>, ApiError> {
        let mut state = self.state();
        state.event_calls.push(access_token.to_string());
        state.events.clone()
    }

    async fn route(&self, request: &RouteRequest) -> Result<RouteResult, ApiError> {
        let mut state = self.state();
        state.route_calls.push(request.clone());
        state.route.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::new(s.to_string())
    }

    #[tokio::test]
    async fn known_account_logs_in() {
        let api = MockKioskApi::new().with_account(
            "alice",
            "pw",
            LoginPayload::new("A", "R", "alice", vec![]),
        );

        let payload = api.login("alice", &secret("pw")).await.unwrap();
        assert_eq!(payload.access, "A");
        assert_eq!(api.login_calls(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let api = MockKioskApi::new().with_account(
            "alice",
            "pw",
            LoginPayload::new("A", "R", "alice", vec![]),
        );

        assert_eq!(
            api.login("alice", &secret("nope")).await.unwrap_err(),
            ApiError::Unauthorized
        );
        assert_eq!(
            api.login("bob", &secret("pw")).await.unwrap_err(),
            ApiError::Unauthorized
        );
    }

    #[tokio::test]
    async fn events_are_recorded_by_token() {
        let api = MockKioskApi::new().with_events(Err(ApiError::Timeout));

        assert_eq!(api.events("tok").await.unwrap_err(), ApiError::Timeout);
        assert_eq!(api.event_calls(), vec!["tok".to_string()]);
    }
}
