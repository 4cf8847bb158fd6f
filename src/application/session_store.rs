//! SessionStore - The single owner of "who is logged in".
//!
//! Reconciles the REST login form and pushed card-scan logins into one
//! state machine. Both paths end in `establish`, which persists the
//! tokens, makes the session current, broadcasts `auth-login-success` and
//! arms the idle supervisor, in that order.
//!
//! Every change of session bumps an epoch. Work that suspends (HTTP calls,
//! storage writes) captures the epoch first and drops its result if the
//! epoch moved on, so a late response can never revive a session that was
//! logged out in the meantime. Login attempts draw a separate ticket so a
//! failed attempt leaves the current session, and its idle timer, alone.
//!
//! Token writes are serialized: whatever reaches storage last matches the
//! in-memory session.

use async_trait::async_trait;
use futures::FutureExt;
use secrecy::SecretString;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::idle_supervisor::{ExpireAction, IdleSupervisor};
use crate::domain::foundation::{StateMachine, Timestamp};
use crate::domain::session::{
    demo_events, AuthError, LoginNotice, LoginPayload, LoginSource, RestoreOutcome, RestorePolicy,
    Session, SessionStatus, TimetableEvent,
};
use crate::ports::{
    ApiError, BusEvent, EventHandler, EventPublisher, EventSubscriber, HandlerError, KioskApi,
    Subscription, TokenStorage, Topic,
};

/// Startup behaviour of a `SessionStore`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSettings {
    pub restore_policy: RestorePolicy,
    /// Broadcast the demo timetable when nothing is stored.
    pub demo_mode: bool,
}

#[derive(Default)]
struct SessionInner {
    status: SessionStatus,
    session: Option<Session>,
    /// Bumped whenever the current session changes.
    epoch: u64,
    /// Bumped by every login attempt.
    ticket: u64,
}

/// A login attempt in flight.
#[derive(Debug, Clone, Copy)]
struct Attempt {
    ticket: u64,
    epoch: u64,
}

impl SessionInner {
    fn move_to(&mut self, next: SessionStatus) {
        if self.status == next {
            return;
        }
        match self.status.transition_to(next) {
            Ok(status) => self.status = status,
            Err(e) => tracing::error!(error = %e, "Rejected session state change"),
        }
    }

    fn is_current(&self, attempt: Attempt) -> bool {
        self.ticket == attempt.ticket && self.epoch == attempt.epoch
    }

    /// Status implied by whether a session is held.
    fn settled_status(&self) -> SessionStatus {
        if self.session.is_some() {
            SessionStatus::LoggedIn
        } else {
            SessionStatus::LoggedOut
        }
    }
}

struct SessionShared {
    api: Arc<dyn KioskApi>,
    storage: Arc<dyn TokenStorage>,
    publisher: Arc<dyn EventPublisher>,
    idle: IdleSupervisor,
    settings: SessionSettings,
    inner: Mutex<SessionInner>,
    writes: tokio::sync::Mutex<()>,
}

/// Authoritative session state for the kiosk.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<SessionShared>,
}

fn login_error(e: ApiError) -> AuthError {
    match e {
        ApiError::Unauthorized => AuthError::InvalidCredentials,
        other => AuthError::Network(other.to_string()),
    }
}

fn fetch_error(e: ApiError) -> AuthError {
    match e {
        ApiError::Unauthorized => AuthError::Unauthorized,
        other => AuthError::Network(other.to_string()),
    }
}

impl SessionStore {
    pub fn new(
        api: Arc<dyn KioskApi>,
        storage: Arc<dyn TokenStorage>,
        publisher: Arc<dyn EventPublisher>,
        idle: IdleSupervisor,
        settings: SessionSettings,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                api,
                storage,
                publisher,
                idle,
                settings,
                inner: Mutex::new(SessionInner::default()),
                writes: tokio::sync::Mutex::new(()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Listen for pushed logins on `user-login`.
    pub fn subscribe_to(&self, subscriber: &dyn EventSubscriber) -> Subscription {
        subscriber.subscribe(
            Topic::UserLogin,
            Arc::new(PushedLoginHandler {
                store: Arc::downgrade(&self.shared),
            }),
        )
    }

    // === Accessors ===

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn is_logged_in(&self) -> bool {
        self.status().is_logged_in()
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    pub fn username(&self) -> Option<String> {
        self.lock()
            .session
            .as_ref()
            .and_then(|s| s.username().map(str::to_string))
    }

    pub fn idle(&self) -> &IdleSupervisor {
        &self.shared.idle
    }

    // === Login paths ===

    /// REST login. On failure the previous state is kept and nothing is
    /// persisted.
    pub async fn login_with_credentials(
        &self,
        username: &str,
        password: SecretString,
    ) -> Result<Session, AuthError> {
        let attempt = self.begin_attempt(true);

        tracing::info!(username, "Logging in with credentials");
        match self.shared.api.login(username, &password).await {
            Ok(payload) => match Session::from_login(payload) {
                Ok(session) => {
                    self.establish(session, LoginSource::Credentials, attempt)
                        .await
                }
                Err(e) => {
                    self.abandon(attempt);
                    Err(e.into())
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Credential login failed");
                self.abandon(attempt);
                Err(login_error(e))
            }
        }
    }

    /// Pushed login from the gateway. Invalid payloads are logged and
    /// dropped without touching the current state.
    pub async fn apply_pushed_login(&self, payload: LoginPayload) -> Result<Session, AuthError> {
        let result = match Session::from_login(payload) {
            Ok(session) => {
                let attempt = self.begin_attempt(false);
                self.establish(session, LoginSource::CardScan, attempt)
                    .await
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Pushed login dropped");
        }
        result
    }

    fn begin_attempt(&self, logging_in: bool) -> Attempt {
        let mut inner = self.lock();
        inner.ticket += 1;
        if logging_in {
            inner.move_to(SessionStatus::LoggingIn);
        }
        Attempt {
            ticket: inner.ticket,
            epoch: inner.epoch,
        }
    }

    async fn establish(
        &self,
        session: Session,
        source: LoginSource,
        attempt: Attempt,
    ) -> Result<Session, AuthError> {
        let writes = self.shared.writes.lock().await;
        if !self.lock().is_current(attempt) {
            tracing::debug!("Login result arrived after the session changed");
            return Err(AuthError::Superseded);
        }

        if let Err(e) = self.shared.storage.save(&session.to_stored()).await {
            tracing::error!(error = %e, "Could not persist session tokens");
            self.abandon(attempt);
            return Err(AuthError::Storage(e.to_string()));
        }

        let epoch = {
            let mut inner = self.lock();
            if inner.is_current(attempt) {
                inner.epoch += 1;
                inner.session = Some(session.clone());
                inner.move_to(SessionStatus::LoggedIn);
                Some(inner.epoch)
            } else {
                None
            }
        };
        let Some(epoch) = epoch else {
            tracing::debug!("Session changed while tokens were being saved");
            self.resync_storage().await;
            return Err(AuthError::Superseded);
        };
        drop(writes);

        tracing::info!(
            ?source,
            user = session.username().unwrap_or("-"),
            events = session.events().len(),
            "Session established"
        );
        self.publish_login(&LoginNotice::for_session(&session, source))
            .await;
        self.arm_idle(epoch);

        Ok(session)
    }

    /// Rewrites storage to match the current session. Callers hold `writes`.
    async fn resync_storage(&self) {
        let current = self.lock().session.as_ref().map(Session::to_stored);
        let result = match current {
            Some(tokens) => self.shared.storage.save(&tokens).await,
            None => self.shared.storage.clear().await,
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "Could not resync stored tokens");
        }
    }

    /// Puts the status back after a login attempt that went nowhere.
    fn abandon(&self, attempt: Attempt) {
        let mut inner = self.lock();
        if inner.ticket == attempt.ticket && inner.status == SessionStatus::LoggingIn {
            let settled = inner.settled_status();
            inner.move_to(settled);
        }
    }

    // === Logout ===

    /// Ends the current session. Returns false (and does nothing visible)
    /// when nobody is logged in.
    pub async fn logout(&self) -> bool {
        self.end_session("logout").await
    }

    async fn end_session(&self, reason: &'static str) -> bool {
        let ended = {
            let mut inner = self.lock();
            inner.epoch += 1;
            let had_session = inner.session.take().is_some();
            inner.move_to(SessionStatus::LoggedOut);
            had_session
        };
        self.shared.idle.disarm();

        {
            let _writes = self.shared.writes.lock().await;
            if let Err(e) = self.shared.storage.clear().await {
                tracing::error!(error = %e, "Could not clear stored tokens");
            }
        }
        if !ended {
            return false;
        }

        tracing::info!(reason, "Session ended");
        self.shared
            .publisher
            .publish(BusEvent::new(Topic::AuthLogout, json!({ "reason": reason })))
            .await;
        true
    }

    fn arm_idle(&self, epoch: u64) {
        let inner = self.lock();
        if inner.epoch != epoch || !inner.status.is_logged_in() {
            return;
        }
        let shared = Arc::downgrade(&self.shared);
        let action: ExpireAction = Arc::new(move || {
            let shared = shared.clone();
            async move {
                if let Some(shared) = shared.upgrade() {
                    SessionStore { shared }.expire_idle(epoch).await;
                }
            }
            .boxed()
        });
        self.shared.idle.arm(action);
    }

    async fn expire_idle(&self, epoch: u64) {
        let current = self.lock().epoch == epoch;
        if current {
            self.end_session("idle_timeout").await;
        }
    }

    // === Startup and refresh ===

    /// Restores a stored session at startup.
    ///
    /// The stored user is treated as logged in straight away and the
    /// timetable is fetched. If the fetch fails the lenient policy keeps
    /// the session with an empty timetable; the strict policy logs out.
    pub async fn restore_from_storage(&self) -> RestoreOutcome {
        let stored = match self.shared.storage.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Stored session unreadable");
                None
            }
        };

        let session = match stored.map(Session::from_stored) {
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Stored session rejected");
                return self.no_session().await;
            }
            None => return self.no_session().await,
        };

        let epoch = {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.session = Some(session.clone());
            inner.move_to(SessionStatus::LoggedIn);
            inner.epoch
        };
        tracing::info!(user = session.username().unwrap_or("-"), "Restoring stored session");

        let (events, fresh) = match self.shared.api.events(&session.access_token).await {
            Ok(events) => (events, true),
            Err(e) => match self.shared.settings.restore_policy {
                RestorePolicy::Lenient => {
                    tracing::warn!(error = %e, "Timetable fetch failed, keeping session");
                    (Vec::new(), false)
                }
                RestorePolicy::Strict => {
                    tracing::warn!(error = %e, "Timetable fetch failed, logging out");
                    let current = self.lock().epoch == epoch;
                    if current {
                        self.end_session("restore_failed").await;
                    }
                    return RestoreOutcome::LoggedOut;
                }
            },
        };

        let notice = {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                return RestoreOutcome::LoggedOut;
            }
            let session = session.with_events(events.clone());
            let notice = LoginNotice {
                source: LoginSource::Restored,
                user: session.user.clone(),
                events,
            };
            inner.session = Some(session);
            notice
        };

        let count = notice.events.len();
        self.publish_login(&notice).await;
        self.arm_idle(epoch);

        RestoreOutcome::Restored {
            events: count,
            fresh,
        }
    }

    async fn no_session(&self) -> RestoreOutcome {
        if !self.shared.settings.demo_mode {
            return RestoreOutcome::LoggedOut;
        }
        tracing::info!("No stored session, showing demo timetable");
        let notice = LoginNotice {
            source: LoginSource::Demo,
            user: None,
            events: demo_events(Timestamp::now()),
        };
        self.publish_login(&notice).await;
        RestoreOutcome::Demo
    }

    /// Re-fetches the timetable for the current session and broadcasts it
    /// on `timetable-refreshed`.
    pub async fn refresh_events(&self) -> Result<Vec<TimetableEvent>, AuthError> {
        let (token, epoch) = {
            let inner = self.lock();
            let session = inner.session.as_ref().ok_or(AuthError::NotLoggedIn)?;
            (session.access_token.clone(), inner.epoch)
        };

        let events = self
            .shared
            .api
            .events(&token)
            .await
            .map_err(fetch_error)?;

        {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                return Err(AuthError::Superseded);
            }
            if let Some(session) = inner.session.take() {
                inner.session = Some(session.with_events(events.clone()));
            }
        }

        tracing::debug!(events = events.len(), "Timetable refreshed");
        self.shared
            .publisher
            .publish(BusEvent::new(
                Topic::TimetableRefreshed,
                json!({ "events": events }),
            ))
            .await;
        Ok(events)
    }

    async fn publish_login(&self, notice: &LoginNotice) {
        match BusEvent::with_payload(Topic::AuthLoginSuccess, notice) {
            Ok(event) => {
                self.shared.publisher.publish(event).await;
            }
            Err(e) => tracing::error!(error = %e, "Cannot encode login notice"),
        }
    }
}

/// Feeds `user-login` bus events into `apply_pushed_login`.
struct PushedLoginHandler {
    store: Weak<SessionShared>,
}

#[async_trait]
impl EventHandler for PushedLoginHandler {
    async fn handle(&self, event: BusEvent) -> Result<(), HandlerError> {
        let Some(shared) = self.store.upgrade() else {
            return Ok(());
        };
        let payload: LoginPayload = event.payload_as()?;
        // Failures are logged by the store
        let _ = SessionStore { shared }.apply_pushed_login(payload).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SessionStore"
    }
}
