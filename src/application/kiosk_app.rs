//! KioskApp - Composition root for the session bridge.
//!
//! Builds the bus, the scheduler-driven components and the adapters once,
//! and hands out clones. Nothing in the crate reaches for a global; every
//! component gets what it needs here.

use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{
    ConnectionManager, ConnectionSettings, Dispatch, IdleSupervisor, MessageRouter, RouteService,
    SessionSettings, SessionStore,
};
use crate::adapters::websocket::USER_LOGIN;
use crate::adapters::{
    FileTokenStorage, HttpApiConfig, HttpKioskApi, InMemoryEventBus, TokioScheduler,
    TungsteniteConnector,
};
use crate::config::{AppConfig, ValidationError};
use crate::domain::connection::ConnectionState;
use crate::domain::idle::ActivitySignal;
use crate::domain::route::RouteResult;
use crate::domain::session::{
    AuthError, RestoreOutcome, Session, SessionStatus, TimetableEvent,
};
use crate::ports::{
    ApiError, EventPublisher, GatewayConnector, KioskApi, Scheduler, TokenStorage,
};

/// Errors raised while wiring the application.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Cannot build API client: {0}")]
    Api(#[from] ApiError),
}

/// External collaborators the application runs against.
#[derive(Clone)]
pub struct KioskPorts {
    pub api: Arc<dyn KioskApi>,
    pub storage: Arc<dyn TokenStorage>,
    pub connector: Arc<dyn GatewayConnector>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Wiring decisions derived from configuration.
#[derive(Debug, Clone)]
pub struct KioskSettings {
    /// `None` runs REST-only.
    pub gateway_url: Option<String>,
    pub connection: ConnectionSettings,
    pub session: SessionSettings,
    pub idle_timeout: Duration,
    pub from_location: String,
}

impl KioskSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ValidationError> {
        let gateway_url = if config.gateway.enabled {
            Some(config.gateway_url()?)
        } else {
            None
        };

        Ok(Self {
            gateway_url,
            connection: ConnectionSettings {
                policy: config.gateway.policy(),
                kiosk_id: config.gateway.kiosk_id.clone(),
                disabled: !config.gateway.enabled,
            },
            session: SessionSettings {
                restore_policy: config.session.restore_policy,
                demo_mode: config.demo_mode(),
            },
            idle_timeout: config.session.idle_timeout(),
            from_location: config.api.from_location.clone(),
        })
    }
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            gateway_url: None,
            connection: ConnectionSettings::default(),
            session: SessionSettings::default(),
            idle_timeout: Duration::from_secs(180),
            from_location: "kiosk-1".to_string(),
        }
    }
}

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    pub restore: RestoreOutcome,
    /// True if a gateway connection attempt was made.
    pub connected: bool,
}

/// Snapshot for the status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskStatus {
    pub connection: ConnectionState,
    pub session: SessionStatus,
    pub username: Option<String>,
    pub idle_remaining: Option<Duration>,
}

/// The assembled kiosk session bridge.
#[derive(Clone)]
pub struct KioskApp {
    bus: Arc<InMemoryEventBus>,
    router: MessageRouter,
    connection: ConnectionManager,
    session: SessionStore,
    routes: RouteService,
    gateway_url: Option<String>,
}

impl KioskApp {
    /// Wires the application against the given ports.
    pub fn new(ports: KioskPorts, settings: KioskSettings) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let router = MessageRouter::new(publisher.clone());
        let connection = ConnectionManager::new(
            ports.connector,
            ports.scheduler.clone(),
            publisher.clone(),
            router.clone(),
            settings.connection,
        );
        let idle = IdleSupervisor::new(ports.scheduler, settings.idle_timeout);
        let session = SessionStore::new(
            ports.api.clone(),
            ports.storage,
            publisher.clone(),
            idle,
            settings.session,
        );
        // Lives as long as the bus
        session.subscribe_to(bus.as_ref());
        let routes = RouteService::new(ports.api, publisher, settings.from_location);

        Self {
            bus,
            router,
            connection,
            session,
            routes,
            gateway_url: settings.gateway_url,
        }
    }

    /// Production wiring: HTTP API, YAML token file, real sockets and tokio timers.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let settings = KioskSettings::from_config(config)?;

        let api = HttpKioskApi::new(HttpApiConfig::new(
            config.api.base_url.clone(),
            config.api.request_timeout(),
        ))?;
        let ports = KioskPorts {
            api: Arc::new(api),
            storage: Arc::new(FileTokenStorage::new(&config.session.token_path)),
            connector: Arc::new(
                TungsteniteConnector::new().with_connect_timeout(config.api.request_timeout()),
            ),
            scheduler: Arc::new(TokioScheduler::new()),
        };

        Ok(Self::new(ports, settings))
    }

    // === Accessors ===

    /// The bus consumers subscribe to.
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn routes(&self) -> &RouteService {
        &self.routes
    }

    pub fn status(&self) -> KioskStatus {
        KioskStatus {
            connection: self.connection.state(),
            session: self.session.status(),
            username: self.session.username(),
            idle_remaining: self.session.idle().remaining(),
        }
    }

    // === Lifecycle ===

    /// Restores any stored session, then opens the gateway connection.
    ///
    /// In demo mode the realtime connection is skipped entirely.
    pub async fn start(&self) -> StartupReport {
        let restore = self.session.restore_from_storage().await;
        tracing::info!(?restore, "Startup session state");

        let connected = match (&restore, &self.gateway_url) {
            (RestoreOutcome::Demo, _) => {
                tracing::info!("Demo mode, realtime connection skipped");
                false
            }
            (_, None) => {
                tracing::info!("Gateway disabled, running REST-only");
                false
            }
            (_, Some(url)) => self.connection.connect(url).await,
        };

        StartupReport { restore, connected }
    }

    /// Orderly teardown.
    pub async fn shutdown(&self) {
        self.connection.disconnect().await;
        self.session.idle().disarm();
        tracing::info!("Kiosk stopped");
    }

    // === Input ===

    pub async fn login(&self, username: &str, password: SecretString) -> Result<Session, AuthError> {
        self.session.login_with_credentials(username, password).await
    }

    pub async fn logout(&self) -> bool {
        self.session.logout().await
    }

    /// Pointer or key input from the kiosk.
    pub fn activity(&self, signal: ActivitySignal) -> bool {
        self.session.idle().record_activity(signal)
    }

    pub async fn refresh(&self) -> Result<Vec<TimetableEvent>, AuthError> {
        self.session.refresh_events().await
    }

    pub async fn route_to(&self, room: &str) -> Option<RouteResult> {
        self.routes.request_route(room).await
    }

    /// Feeds a synthetic `user.login` frame through the router, as if a
    /// card for `username` had been scanned.
    pub async fn simulate_card_scan(&self, username: &str) -> Dispatch {
        let frame = json!({
            "type": USER_LOGIN,
            "message": {
                "access": format!("scan-{}", uuid::Uuid::new_v4()),
                "refresh": "",
                "user": { "username": username, "events": [] },
            },
        });
        tracing::debug!(username, "Simulating card scan");
        self.router.handle_frame(&frame.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryTokenStorage, ManualScheduler, MockGatewayConnector, MockKioskApi};
    use crate::config::ReconnectStrategy;
    use crate::ports::Topic;

    fn app(settings: KioskSettings) -> (KioskApp, MockGatewayConnector) {
        let connector = MockGatewayConnector::new();
        let ports = KioskPorts {
            api: Arc::new(MockKioskApi::new()),
            storage: Arc::new(InMemoryTokenStorage::new()),
            connector: Arc::new(connector.clone()),
            scheduler: Arc::new(ManualScheduler::new()),
        };
        (KioskApp::new(ports, settings), connector)
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.gateway.kiosk_id = Some("lobby-2".to_string());
        config.gateway.reconnect_strategy = ReconnectStrategy::Fixed;
        config.session.idle_timeout_secs = 60;

        let settings = KioskSettings::from_config(&config).unwrap();

        assert_eq!(
            settings.gateway_url.as_deref(),
            Some("ws://localhost:8000/ws/kiosk/lobby-2/")
        );
        assert_eq!(settings.connection.kiosk_id.as_deref(), Some("lobby-2"));
        assert_eq!(settings.idle_timeout, Duration::from_secs(60));
        assert!(settings.session.demo_mode);
        assert!(matches!(
            settings.connection.policy,
            crate::domain::connection::ReconnectPolicy::Fixed { .. }
        ));
    }

    #[test]
    fn disabled_gateway_has_no_url() {
        let mut config = AppConfig::default();
        config.gateway.enabled = false;

        let settings = KioskSettings::from_config(&config).unwrap();

        assert!(settings.gateway_url.is_none());
        assert!(settings.connection.disabled);
    }

    #[tokio::test]
    async fn start_without_gateway_stays_rest_only() {
        let (app, connector) = app(KioskSettings::default());

        let report = app.start().await;

        assert_eq!(report.restore, RestoreOutcome::LoggedOut);
        assert!(!report.connected);
        assert_eq!(connector.attempt_count(), 0);
    }

    #[tokio::test]
    async fn simulated_scan_logs_in() {
        let (app, _connector) = app(KioskSettings::default());

        let dispatch = app.simulate_card_scan("carol").await;

        assert_eq!(dispatch, Dispatch::Published(Topic::UserLogin));
        assert_eq!(app.status().username.as_deref(), Some("carol"));
        assert_eq!(app.status().session, SessionStatus::LoggedIn);
        assert!(app.status().idle_remaining.is_some());
    }
}
