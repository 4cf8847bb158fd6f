//! End-to-end tests for the kiosk session bridge.
//!
//! Every test wires a full `KioskApp` against mock adapters:
//! - `MockGatewayConnector` stands in for the realtime gateway
//! - `MockKioskApi` stands in for the REST backend
//! - `ManualScheduler` drives reconnect and idle timers on a virtual clock

use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use unimate_kiosk::adapters::{
    FileTokenStorage, InMemoryTokenStorage, ManualScheduler, MockGatewayConnector, MockKioskApi,
};
use unimate_kiosk::application::{ConnectionSettings, KioskApp, KioskPorts, KioskSettings, SessionSettings};
use unimate_kiosk::domain::connection::{ConnectionState, ReconnectPolicy};
use unimate_kiosk::domain::idle::ActivitySignal;
use unimate_kiosk::domain::session::{
    AuthError, LoginNotice, LoginPayload, LoginSource, RestoreOutcome, SessionStatus, StoredTokens,
};
use unimate_kiosk::ports::{ApiError, TokenStorage, Topic};

// =============================================================================
// Test Infrastructure
// =============================================================================

const GATEWAY: &str = "ws://kiosk.test/ws/unimate/";
const IDLE: Duration = Duration::from_secs(180);

struct Harness {
    app: KioskApp,
    api: MockKioskApi,
    connector: MockGatewayConnector,
    scheduler: Arc<ManualScheduler>,
}

fn settings() -> KioskSettings {
    KioskSettings {
        gateway_url: Some(GATEWAY.to_string()),
        connection: ConnectionSettings {
            policy: ReconnectPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30), 5),
            kiosk_id: None,
            disabled: false,
        },
        session: SessionSettings::default(),
        idle_timeout: IDLE,
        from_location: "kiosk-1".to_string(),
    }
}

fn harness_with(
    api: MockKioskApi,
    storage: Arc<dyn TokenStorage>,
    settings: KioskSettings,
) -> Harness {
    let connector = MockGatewayConnector::new();
    let scheduler = Arc::new(ManualScheduler::new());
    let app = KioskApp::new(
        KioskPorts {
            api: Arc::new(api.clone()),
            storage,
            connector: Arc::new(connector.clone()),
            scheduler: scheduler.clone(),
        },
        settings,
    );
    Harness {
        app,
        api,
        connector,
        scheduler,
    }
}

fn harness() -> Harness {
    let api = MockKioskApi::new().with_account(
        "alice",
        "pw",
        LoginPayload::new("A", "R", "alice", vec![]),
    );
    harness_with(api, Arc::new(InMemoryTokenStorage::new()), settings())
}

fn secret(s: &str) -> SecretString {
    SecretString::new(s.to_string())
}

/// Lets spawned socket reader tasks drain their queues.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn login_notices(h: &Harness) -> Vec<LoginNotice> {
    h.app
        .bus()
        .events_of_topic(Topic::AuthLoginSuccess)
        .iter()
        .map(|e| e.payload_as().unwrap())
        .collect()
}

// =============================================================================
// Startup
// =============================================================================

#[tokio::test]
async fn local_startup_without_token_shows_demo_and_skips_gateway() {
    let mut demo = settings();
    demo.session = SessionSettings {
        demo_mode: true,
        ..SessionSettings::default()
    };
    let h = harness_with(MockKioskApi::new(), Arc::new(InMemoryTokenStorage::new()), demo);

    let report = h.app.start().await;

    assert_eq!(report.restore, RestoreOutcome::Demo);
    assert!(!report.connected);
    assert_eq!(h.connector.attempt_count(), 0);

    let notices = login_notices(&h);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].source, LoginSource::Demo);
    let titles: Vec<_> = notices[0].events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["ENGGEN205 Lecture", "STATS100 Mid-term Exam"]);
}

#[tokio::test]
async fn stored_token_with_empty_timetable_stays_logged_in() {
    let storage = InMemoryTokenStorage::with_tokens(StoredTokens {
        access_token: "T".to_string(),
        refresh_token: "R".to_string(),
        username: Some("alice".to_string()),
    });
    let h = harness_with(
        MockKioskApi::new().with_events(Ok(vec![])),
        Arc::new(storage),
        settings(),
    );

    let report = h.app.start().await;

    assert_eq!(report.restore, RestoreOutcome::Restored { events: 0, fresh: true });
    assert_eq!(h.app.status().session, SessionStatus::LoggedIn);
    assert_eq!(h.api.event_calls(), vec!["T".to_string()]);
    assert!(login_notices(&h)[0].events.is_empty());
    assert_eq!(h.app.connection().state(), ConnectionState::Connected);
}

#[tokio::test]
async fn session_survives_restart_through_token_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.yaml");

    let first = harness_with(
        MockKioskApi::new().with_account("alice", "pw", LoginPayload::new("A", "R", "alice", vec![])),
        Arc::new(FileTokenStorage::new(&path)),
        settings(),
    );
    first.app.login("alice", secret("pw")).await.unwrap();
    first.app.shutdown().await;

    let second = harness_with(MockKioskApi::new(), Arc::new(FileTokenStorage::new(&path)), settings());
    let report = second.app.start().await;

    assert!(report.restore.is_logged_in());
    let session = second.app.session().current().unwrap();
    assert_eq!(session.access_token, "A");
    assert_eq!(session.refresh_token, "R");
    assert_eq!(session.username(), Some("alice"));
}

// =============================================================================
// Pushed login
// =============================================================================

#[tokio::test]
async fn pushed_login_frame_creates_session_once() {
    let h = harness();
    h.app.start().await;
    let gateway = h.connector.last_link().unwrap();

    gateway.push_frame(
        json!({
            "type": "user.login",
            "message": {"access": "A", "refresh": "R", "user": {"username": "alice", "events": []}}
        })
        .to_string(),
    );
    settle().await;

    let session = h.app.session().current().unwrap();
    assert_eq!(session.access_token, "A");
    assert_eq!(session.refresh_token, "R");
    assert_eq!(session.username(), Some("alice"));
    assert!(session.events().is_empty());

    let notices = login_notices(&h);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].source, LoginSource::CardScan);
}

#[tokio::test]
async fn malformed_and_unknown_frames_keep_connection_open() {
    let h = harness();
    h.app.start().await;
    let gateway = h.connector.last_link().unwrap();

    gateway.push_frame("{not json");
    gateway.push_frame(json!({"type": "card_scan", "message": {"access": "X"}}).to_string());
    gateway.push_frame(json!({"type": "user.login", "message": {"refresh": "R"}}).to_string());
    settle().await;

    assert_eq!(h.app.connection().state(), ConnectionState::Connected);
    assert_eq!(h.app.status().session, SessionStatus::LoggedOut);
    assert!(login_notices(&h).is_empty());
}

#[tokio::test]
async fn kiosk_registers_on_open() {
    let mut kiosk = settings();
    kiosk.connection.kiosk_id = Some("lobby-2".to_string());
    let h = harness_with(MockKioskApi::new(), Arc::new(InMemoryTokenStorage::new()), kiosk);

    h.app.start().await;

    let sent = h.connector.last_link().unwrap().sent_frames();
    let first: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(first, json!({"type": "register_kiosk", "kiosk_id": "lobby-2"}));
}

// =============================================================================
// Idle timeout
// =============================================================================

#[tokio::test]
async fn activity_pushes_idle_deadline_out() {
    let h = harness();
    h.app.login("alice", secret("pw")).await.unwrap();

    h.scheduler.advance(Duration::from_secs(170)).await;
    assert!(h.app.activity(ActivitySignal::PointerMove));

    // Original deadline (t=180) passes without a logout
    h.scheduler.advance(Duration::from_secs(179)).await;
    assert_eq!(h.app.status().session, SessionStatus::LoggedIn);
    assert_eq!(h.scheduler.pending_count(), 1);

    // t=350
    h.scheduler.advance(Duration::from_secs(1)).await;
    assert_eq!(h.app.status().session, SessionStatus::LoggedOut);
    assert_eq!(h.app.bus().events_of_topic(Topic::AuthLogout).len(), 1);
}

#[tokio::test]
async fn activity_while_logged_out_is_ignored() {
    let h = harness();
    assert!(!h.app.activity(ActivitySignal::KeyPress));
    assert_eq!(h.scheduler.pending_count(), 0);
}

// =============================================================================
// Reconnect
// =============================================================================

#[tokio::test]
async fn error_then_close_schedules_one_reconnect() {
    let h = harness();
    h.app.start().await;
    let gateway = h.connector.last_link().unwrap();

    gateway.push_error("reset by peer");
    gateway.close(Some(1006), "abnormal");
    settle().await;

    assert_eq!(h.scheduler.pending_delays(), vec![Duration::from_secs(1)]);
    assert_eq!(h.app.connection().state(), ConnectionState::Disconnected);

    gateway.push_error("again");
    settle().await;
    assert_eq!(h.scheduler.pending_count(), 1);

    h.scheduler.advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(h.connector.accepted_count(), 2);
    assert_eq!(h.connector.live_links(), 1);
    assert_eq!(h.app.connection().state(), ConnectionState::Connected);
}

#[tokio::test]
async fn shutdown_cancels_pending_reconnect() {
    let h = harness();
    h.app.start().await;
    h.connector.last_link().unwrap().close(Some(1001), "going away");
    settle().await;
    assert!(h.app.connection().is_reconnect_pending());

    h.app.shutdown().await;

    assert_eq!(h.scheduler.pending_count(), 0);
    assert_eq!(h.app.connection().state(), ConnectionState::Disconnected);
    h.scheduler.advance(Duration::from_secs(60)).await;
    assert_eq!(h.connector.attempt_count(), 1);
}

#[tokio::test]
async fn repeated_start_and_shutdown_never_holds_two_sockets() {
    let h = harness();
    for _ in 0..3 {
        h.app.start().await;
        h.app.start().await;
        settle().await;
        assert!(h.connector.live_links() <= 1);
        h.app.shutdown().await;
        settle().await;
        assert_eq!(h.connector.live_links(), 0);
    }
}

// =============================================================================
// Credential login
// =============================================================================

#[tokio::test]
async fn rejected_login_leaves_kiosk_logged_out() {
    let storage = InMemoryTokenStorage::new();
    let h = harness_with(
        MockKioskApi::new().with_login_failure(ApiError::Unauthorized),
        Arc::new(storage.clone()),
        settings(),
    );

    let err = h.app.login("alice", secret("wrong")).await.unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(err.user_message(), "Invalid credentials");
    assert_eq!(h.app.status().session, SessionStatus::LoggedOut);
    assert_eq!(storage.save_count(), 0);
    assert_eq!(storage.snapshot().await, None);
}

#[tokio::test]
async fn rest_and_pushed_logins_are_indistinguishable() {
    let h = harness();
    let via_rest = h.app.login("alice", secret("pw")).await.unwrap();
    h.app.logout().await;

    h.app.start().await;
    h.connector.last_link().unwrap().push_frame(
        json!({
            "type": "user.login",
            "message": {"access": "A", "refresh": "R", "user": {"username": "alice", "events": []}}
        })
        .to_string(),
    );
    settle().await;

    assert_eq!(h.app.session().current().unwrap(), via_rest);
}

#[tokio::test]
async fn route_request_is_published_for_map() {
    let h = harness();
    h.api.set_route(Ok(serde_json::from_value(json!({
        "features": [{"geometry": {"coordinates": [[0.0, 0.0, 0.0], [3.0, 4.0, 0.0]]}}]
    }))
    .unwrap()));

    let route = h.app.route_to("340").await.unwrap();

    assert_eq!(route.point_count(), 2);
    assert!(h.app.bus().has_event(Topic::VisualizeRoute));
}
