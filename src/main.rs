//! Kiosk session bridge binary.
//!
//! Reads commands from stdin so the bridge can be driven without kiosk
//! hardware:
//!
//! ```text
//! login <user> <pass>   logout   activity   key   route <room>
//! refresh   scan <user>   status   quit
//! ```

use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use unimate_kiosk::application::KioskApp;
use unimate_kiosk::config::{AppConfig, LogFormat, RuntimeConfig};
use unimate_kiosk::domain::idle::ActivitySignal;
use unimate_kiosk::domain::session::{RestoreOutcome, TimetableEvent};

fn init_tracing(runtime: &RuntimeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&runtime.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match runtime.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn timetable_lines(events: &[TimetableEvent]) -> Vec<String> {
    if events.is_empty() {
        return vec!["No upcoming events found".to_string()];
    }
    events
        .iter()
        .map(|event| format!("{}  {}", event.start_time, event.title))
        .collect()
}

fn print_timetable(events: &[TimetableEvent]) {
    for line in timetable_lines(events) {
        println!("{}", line);
    }
}

enum Flow {
    Continue,
    Quit,
}

async fn handle_command(app: &KioskApp, line: &str) -> Flow {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Flow::Continue;
    };

    match (command, parts.next(), parts.next()) {
        ("login", Some(user), Some(pass)) => {
            match app.login(user, SecretString::new(pass.to_string())).await {
                Ok(session) => println!("Logged in as {}", session.username().unwrap_or("-")),
                Err(e) => println!("{}", e.user_message()),
            }
        }
        ("logout", ..) => {
            if !app.logout().await {
                println!("Nobody is logged in");
            }
        }
        ("activity", ..) => {
            app.activity(ActivitySignal::PointerMove);
        }
        ("key", ..) => {
            app.activity(ActivitySignal::KeyPress);
        }
        ("route", Some(room), _) => match app.route_to(room).await {
            Some(route) => println!("Route with {} points", route.point_count()),
            None => println!("No route available"),
        },
        ("refresh", ..) => match app.refresh().await {
            Ok(events) => print_timetable(&events),
            Err(e) => println!("{}", e),
        },
        ("scan", Some(user), _) => {
            app.simulate_card_scan(user).await;
        }
        ("status", ..) => {
            let status = app.status();
            println!(
                "connection={} session={} user={} idle_remaining={:?}",
                status.connection,
                status.session,
                status.username.as_deref().unwrap_or("-"),
                status.idle_remaining,
            );
        }
        ("quit", ..) | ("exit", ..) => return Flow::Quit,
        _ => println!("Unknown command: {}", line.trim()),
    }
    Flow::Continue
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.runtime);

    let app = KioskApp::from_config(&config)?;
    let report = app.start().await;
    tracing::info!(restore = ?report.restore, connected = report.connected, "Kiosk ready");
    if let RestoreOutcome::Restored { .. } = report.restore {
        if let Some(session) = app.session().current() {
            println!("Welcome back {}", session.username().unwrap_or("-"));
            print_timetable(session.events());
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Flow::Quit = handle_command(&app, &line).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Cannot read input");
                    break;
                }
            },
        }
    }

    app.shutdown().await;
    Ok(())
}
