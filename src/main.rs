//! Kiosk Station: walk-up health kiosk
//!
//! Main entry point that wires the registry client, the push channel, and
//! the session state machine together and drives visits from the console.
//!
//! Console protocol, one line per input:
//! - a profile JSON object starts a visit
//! - `retry` / `cancel` answer a failed commit
//! - `leave`, `reset`, `status` act on the current visit
//!
//! Session events are written to stdout as JSON lines.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt};

use kiosk_core::config::AppConfig;
use kiosk_core::error::AppError;
use kiosk_core::events::KioskEvent;
use kiosk_core::types::Profile;
use kiosk_realtime::WsPushChannel;
use kiosk_registry::HttpRegistryClient;
use kiosk_session::{Kiosk, VisitHandle};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Station error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("KIOSK_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    AppConfig::load(&config_path)
        .map_err(|e| {
            AppError::configuration(format!("Config load error ({}): {}", config_path, e))
        })
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Logs go to stderr so stdout carries only session events.
    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Main station run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Kiosk Station v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        registry = %config.registry.base_url,
        telemetry = %config.telemetry.ws_url,
        "Collaborators configured"
    );

    let registry = Arc::new(HttpRegistryClient::new(&config.registry)?);
    let channels = Arc::new(WsPushChannel::new(config.telemetry.clone()));
    let kiosk = Kiosk::new(config, registry, channels);

    let printer = tokio::spawn(print_events(kiosk.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut visit: Option<VisitHandle> = None;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tracing::info!("Station ready, waiting for a visitor profile");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = released(&visit) => {
                if let Some(handle) = visit.take() {
                    finish(handle).await;
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&kiosk, &mut visit, line.trim()).await,
                Ok(None) => {
                    tracing::info!("Console closed");
                    break;
                }
                Err(e) => {
                    tracing::error!("Console read failed: {}", e);
                    break;
                }
            },
        }
    }

    if let Some(handle) = visit.take() {
        handle.shutdown().await;
        finish(handle).await;
    }

    // Last sender gone: the printer drains what is left and stops.
    drop(kiosk);
    if let Err(e) = printer.await {
        tracing::warn!("Event printer ended abnormally: {}", e);
    }
    tracing::info!("Kiosk Station shut down");
    Ok(())
}

/// Apply one console line to the station.
async fn handle_line(kiosk: &Kiosk, visit: &mut Option<VisitHandle>, line: &str) {
    if line.is_empty() {
        return;
    }

    if line.starts_with('{') {
        if visit.is_some() {
            tracing::warn!("A visit is already in progress; leave or reset first");
            return;
        }
        let profile: Profile = match serde_json::from_str(line) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Invalid profile: {}", e);
                return;
            }
        };
        match kiosk.start_visit(&profile).await {
            Ok(handle) => *visit = Some(handle),
            Err(e) => tracing::warn!("Registration failed: {}", e),
        }
        return;
    }

    let Some(handle) = visit.as_ref() else {
        tracing::warn!("No visit in progress");
        return;
    };

    match line {
        "retry" => {
            if let Err(e) = handle.retry().await {
                tracing::warn!("Retry refused: {}", e);
            }
        }
        "cancel" => {
            if let Err(e) = handle.cancel().await {
                tracing::warn!("Cancel refused: {}", e);
            }
        }
        "leave" => handle.leave().await,
        "reset" => handle.reset().await,
        "status" => match serde_json::to_string(&handle.view()) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!("Cannot render view: {}", e),
        },
        other => tracing::warn!("Unknown command '{}'", other),
    }
}

/// Resolves when the current visit is released; never while idle.
async fn released(visit: &Option<VisitHandle>) {
    match visit {
        Some(handle) => handle.released().await,
        None => std::future::pending().await,
    }
}

async fn finish(handle: VisitHandle) {
    match handle.finished().await {
        Ok(outcome) => tracing::info!(
            session_id = %outcome.session_id,
            reason = %outcome.reason,
            committed = outcome.committed,
            "Visit finished, station ready"
        ),
        Err(e) => tracing::error!("Visit ended abnormally: {}", e),
    }
}

/// Write every session event to stdout as a JSON line.
async fn print_events(mut events: broadcast::Receiver<KioskEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!("Cannot render event: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event printer lagged, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
