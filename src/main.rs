//! NotifyHub Agent, a headless notification client
//!
//! Wires the REST client, the WebSocket hub transport, and the notification
//! session together, then logs store changes until Ctrl-C.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use notifyhub_client::HttpNotificationApi;
use notifyhub_core::config::AppConfig;
use notifyhub_core::error::AppError;
use notifyhub_core::traits::StaticToken;
use notifyhub_realtime::{NotificationSession, WsHubTransport};

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
        tracing::error!("Agent error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("NOTIFYHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting NotifyHub agent v{}", env!("CARGO_PKG_VERSION"));

    let credentials = Arc::new(StaticToken::new(config.auth.access_token.clone()));
    if config.auth.access_token.is_none() {
        tracing::warn!("No access token configured; push delivery stays off");
    }

    let api = Arc::new(HttpNotificationApi::new(&config.api, credentials.clone())?);
    let transport = Arc::new(WsHubTransport::new(&config.realtime));
    let session = NotificationSession::new(&config, api, transport, credentials);

    let mut snapshots = session.subscribe();
    let watcher = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snap = snapshots.borrow_and_update().clone();
            tracing::info!(
                state = %snap.connection_state,
                unread = snap.unread_count,
                shown = snap.notifications.len(),
                page = snap.cursor.page_number,
                "Notifications updated"
            );
            if let Some(latest) = snap.notifications.first() {
                tracing::debug!(
                    id = latest.id,
                    title = %latest.title,
                    route = ?latest.route(),
                    "Latest notification"
                );
            }
        }
    });

    session.start().await;
    tracing::info!(state = %session.connection_state(), "Notification session started");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for Ctrl-C: {e}")))?;

    tracing::info!("Shutting down");
    session.dispose();
    watcher.abort();
    tracing::info!(metrics = ?session.metrics.snapshot(), "Agent stopped");
    Ok(())
}
