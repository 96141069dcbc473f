//! Shared test helpers for integration tests.
//!
//! `Backend` is an in-memory REST notification service on axum; `Hub` is a
//! JSON-protocol push hub on tokio-tungstenite that tests can drive.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use notifyhub_client::HttpNotificationApi;
use notifyhub_core::config::AppConfig;
use notifyhub_core::traits::StaticToken;
use notifyhub_realtime::{NotificationSession, WsHubTransport};

const RS: char = '\u{1e}';

/// Backend state, shared with handlers
#[derive(Debug, Default)]
pub struct BackendState {
    pub rows: Vec<Value>,
    pub unread: u64,
    pub history_calls: usize,
    pub marked: Vec<i64>,
    pub mark_all_calls: usize,
}

/// In-memory REST backend
#[derive(Clone)]
pub struct Backend {
    pub base_url: String,
    state: Arc<Mutex<BackendState>>,
}

impl Backend {
    /// Start the backend on an ephemeral port
    pub async fn spawn() -> Self {
        let state = Arc::new(Mutex::new(BackendState::default()));
        let router = Router::new()
            .route("/api/notifications", get(history))
            .route("/api/notifications/unread-count", get(unread_count))
            .route("/api/notifications/{id}/mark-as-read", put(mark_as_read))
            .route("/api/notifications/mark-all-as-read", put(mark_all_as_read))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Replace the stored rows; the unread count follows them
    pub fn set_rows(&self, rows: Vec<Value>) {
        self.with(|s| {
            s.unread = rows
                .iter()
                .filter(|r| !r.get("isRead").and_then(Value::as_bool).unwrap_or(false))
                .count() as u64;
            s.rows = rows;
        });
    }

    pub fn history_calls(&self) -> usize {
        self.with(|s| s.history_calls)
    }

    pub fn marked(&self) -> Vec<i64> {
        self.with(|s| s.marked.clone())
    }

    pub fn mark_all_calls(&self) -> usize {
        self.with(|s| s.mark_all_calls)
    }
}

type Shared = Arc<Mutex<BackendState>>;

async fn history(State(state): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let page: usize = q.get("pageNumber").and_then(|v| v.parse().ok()).unwrap_or(1).max(1);
    let size: usize = q.get("pageSize").and_then(|v| v.parse().ok()).unwrap_or(20).max(1);
    let mut s = state.lock().unwrap();
    s.history_calls += 1;
    let mut rows = s.rows.clone();
    rows.sort_by_key(|r| std::cmp::Reverse(r.get("id").and_then(Value::as_i64)));
    let total = rows.len();
    let data: Vec<Value> = rows.into_iter().skip((page - 1) * size).take(size).collect();
    Json(json!({
        "data": data,
        "totalCount": total,
        "pageNumber": page,
        "pageSize": size,
        "hasNextPage": page * size < total
    }))
}

async fn unread_count(State(state): State<Shared>) -> Json<Value> {
    Json(json!({"data": state.lock().unwrap().unread}))
}

async fn mark_as_read(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut s = state.lock().unwrap();
    s.marked.push(id);
    let mut changed = false;
    for row in s.rows.iter_mut().filter(|r| r.get("id").and_then(Value::as_i64) == Some(id)) {
        if !row.get("isRead").and_then(Value::as_bool).unwrap_or(false) {
            row["isRead"] = json!(true);
            changed = true;
        }
    }
    if changed {
        s.unread = s.unread.saturating_sub(1);
    }
    Json(json!(true)).into_response()
}

async fn mark_all_as_read(State(state): State<Shared>) -> Response {
    let mut s = state.lock().unwrap();
    s.mark_all_calls += 1;
    for row in s.rows.iter_mut() {
        row["isRead"] = json!(true);
    }
    s.unread = 0;
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Debug, Clone)]
enum HubCommand {
    Frame(String),
    DropAll,
}

/// Scriptable push hub
#[derive(Clone)]
pub struct Hub {
    pub url: String,
    commands: broadcast::Sender<HubCommand>,
    accepting: Arc<AtomicBool>,
    handshakes: Arc<AtomicUsize>,
}

impl Hub {
    /// Start the hub on an ephemeral port
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (commands, _) = broadcast::channel(64);
        let hub = Self {
            url: format!("ws://{addr}/hubs/notifications"),
            commands,
            accepting: Arc::new(AtomicBool::new(true)),
            handshakes: Arc::new(AtomicUsize::new(0)),
        };

        let accept = hub.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if !accept.accepting.load(Ordering::SeqCst) {
                    drop(stream);
                    continue;
                }
                let mut commands = accept.commands.subscribe();
                let handshakes = accept.handshakes.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };
                    let Some(Ok(Message::Text(_))) = ws.next().await else {
                        return;
                    };
                    if ws.send(Message::text(format!("{{}}{RS}"))).await.is_err() {
                        return;
                    }
                    handshakes.fetch_add(1, Ordering::SeqCst);
                    loop {
                        tokio::select! {
                            command = commands.recv() => match command {
                                Ok(HubCommand::Frame(frame)) => {
                                    if ws.send(Message::text(frame)).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(HubCommand::DropAll) | Err(_) => return,
                            },
                            frame = ws.next() => {
                                if !matches!(frame, Some(Ok(_))) {
                                    return;
                                }
                            }
                        }
                    }
                });
            }
        });
        hub
    }

    /// Completed handshakes so far
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    /// Refuse (or accept again) new connections
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Invoke `target` on every connected client
    pub fn invoke(&self, target: &str, argument: Value) {
        let record = json!({"type": 1, "target": target, "arguments": [argument]});
        let _ = self.commands.send(HubCommand::Frame(format!("{record}{RS}")));
    }

    /// Push one notification
    pub fn push_notification(&self, notification: Value) {
        self.invoke("ReceiveNotification", notification);
    }

    /// Cut every open connection without a close frame
    pub fn drop_all(&self) {
        let _ = self.commands.send(HubCommand::DropAll);
    }
}

/// Config pointing at the fixtures, with fast retries and polling
pub fn config(backend: &Backend, hub: &Hub) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = backend.base_url.clone();
    config.api.request_timeout_seconds = Some(5);
    config.realtime.hub_url = hub.url.clone();
    config.realtime.reconnect_delays_ms = vec![0, 100, 200];
    config.realtime.polling_interval_seconds = 1;
    config.realtime.server_timeout_seconds = 5;
    config.auth.access_token = Some("secret".to_string());
    config
}

/// Build a session over the real HTTP client and WebSocket transport
pub fn session(config: &AppConfig) -> NotificationSession {
    let credentials = Arc::new(StaticToken::new(config.auth.access_token.clone()));
    let api = Arc::new(HttpNotificationApi::new(&config.api, credentials.clone()).unwrap());
    let transport = Arc::new(WsHubTransport::new(&config.realtime));
    NotificationSession::new(config, api, transport, credentials)
}

/// Poll `cond` for up to five seconds
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// Notification row as the backend stores it
pub fn row(id: i64, minute: u32, read: bool) -> Value {
    json!({
        "id": id,
        "title": format!("Notification {id}"),
        "message": "body",
        "type": "OrderCreated",
        "severity": "info",
        "isRead": read,
        "createdDate": format!("2024-05-01T10:{minute:02}:00Z")
    })
}
