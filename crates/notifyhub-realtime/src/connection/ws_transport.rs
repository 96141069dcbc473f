//! WebSocket hub transport.
//!
//! Opens the hub socket with a bearer token, performs the JSON protocol
//! handshake, then runs one socket task per connection. The task sends a
//! keep-alive record on an interval and gives up when nothing arrives
//! within the server timeout.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use notifyhub_core::config::RealtimeConfig;
use notifyhub_core::error::{AppError, ErrorKind};
use notifyhub_core::result::AppResult;
use notifyhub_core::traits::{PushConnection, PushTransport, TransportEvent};

use super::hub_protocol::{self, HubRecord};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Hub transport over tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsHubTransport {
    keep_alive: Duration,
    server_timeout: Duration,
    event_buffer: usize,
}

impl WsHubTransport {
    /// Create a transport from realtime settings.
    pub fn new(config: &RealtimeConfig) -> Self {
        Self {
            keep_alive: config.keep_alive_interval(),
            server_timeout: config.server_timeout(),
            event_buffer: config.event_buffer_size.max(1),
        }
    }
}

#[async_trait]
impl PushTransport for WsHubTransport {
    async fn connect(&self, url: &str, token: &str) -> AppResult<PushConnection> {
        let mut request = url.into_client_request().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, format!("Invalid hub URL: {url}"), e)
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            AppError::with_source(
                ErrorKind::Authentication,
                "Access token is not a valid header value",
                e,
            )
        })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (mut stream, _) = time::timeout(self.server_timeout, connect_async(request))
            .await
            .map_err(|_| AppError::transport(format!("Hub connect to {url} timed out")))?
            .map_err(|e| AppError::with_source(ErrorKind::Transport, "Hub connect failed", e))?;

        stream
            .send(Message::text(hub_protocol::handshake_request()))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Transport, "Handshake send failed", e))?;
        let pending = time::timeout(self.server_timeout, await_handshake(&mut stream))
            .await
            .map_err(|_| AppError::transport("Hub handshake timed out"))??;
        info!(url = %url, "Hub handshake complete");

        let (events_tx, events_rx) = mpsc::channel(self.event_buffer);
        let shutdown = CancellationToken::new();
        tokio::spawn(run_socket(
            stream,
            events_tx,
            shutdown.clone(),
            self.keep_alive,
            self.server_timeout,
            pending,
        ));
        Ok(PushConnection::new(events_rx, shutdown))
    }
}

/// Wait for the handshake answer. Returns any records that rode along.
async fn await_handshake(stream: &mut WsStream) -> AppResult<Vec<HubRecord>> {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let rest = hub_protocol::parse_handshake_response(text.as_str())?;
                return Ok(hub_protocol::decode(rest));
            }
            Ok(Message::Close(_)) => {
                return Err(AppError::transport("Hub closed during handshake"));
            }
            Ok(_) => continue,
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Transport,
                    "Handshake read failed",
                    e,
                ));
            }
        }
    }
    Err(AppError::transport("Hub closed during handshake"))
}

enum Flow {
    Continue,
    Close(Option<String>),
    Detached,
}

async fn dispatch(events: &mpsc::Sender<TransportEvent>, records: Vec<HubRecord>) -> Flow {
    for record in records {
        match record {
            HubRecord::Invocation { target, arguments } => {
                let payload = arguments.into_iter().next().unwrap_or(Value::Null);
                trace!(event = %target, "Hub invocation");
                let event = TransportEvent::Message {
                    event: target,
                    payload,
                };
                if events.send(event).await.is_err() {
                    return Flow::Detached;
                }
            }
            HubRecord::Ping => trace!("Hub ping"),
            HubRecord::Close { error } => return Flow::Close(error),
            HubRecord::Other(kind) => trace!(kind, "Ignoring hub record"),
        }
    }
    Flow::Continue
}

async fn close_quietly(sink: &mut SplitSink<WsStream, Message>) {
    if let Err(e) = sink.send(Message::Close(None)).await {
        trace!(error = %e, "Close frame not sent");
    }
}

async fn run_socket(
    stream: WsStream,
    events: mpsc::Sender<TransportEvent>,
    shutdown: CancellationToken,
    keep_alive: Duration,
    server_timeout: Duration,
    pending: Vec<HubRecord>,
) {
    let (mut sink, mut source) = stream.split();

    let reason = match dispatch(&events, pending).await {
        Flow::Continue => None,
        Flow::Close(reason) => Some(reason),
        Flow::Detached => return,
    };

    let reason = match reason {
        Some(reason) => reason,
        None => {
            let mut last_frame = Instant::now();
            let mut ping = time::interval_at(Instant::now() + keep_alive, keep_alive);
            ping.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Hub socket closed by client");
                        close_quietly(&mut sink).await;
                        return;
                    }
                    _ = ping.tick() => {
                        if let Err(e) = sink.send(Message::text(hub_protocol::ping_record())).await {
                            break Some(format!("keep-alive send failed: {e}"));
                        }
                    }
                    _ = time::sleep_until(last_frame + server_timeout) => {
                        warn!(timeout_secs = server_timeout.as_secs(), "Hub server timeout");
                        break Some("server timeout".to_string());
                    }
                    frame = source.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            last_frame = Instant::now();
                            match dispatch(&events, hub_protocol::decode(text.as_str())).await {
                                Flow::Continue => {}
                                Flow::Close(reason) => break reason,
                                Flow::Detached => {
                                    close_quietly(&mut sink).await;
                                    return;
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break frame
                                .map(|f| f.reason.as_str().to_owned())
                                .filter(|r| !r.is_empty());
                        }
                        Some(Ok(_)) => last_frame = Instant::now(),
                        Some(Err(e)) => break Some(e.to_string()),
                        None => break None,
                    }
                }
            }
        }
    };

    info!(reason = ?reason, "Hub connection closed");
    if events.send(TransportEvent::Closed { reason }).await.is_err() {
        trace!("Closed event had no receiver");
    }
}
