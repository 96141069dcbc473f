//! Connection manager: owns the push connection lifecycle.
//!
//! One supervisor task per `connect()` pumps transport events into the
//! store and, when the link drops, retries on the configured schedule.
//! Every state change goes through [`ConnectionManager::transition`], which
//! also decides whether the polling fallback runs: it runs exactly when the
//! manager is active and the state is not `Connected`.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use notifyhub_core::config::RealtimeConfig;
use notifyhub_core::result::AppResult;
use notifyhub_core::traits::{PushConnection, PushTransport, TokenSource, TransportEvent};

use crate::history::HistorySync;
use crate::metrics::RealtimeMetrics;
use crate::notification::merge::Provenance;
use crate::notification::normalizer;
use crate::notification::store::NotificationStore;
use crate::polling::PollingFallback;

use super::retry::{RetryPolicy, ScheduledRetryPolicy};
use super::state::ConnectionState;

/// Hub event carrying one notification.
pub const RECEIVE_NOTIFICATION: &str = "ReceiveNotification";
/// Hub event carrying the authoritative unread count.
pub const UNREAD_COUNT_UPDATED: &str = "UnreadCountUpdated";

#[derive(Debug)]
struct Supervisor {
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Manages the single push connection of a session.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Hub endpoint.
    hub_url: String,
    /// Opens connections.
    transport: Arc<dyn PushTransport>,
    /// Supplies the bearer token, re-read on every attempt.
    credentials: Arc<dyn TokenSource>,
    /// Target store.
    store: Arc<NotificationStore>,
    /// REST resync.
    sync: Arc<HistorySync>,
    /// Fallback poller.
    polling: Arc<PollingFallback>,
    /// Reconnect schedule.
    retry_policy: Arc<dyn RetryPolicy>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Set by `connect`, cleared by `disconnect`.
    active: AtomicBool,
    generation: AtomicU64,
    supervisor: Mutex<Option<Supervisor>>,
}

impl ConnectionManager {
    /// Creates a manager using the configured reconnect schedule.
    pub fn new(
        config: &RealtimeConfig,
        transport: Arc<dyn PushTransport>,
        credentials: Arc<dyn TokenSource>,
        sync: Arc<HistorySync>,
        polling: Arc<PollingFallback>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            hub_url: config.hub_url.clone(),
            transport,
            credentials,
            store: sync.store().clone(),
            sync,
            polling,
            retry_policy: Arc::new(ScheduledRetryPolicy::from_millis(
                &config.reconnect_delays_ms,
            )),
            metrics,
            active: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            supervisor: Mutex::new(None),
        }
    }

    /// Replace the reconnect schedule.
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.store.connection_state()
    }

    /// Whether a supervisor owns the connection (connected or retrying).
    pub fn is_running(&self) -> bool {
        self.supervisor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Open the push connection.
    ///
    /// No-op when already running or when no token is available. A failed
    /// first attempt leaves the state `Disconnected` and keeps retrying in
    /// the background.
    pub async fn connect(self: &Arc<Self>) {
        if self.is_running() {
            debug!("Connect requested while already running");
            return;
        }
        let Some(token) = self.credentials.token() else {
            debug!("No access token, not connecting");
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        {
            let mut slot = self.supervisor.lock().unwrap_or_else(|e| e.into_inner());
            if slot.is_some() {
                return;
            }
            *slot = Some(Supervisor {
                generation,
                cancel: cancel.clone(),
                task: None,
            });
        }
        self.active.store(true, Ordering::SeqCst);

        let conn_id = Uuid::new_v4();
        let first = tokio::select! {
            _ = cancel.cancelled() => return,
            result = self.open(conn_id, &token) => result,
        };
        let (connection, retry) = match first {
            Ok(connection) => {
                if !self.on_connected(&cancel).await {
                    debug!(conn_id = %conn_id, "Disconnected during initial resync");
                    return;
                }
                (Some(connection), 0)
            }
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Initial hub connect failed");
                self.transition(ConnectionState::Disconnected);
                (None, 1)
            }
        };
        if cancel.is_cancelled() {
            return;
        }

        let manager = Arc::clone(self);
        let task = tokio::spawn(async move {
            manager
                .clone()
                .supervise(connection, retry, cancel)
                .await;
            manager.release(generation);
        });

        let mut slot = self.supervisor.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_mut() {
            Some(supervisor) if supervisor.generation == generation => {
                supervisor.task = Some(task)
            }
            _ => task.abort(),
        }
    }

    /// Stop retrying and close the connection. Idempotent.
    pub fn disconnect(&self) {
        self.active.store(false, Ordering::SeqCst);
        let supervisor = self
            .supervisor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(supervisor) = supervisor {
            supervisor.cancel.cancel();
            if let Some(task) = supervisor.task {
                task.abort();
            }
            info!("Hub connection stopped");
        }
        self.transition(ConnectionState::Disconnected);
    }

    /// Record a state and bring polling in line with it.
    fn transition(&self, next: ConnectionState) {
        let previous = self.store.set_connection_state(next);
        if self.active.load(Ordering::SeqCst) && !next.is_connected() {
            self.polling.start();
        } else {
            self.polling.stop();
        }
        if previous != next {
            info!(from = %previous, to = %next, "Connection state changed");
        }
    }

    fn release(&self, generation: u64) {
        let mut slot = self.supervisor.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|s| s.generation == generation) {
            slot.take();
        }
    }

    async fn open(&self, conn_id: Uuid, token: &str) -> AppResult<PushConnection> {
        self.metrics.inc_connect_attempt();
        debug!(conn_id = %conn_id, url = %self.hub_url, "Opening hub connection");
        match self.transport.connect(&self.hub_url, token).await {
            Ok(connection) => {
                info!(conn_id = %conn_id, "Hub connected");
                Ok(connection)
            }
            Err(e) => {
                self.metrics.inc_connect_failure();
                Err(e)
            }
        }
    }

    /// Mark the link up and resync. Returns `false` if the manager was
    /// disconnected first; the resync then never reaches the store.
    async fn on_connected(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        self.transition(ConnectionState::Connected);
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.resync() => !cancel.is_cancelled(),
        }
    }

    /// Pull authoritative history after (re)connecting; pushes may have
    /// been missed while the link was down.
    async fn resync(&self) {
        self.metrics.inc_resync();
        if let Err(e) = self.sync.full_refresh().await {
            warn!(error = %e, "History resync failed, keeping current state");
        }
    }

    async fn supervise(
        self: Arc<Self>,
        mut connection: Option<PushConnection>,
        mut retry: u32,
        cancel: CancellationToken,
    ) {
        loop {
            if let Some(open) = connection.take() {
                let reason = tokio::select! {
                    _ = cancel.cancelled() => return,
                    reason = self.pump(open, &cancel) => reason,
                };
                warn!(reason = ?reason, "Hub connection lost");
                self.transition(ConnectionState::Disconnected);
                retry = 0;
            }

            let Some(delay) = self.retry_policy.next_retry_delay(retry) else {
                warn!(retry, "Retry policy gave up, staying disconnected");
                return;
            };
            debug!(retry, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = time::sleep(delay) => {}
            }

            let Some(token) = self.credentials.token() else {
                info!("Access token gone, not reconnecting");
                self.transition(ConnectionState::Disconnected);
                return;
            };
            self.transition(ConnectionState::Reconnecting);

            let conn_id = Uuid::new_v4();
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = self.open(conn_id, &token) => result,
            };
            match result {
                Ok(open) => {
                    self.metrics.inc_reconnect();
                    if !self.on_connected(&cancel).await {
                        return;
                    }
                    connection = Some(open);
                }
                Err(e) => {
                    warn!(conn_id = %conn_id, retry, error = %e, "Hub reconnect failed");
                    self.transition(ConnectionState::Disconnected);
                    retry = retry.saturating_add(1);
                }
            }
        }
    }

    /// Drain one connection. Returns the close reason.
    async fn pump(&self, mut connection: PushConnection, cancel: &CancellationToken) -> Option<String> {
        while let Some(event) = connection.next_event().await {
            match event {
                TransportEvent::Message { event, payload } => self.dispatch(&event, payload).await,
                TransportEvent::Reconnecting => self.transition(ConnectionState::Reconnecting),
                TransportEvent::Reconnected => {
                    self.metrics.inc_reconnect();
                    if !self.on_connected(cancel).await {
                        return None;
                    }
                }
                TransportEvent::Closed { reason } => return reason,
            }
        }
        None
    }

    async fn dispatch(&self, event: &str, payload: Value) {
        match event {
            RECEIVE_NOTIFICATION => {
                let notification = normalizer::normalize(&payload);
                let id = notification.id;
                self.metrics.inc_push();
                let added = self.store.ingest(vec![notification], Provenance::Push);
                self.sync.fetcher().invalidate_unread_count().await;
                debug!(notification_id = id, new = added > 0, "Notification pushed");
            }
            UNREAD_COUNT_UPDATED => match unread_count_of(&payload) {
                Some(count) => {
                    self.store.set_unread_count(count);
                    debug!(count, "Unread count pushed");
                }
                None => debug!(payload = %payload, "Unreadable unread-count event"),
            },
            other => trace!(event = other, "Ignoring hub event"),
        }
    }
}

fn unread_count_of(payload: &Value) -> Option<u64> {
    let value = match payload {
        Value::Object(map) => ["count", "unreadCount", "data"]
            .iter()
            .find_map(|key| map.get(*key))?,
        other => other,
    };
    value
        .as_u64()
        .or_else(|| value.as_i64().map(|n| n.max(0) as u64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
