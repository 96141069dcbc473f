//! Notification session: wires every subsystem for one signed-in user.
//!
//! Created at session start and disposed at logout. UI consumers hold a
//! reference, read the store, and call the commands here.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use notifyhub_core::config::AppConfig;
use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;
use notifyhub_core::traits::{NotificationApi, PushTransport, TokenSource};

use crate::connection::manager::ConnectionManager;
use crate::connection::state::ConnectionState;
use crate::history::{HistoryFetcher, HistorySync};
use crate::metrics::RealtimeMetrics;
use crate::notification::model::NotificationId;
use crate::notification::store::{NotificationStore, ReadTransition, StoreSnapshot};
use crate::polling::PollingFallback;

/// One user's notification delivery stack.
#[derive(Clone)]
pub struct NotificationSession {
    /// Shared notification state.
    pub store: Arc<NotificationStore>,
    /// REST history reader.
    pub fetcher: Arc<HistoryFetcher>,
    /// REST to store bridge.
    pub sync: Arc<HistorySync>,
    /// Poller used while push is down.
    pub polling: Arc<PollingFallback>,
    /// Push connection owner.
    pub connection: Arc<ConnectionManager>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Cancelled by `dispose`.
    disposed: CancellationToken,
}

impl std::fmt::Debug for NotificationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSession")
            .field("state", &self.store.connection_state())
            .finish()
    }
}

impl NotificationSession {
    /// Build the stack. Nothing connects until [`start`](Self::start).
    pub fn new(
        config: &AppConfig,
        api: Arc<dyn NotificationApi>,
        transport: Arc<dyn PushTransport>,
        credentials: Arc<dyn TokenSource>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let store = Arc::new(NotificationStore::new(
            config.realtime.max_live_notifications,
        ));
        let fetcher = Arc::new(HistoryFetcher::new(api, config.history.unread_count_ttl()));
        let sync = Arc::new(HistorySync::new(
            fetcher.clone(),
            store.clone(),
            &config.history,
        ));
        let polling = Arc::new(PollingFallback::new(
            config.realtime.polling_interval(),
            sync.clone(),
            metrics.clone(),
        ));
        let connection = Arc::new(ConnectionManager::new(
            &config.realtime,
            transport,
            credentials,
            sync.clone(),
            polling.clone(),
            metrics.clone(),
        ));

        info!("Notification session initialized");

        Self {
            store,
            fetcher,
            sync,
            polling,
            connection,
            metrics,
            disposed: CancellationToken::new(),
        }
    }

    /// Connect the push channel and make sure the first page is loaded even
    /// when push is unavailable.
    pub async fn start(&self) {
        self.connection.connect().await;
        if self.disposed.is_cancelled() || self.connection.state().is_connected() {
            return;
        }
        tokio::select! {
            _ = self.disposed.cancelled() => debug!("Session disposed during initial load"),
            result = self.sync.full_refresh() => {
                if let Err(e) = result {
                    warn!(error = %e, "Initial history load failed");
                }
            }
        }
    }

    /// Subscribe to store snapshots.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.store.subscribe()
    }

    /// Current push connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.store.connection_state()
    }

    /// Mark one notification read: locally first, then on the server.
    ///
    /// A server failure is returned but the local change stays.
    pub async fn mark_as_read(&self, id: NotificationId) -> AppResult<()> {
        let transition = self.store.mark_read_local(id, Utc::now());
        debug!(notification_id = id, ?transition, "Marked read locally");
        let result = self.fetcher.api().mark_as_read(id).await;
        if transition == ReadTransition::Marked {
            self.fetcher.invalidate_unread_count().await;
        }
        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::external(format!(
                "Server refused to mark notification {id} as read"
            ))),
            Err(e) => {
                warn!(notification_id = id, error = %e, "Mark as read failed on server");
                Err(e)
            }
        }
    }

    /// Mark everything read. Does nothing, and calls nothing, when the
    /// unread count is already zero.
    pub async fn mark_all_as_read(&self) -> AppResult<()> {
        if self.store.unread_count() == 0 {
            return Ok(());
        }
        let marked = self.store.mark_all_read_local(Utc::now());
        debug!(marked, "Marked all read locally");
        let result = self.fetcher.api().mark_all_as_read().await;
        self.fetcher.invalidate_unread_count().await;
        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::external(
                "Server refused to mark all notifications as read",
            )),
            Err(e) => {
                warn!(error = %e, "Mark all as read failed on server");
                Err(e)
            }
        }
    }

    /// Load the next page of older history. Returns how many new
    /// notifications arrived.
    pub async fn fetch_next_page(&self) -> usize {
        self.sync.load_older().await
    }

    /// Reload the first page and the unread count.
    pub async fn refresh(&self) -> AppResult<usize> {
        self.sync.full_refresh().await
    }

    /// Tear down at logout: close the connection and forget all state.
    pub fn dispose(&self) {
        self.disposed.cancel();
        self.connection.disconnect();
        self.polling.stop();
        self.store.clear();
        info!("Notification session disposed");
    }
}
