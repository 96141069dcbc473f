//! Push transport abstraction.
//!
//! A transport opens one persistent, server-initiated channel and reports
//! everything that happens on it as [`TransportEvent`]s. Event handlers are
//! not registered on the connection; the consumer drains the event stream
//! and dispatches by event name.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::result::AppResult;

/// Something that happened on an open push connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A named server event with its (first) argument.
    Message {
        /// Event name, e.g. `ReceiveNotification`.
        event: String,
        /// Event payload.
        payload: serde_json::Value,
    },
    /// The transport lost its link and is retrying on its own.
    Reconnecting,
    /// The transport re-established its link on its own.
    Reconnected,
    /// The connection is gone for good.
    Closed {
        /// Why, when known.
        reason: Option<String>,
    },
}

/// An open push connection.
///
/// Dropping the connection closes it.
pub struct PushConnection {
    events: mpsc::Receiver<TransportEvent>,
    shutdown: CancellationToken,
}

impl PushConnection {
    /// Wrap an event stream and the token that stops the underlying link.
    pub fn new(events: mpsc::Receiver<TransportEvent>, shutdown: CancellationToken) -> Self {
        Self { events, shutdown }
    }

    /// Wait for the next event. `None` means the link ended without a
    /// close event.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.shutdown.is_cancelled() {
            return None;
        }
        self.events.recv().await
    }

    /// Close the connection. Safe to call more than once.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for PushConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushConnection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Opens push connections.
#[async_trait]
pub trait PushTransport: Send + Sync + fmt::Debug + 'static {
    /// Connect to `url`, authenticating with `token`.
    async fn connect(&self, url: &str, token: &str) -> AppResult<PushConnection>;
}
