//! # notifyhub-realtime
//!
//! Real-time notification delivery and reconciliation. Provides:
//!
//! - Push hub connection with scheduled reconnects
//! - REST polling fallback while push is down
//! - Paginated history fetch with a cached unread count
//! - Wire payload normalization into one canonical record
//! - A single store reconciling push and REST sources

pub mod connection;
pub mod history;
pub mod metrics;
pub mod notification;
pub mod polling;
pub mod session;

#[cfg(test)]
mod test_support;

pub use connection::manager::ConnectionManager;
pub use connection::state::ConnectionState;
pub use connection::ws_transport::WsHubTransport;
pub use history::{HistoryFetcher, HistorySync};
pub use metrics::RealtimeMetrics;
pub use notification::model::Notification;
pub use notification::store::NotificationStore;
pub use polling::PollingFallback;
pub use session::NotificationSession;
