//! Push connection: lifecycle, retry schedule, hub protocol, WebSocket transport.

pub mod hub_protocol;
pub mod manager;
pub mod retry;
pub mod state;
pub mod ws_transport;

pub use manager::ConnectionManager;
pub use retry::{RetryPolicy, ScheduledRetryPolicy};
pub use state::ConnectionState;
pub use ws_transport::WsHubTransport;
