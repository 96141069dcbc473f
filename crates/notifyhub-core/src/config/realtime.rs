//! Push hub and polling fallback configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (push hub) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket URL of the notification hub.
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    /// Reconnect delays in milliseconds, indexed by retry number.
    /// The last entry repeats for every further retry.
    #[serde(default = "default_reconnect_delays")]
    pub reconnect_delays_ms: Vec<u64>,
    /// Client keep-alive ping interval in seconds.
    #[serde(default = "default_keep_alive_interval")]
    pub keep_alive_interval_seconds: u64,
    /// Seconds without any inbound frame before the hub is considered gone.
    #[serde(default = "default_server_timeout")]
    pub server_timeout_seconds: u64,
    /// Buffer size of the transport event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
    /// REST polling interval while the hub is not connected, in seconds.
    #[serde(default = "default_polling_interval")]
    pub polling_interval_seconds: u64,
    /// Upper bound on recently pushed notifications tracked for the live view.
    #[serde(default = "default_max_live")]
    pub max_live_notifications: usize,
}

impl RealtimeConfig {
    /// Keep-alive interval as a [`Duration`].
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_seconds.max(1))
    }

    /// Server timeout as a [`Duration`].
    pub fn server_timeout(&self) -> Duration {
        Duration::from_secs(self.server_timeout_seconds.max(1))
    }

    /// Polling interval as a [`Duration`].
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_seconds.max(1))
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            hub_url: default_hub_url(),
            reconnect_delays_ms: default_reconnect_delays(),
            keep_alive_interval_seconds: default_keep_alive_interval(),
            server_timeout_seconds: default_server_timeout(),
            event_buffer_size: default_event_buffer(),
            polling_interval_seconds: default_polling_interval(),
            max_live_notifications: default_max_live(),
        }
    }
}

fn default_hub_url() -> String {
    "ws://localhost:5000/hubs/notifications".to_string()
}

fn default_reconnect_delays() -> Vec<u64> {
    vec![0, 2_000, 10_000, 30_000]
}

fn default_keep_alive_interval() -> u64 {
    15
}

fn default_server_timeout() -> u64 {
    30
}

fn default_event_buffer() -> usize {
    256
}

fn default_polling_interval() -> u64 {
    30
}

fn default_max_live() -> usize {
    50
}
