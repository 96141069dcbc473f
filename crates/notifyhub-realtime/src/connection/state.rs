//! Push connection state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of the push connection as seen by UI consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Live push delivery is working.
    Connected,
    /// No push delivery; polling fallback covers the gap.
    #[default]
    Disconnected,
    /// A retry is in progress; polling fallback still covers the gap.
    Reconnecting,
}

impl ConnectionState {
    /// Whether push delivery is live.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Wire/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
