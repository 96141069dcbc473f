//! REST backend configuration.

use serde::{Deserialize, Serialize};

/// Where the notification REST endpoints live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the notification resource, relative to `base_url`.
    #[serde(default = "default_notifications_path")]
    pub notifications_path: String,
    /// Optional per-request timeout in seconds. Unset means the HTTP
    /// client's own default applies.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            notifications_path: default_notifications_path(),
            request_timeout_seconds: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_notifications_path() -> String {
    "api/notifications".to_string()
}
