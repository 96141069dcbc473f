//! Credential configuration.

use serde::{Deserialize, Serialize};

/// Credential settings for headless use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token presented to the hub and the REST API. Absent means
    /// "not authenticated yet"; the push connection is simply not attempted.
    #[serde(default)]
    pub access_token: Option<String>,
}
