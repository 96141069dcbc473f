//! HTTP notification API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use notifyhub_core::config::ApiConfig;
use notifyhub_core::error::{AppError, ErrorKind};
use notifyhub_core::result::AppResult;
use notifyhub_core::traits::{NotificationApi, TokenSource};
use notifyhub_core::types::{Page, PageRequest};

use crate::envelope;

/// [`NotificationApi`] over reqwest.
///
/// Endpoints, relative to `{base_url}/{notifications_path}`:
/// `GET` (history), `GET /unread-count`, `PUT /{id}/mark-as-read`,
/// `PUT /mark-all-as-read`.
#[derive(Debug, Clone)]
pub struct HttpNotificationApi {
    client: Client,
    root: Url,
    path: String,
    credentials: Arc<dyn TokenSource>,
}

impl HttpNotificationApi {
    /// Build a client from API settings.
    pub fn new(config: &ApiConfig, credentials: Arc<dyn TokenSource>) -> AppResult<Self> {
        let mut root = Url::parse(&config.base_url).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid API base URL: {}", config.base_url),
                e,
            )
        })?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })?;

        Ok(Self {
            client,
            root,
            path: config.notifications_path.trim_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self, suffix: &str) -> AppResult<Url> {
        self.root
            .join(&format!("{}{suffix}", self.path))
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Invalid endpoint", e))
    }

    async fn call(&self, method: Method, url: Url) -> AppResult<Value> {
        debug!(method = %method, url = %url, "Notification API request");
        let mut request = self.client.request(method, url);
        if let Some(token) = self.credentials.token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ServiceUnavailable,
                "Notification API unreachable",
                e,
            )
        })?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::authentication(format!(
                    "Notification API rejected credentials ({status})"
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(AppError::not_found("Notification API resource not found"));
            }
            s if !s.is_success() => {
                return Err(AppError::external(format!(
                    "Notification API returned {status}"
                )));
            }
            _ => {}
        }

        let body = response.bytes().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Failed to read response", e)
        })?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn history(&self, request: &PageRequest) -> AppResult<Page<Value>> {
        let mut url = self.endpoint("")?;
        url.query_pairs_mut()
            .append_pair("pageNumber", &request.page_number.to_string())
            .append_pair("pageSize", &request.page_size.to_string())
            .append_pair("sortBy", &request.sort.field)
            .append_pair("sortDirection", request.sort.direction.as_str());
        let body = self.call(Method::GET, url).await?;
        Page::from_value(body)
    }

    async fn unread_count(&self) -> AppResult<u64> {
        let body = self.call(Method::GET, self.endpoint("/unread-count")?).await?;
        envelope::unread_count(&body)
    }

    async fn mark_as_read(&self, id: i64) -> AppResult<bool> {
        let url = self.endpoint(&format!("/{id}/mark-as-read"))?;
        let body = self.call(Method::PUT, url).await?;
        envelope::flag(&body)
    }

    async fn mark_all_as_read(&self) -> AppResult<bool> {
        let body = self.call(Method::PUT, self.endpoint("/mark-all-as-read")?).await?;
        envelope::flag(&body)
    }
}
