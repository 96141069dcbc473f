//! Paginated history client.
//!
//! Wraps the REST [`NotificationApi`], normalizes every row, and turns
//! fetch failures into empty results so callers never block on a transient
//! network error. The `try_*` variants keep the error for callers that must
//! not mistake a failure for "nothing there".

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use notifyhub_core::result::AppResult;
use notifyhub_core::traits::NotificationApi;
use notifyhub_core::types::{Page, PageRequest};

use crate::notification::model::Notification;
use crate::notification::normalizer;

use super::unread::UnreadCountCache;

/// History and unread-count reader.
#[derive(Debug)]
pub struct HistoryFetcher {
    api: Arc<dyn NotificationApi>,
    unread: UnreadCountCache,
}

impl HistoryFetcher {
    /// Create a fetcher caching the unread count for `unread_ttl`.
    pub fn new(api: Arc<dyn NotificationApi>, unread_ttl: Duration) -> Self {
        Self {
            api,
            unread: UnreadCountCache::new(unread_ttl),
        }
    }

    /// The underlying API (for read-state commands).
    pub fn api(&self) -> &Arc<dyn NotificationApi> {
        &self.api
    }

    /// Fetch and normalize one page, keeping any error.
    pub async fn try_fetch(&self, request: &PageRequest) -> AppResult<Page<Notification>> {
        let page = self.api.history(request).await?;
        debug!(
            page = page.page_number,
            rows = page.data.len(),
            total = page.total_count,
            "History page fetched"
        );
        Ok(page.map(|raw| normalizer::normalize(&raw)))
    }

    /// Fetch and normalize one page; any failure yields an empty page.
    pub async fn fetch(&self, request: &PageRequest) -> Page<Notification> {
        match self.try_fetch(request).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    page = request.page_number,
                    error = %e,
                    "History fetch failed, returning empty page"
                );
                Page::empty(request.page_number)
            }
        }
    }

    /// Unread count, served from cache when fresh. `None` on failure.
    pub async fn try_unread_count(&self) -> Option<u64> {
        if let Some(count) = self.unread.get().await {
            return Some(count);
        }
        match self.api.unread_count().await {
            Ok(count) => {
                self.unread.put(count).await;
                Some(count)
            }
            Err(e) => {
                warn!(error = %e, "Unread count fetch failed");
                None
            }
        }
    }

    /// Unread count; a failure reads as zero.
    pub async fn unread_count(&self) -> u64 {
        self.try_unread_count().await.unwrap_or(0)
    }

    /// Bypass the cache and fetch the unread count from the backend.
    pub async fn refresh_unread_count(&self) -> Option<u64> {
        self.unread.invalidate().await;
        self.try_unread_count().await
    }

    /// Drop the cached unread count.
    pub async fn invalidate_unread_count(&self) {
        self.unread.invalidate().await;
    }
}
