//! Pulls REST history into the store.
//!
//! Three entry points share one fetcher: a full refresh on (re)connect, a
//! latest-page poll while push is down, and "load older" paging driven by
//! the UI.

use std::sync::Arc;

use tracing::{debug, info, warn};

use notifyhub_core::config::HistoryConfig;
use notifyhub_core::result::AppResult;
use notifyhub_core::types::{PageRequest, SortField};

use crate::notification::merge::MergePolicy;
use crate::notification::store::NotificationStore;

use super::fetcher::HistoryFetcher;

/// Bridges [`HistoryFetcher`] and [`NotificationStore`].
#[derive(Debug)]
pub struct HistorySync {
    fetcher: Arc<HistoryFetcher>,
    store: Arc<NotificationStore>,
    page_size: u64,
    sort: SortField,
}

impl HistorySync {
    /// Create a sync bound to one store.
    pub fn new(
        fetcher: Arc<HistoryFetcher>,
        store: Arc<NotificationStore>,
        config: &HistoryConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            page_size: config.page_size,
            sort: config.sort(),
        }
    }

    /// The fetcher this sync reads through.
    pub fn fetcher(&self) -> &Arc<HistoryFetcher> {
        &self.fetcher
    }

    /// The store this sync writes into.
    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    fn page(&self, page_number: u64) -> PageRequest {
        PageRequest::new(page_number, self.page_size, self.sort.clone())
    }

    /// Replace the store with the first page and an uncached unread count.
    ///
    /// On fetch failure the store keeps what it has and the error is
    /// returned.
    pub async fn full_refresh(&self) -> AppResult<usize> {
        let page = self.fetcher.try_fetch(&self.page(1)).await?;
        let unread = self.fetcher.refresh_unread_count().await;
        let loaded = self.store.ingest_page(page, MergePolicy::Replace);
        if let Some(count) = unread {
            self.store.set_unread_count(count);
        }
        info!(loaded, unread = ?unread, "History resynced");
        Ok(loaded)
    }

    /// Fold the latest page in ahead of what is shown. Never fails.
    pub async fn poll_latest(&self) -> usize {
        let page = self.fetcher.fetch(&self.page(1)).await;
        let added = self.store.ingest_page(page, MergePolicy::Prepend);
        if let Some(count) = self.fetcher.try_unread_count().await {
            self.store.set_unread_count(count);
        }
        debug!(added, "Polled latest notifications");
        added
    }

    /// Load the page after the cursor. Returns how many new ids arrived;
    /// zero when there is nothing older or the fetch failed.
    pub async fn load_older(&self) -> usize {
        let cursor = self.store.cursor();
        if cursor.page_number > 0 && !cursor.has_next_page {
            return 0;
        }
        let request = self.page(cursor.page_number + 1);
        match self.fetcher.try_fetch(&request).await {
            Ok(page) => {
                let added = self.store.ingest_page(page, MergePolicy::Append);
                debug!(page = request.page_number, added, "Loaded older notifications");
                added
            }
            Err(e) => {
                warn!(page = request.page_number, error = %e, "Loading older notifications failed");
                0
            }
        }
    }
}
