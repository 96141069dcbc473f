//! REST notification history API.

use async_trait::async_trait;
use serde_json::Value;

use crate::result::AppResult;
use crate::types::pagination::{Page, PageRequest};

/// The backend's notification endpoints.
///
/// Implementations return pages already folded into [`Page`] (see
/// [`Page::from_value`]); rows are left raw for the normalizer.
#[async_trait]
pub trait NotificationApi: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch one page of notification history.
    async fn history(&self, request: &PageRequest) -> AppResult<Page<Value>>;

    /// Number of unread notifications for the current user.
    async fn unread_count(&self) -> AppResult<u64>;

    /// Mark one notification as read.
    async fn mark_as_read(&self, id: i64) -> AppResult<bool>;

    /// Mark every notification of the current user as read.
    async fn mark_all_as_read(&self) -> AppResult<bool>;
}
