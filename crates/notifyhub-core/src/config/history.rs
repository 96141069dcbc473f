//! History paging and unread-count caching configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::sorting::{SortDirection, SortField};

/// Settings for the REST history fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Items per history page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Backend field to sort by.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// Sort direction.
    #[serde(default = "default_sort_direction")]
    pub sort_direction: SortDirection,
    /// How long a fetched unread count is reused, in seconds.
    #[serde(default = "default_unread_ttl")]
    pub unread_count_ttl_seconds: u64,
}

impl HistoryConfig {
    /// The configured sort as a [`SortField`].
    pub fn sort(&self) -> SortField {
        SortField::new(self.sort_by.clone(), self.sort_direction)
    }

    /// Unread-count cache TTL as a [`Duration`].
    pub fn unread_count_ttl(&self) -> Duration {
        Duration::from_secs(self.unread_count_ttl_seconds.max(1))
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sort_by: default_sort_by(),
            sort_direction: default_sort_direction(),
            unread_count_ttl_seconds: default_unread_ttl(),
        }
    }
}

fn default_page_size() -> u64 {
    20
}

fn default_sort_by() -> String {
    "createdDate".to_string()
}

fn default_sort_direction() -> SortDirection {
    SortDirection::Desc
}

fn default_unread_ttl() -> u64 {
    30
}
