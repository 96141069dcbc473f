//! REST history: paginated fetch, unread-count cache, and store sync.

pub mod fetcher;
pub mod sync;
pub mod unread;

pub use fetcher::HistoryFetcher;
pub use sync::HistorySync;
pub use unread::UnreadCountCache;
