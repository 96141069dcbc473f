//! # notifyhub-client
//!
//! reqwest implementation of the notification REST API: paginated
//! history, unread count, and read-state commands.

pub mod envelope;
pub mod http;

pub use http::HttpNotificationApi;
