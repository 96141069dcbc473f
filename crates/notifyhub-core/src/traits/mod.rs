//! Collaborator traits: push transport, REST history API, credentials.

pub mod api;
pub mod credentials;
pub mod transport;

pub use api::NotificationApi;
pub use credentials::{StaticToken, TokenSource};
pub use transport::{PushConnection, PushTransport, TransportEvent};
