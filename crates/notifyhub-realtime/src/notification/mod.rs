//! Canonical notification model, wire normalization, reconciliation merge,
//! and the shared store.

pub mod merge;
pub mod model;
pub mod normalizer;
pub mod store;

pub use merge::{MergePolicy, Provenance};
pub use model::{
    DeliveryChannel, Notification, NotificationId, NotificationType, ReadState,
    RelatedEntityType, Severity,
};
pub use normalizer::normalize;
pub use store::{NotificationStore, PageCursor, ReadTransition, StoreSnapshot};
