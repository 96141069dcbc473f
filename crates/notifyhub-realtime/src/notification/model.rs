//! Canonical notification record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity key of a notification.
pub type NotificationId = i64;

/// How alarming a notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    #[default]
    Info,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
}

/// Delivery surface of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeliveryChannel {
    /// Shop-floor terminal users.
    Terminal,
    /// Web console users.
    #[default]
    Web,
}

/// Business classification. Distinct from [`Severity`]; drives routing only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NotificationType {
    /// Fallback for anything unrecognized.
    #[default]
    General,
    /// An approval is waiting on the recipient.
    ApprovalRequest,
    /// An approval was granted.
    ApprovalGranted,
    /// An approval was rejected.
    ApprovalRejected,
    /// A demand was created.
    DemandCreated,
    /// A quotation was created.
    QuotationCreated,
    /// An order was created.
    OrderCreated,
    /// An order changed status.
    OrderStatusChanged,
    /// A discount exceeded the user's limit.
    DiscountLimitExceeded,
    /// System announcement.
    System,
}

impl NotificationType {
    /// Every recognized type, in wire-code order.
    pub const ALL: [Self; 10] = [
        Self::General,
        Self::ApprovalRequest,
        Self::ApprovalGranted,
        Self::ApprovalRejected,
        Self::DemandCreated,
        Self::QuotationCreated,
        Self::OrderCreated,
        Self::OrderStatusChanged,
        Self::DiscountLimitExceeded,
        Self::System,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::ApprovalRequest => "ApprovalRequest",
            Self::ApprovalGranted => "ApprovalGranted",
            Self::ApprovalRejected => "ApprovalRejected",
            Self::DemandCreated => "DemandCreated",
            Self::QuotationCreated => "QuotationCreated",
            Self::OrderCreated => "OrderCreated",
            Self::OrderStatusChanged => "OrderStatusChanged",
            Self::DiscountLimitExceeded => "DiscountLimitExceeded",
            Self::System => "System",
        }
    }

    /// Look a type up by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Look a type up by numeric wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Screen for this type when no entity-level route exists.
    fn route(&self) -> Option<&'static str> {
        match self {
            Self::ApprovalRequest | Self::ApprovalGranted | Self::ApprovalRejected => {
                Some("/approvals")
            }
            Self::DemandCreated => Some("/demands"),
            Self::QuotationCreated => Some("/quotations"),
            Self::OrderCreated | Self::OrderStatusChanged => Some("/orders"),
            Self::DiscountLimitExceeded => Some("/user-discount-limits"),
            Self::General | Self::System => None,
        }
    }
}

/// Business object a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelatedEntityType {
    /// A purchase demand.
    Demand,
    /// A quotation.
    Quotation,
    /// A sales order.
    Order,
}

impl RelatedEntityType {
    fn route_prefix(&self) -> &'static str {
        match self {
            Self::Demand => "/demands",
            Self::Quotation => "/quotations",
            Self::Order => "/orders",
        }
    }
}

/// Read flag and read date, which only ever change together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ReadState {
    /// Not read yet.
    #[default]
    Unread,
    /// Read at the given instant.
    Read {
        /// When it was read.
        at: DateTime<Utc>,
    },
}

/// The single internal shape every wire payload is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Identity key used for de-duplication.
    pub id: NotificationId,
    /// Owning user (0 when the payload did not say).
    pub user_id: i64,
    /// Display title.
    pub title: String,
    /// Display body.
    pub message: String,
    /// Business classification.
    pub notification_type: NotificationType,
    /// Delivery surface.
    pub channel: DeliveryChannel,
    /// Severity.
    pub severity: Severity,
    /// Read flag + date.
    pub read_state: ReadState,
    /// Event time, when the payload carried one.
    pub timestamp: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_date: DateTime<Utc>,
    /// Targeted web user.
    pub recipient_user_id: Option<i64>,
    /// Targeted terminal user.
    pub recipient_terminal_user_id: Option<i64>,
    /// Kind of business object referenced.
    pub related_entity_type: Option<RelatedEntityType>,
    /// Id of the business object referenced.
    pub related_entity_id: Option<i64>,
    /// Precomputed navigation target.
    pub action_url: Option<String>,
    /// Precomputed terminal action.
    pub terminal_action_code: Option<String>,
}

impl Notification {
    /// A minimal unread web notification.
    pub fn new(
        id: NotificationId,
        title: impl Into<String>,
        message: impl Into<String>,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: 0,
            title: title.into(),
            message: message.into(),
            notification_type: NotificationType::default(),
            channel: DeliveryChannel::default(),
            severity: Severity::default(),
            read_state: ReadState::Unread,
            timestamp: None,
            created_date,
            recipient_user_id: None,
            recipient_terminal_user_id: None,
            related_entity_type: None,
            related_entity_id: None,
            action_url: None,
            terminal_action_code: None,
        }
    }

    /// Whether the notification has been read.
    pub fn is_read(&self) -> bool {
        matches!(self.read_state, ReadState::Read { .. })
    }

    /// When it was read, if it was.
    pub fn read_date(&self) -> Option<DateTime<Utc>> {
        match self.read_state {
            ReadState::Read { at } => Some(at),
            ReadState::Unread => None,
        }
    }

    /// Mark as read at `at`. Returns `true` only if it was unread before.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read() {
            return false;
        }
        self.read_state = ReadState::Read { at };
        true
    }

    /// Ordering key: `timestamp`, falling back to `created_date`.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or(self.created_date)
    }

    /// Navigation target for this notification.
    ///
    /// `action_url` wins; otherwise the related entity decides; otherwise
    /// the business type's screen. Unrecognized types have no route.
    pub fn route(&self) -> Option<String> {
        if let Some(url) = self.action_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
        if let (Some(kind), Some(id)) = (self.related_entity_type, self.related_entity_id) {
            return Some(format!("{}/{}", kind.route_prefix(), id));
        }
        self.notification_type.route().map(str::to_string)
    }
}
