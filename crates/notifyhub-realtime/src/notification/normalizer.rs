//! Wire payload normalization.
//!
//! Push events and REST rows disagree on field names (`type` vs
//! `notificationType`, `createdAt` vs `createdDate`, camelCase vs PascalCase)
//! and on enum encodings (numeric codes vs names). Everything is folded into
//! a [`Notification`] here. Normalization never fails: missing or malformed
//! fields degrade to defaults so the record is always displayable.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use super::model::{
    DeliveryChannel, Notification, NotificationType, ReadState, RelatedEntityType, Severity,
};

const ID: &[&str] = &["id", "notificationId"];
const USER_ID: &[&str] = &["userId", "recipientUserId"];
const TITLE: &[&str] = &["title", "subject"];
const MESSAGE: &[&str] = &["message", "body", "content"];
const TYPE: &[&str] = &["notificationType", "type"];
const CHANNEL: &[&str] = &["channel", "notificationChannel", "deliveryChannel"];
const SEVERITY: &[&str] = &["severity", "level"];
const IS_READ: &[&str] = &["isRead", "read"];
const READ_DATE: &[&str] = &["readDate", "readAt"];
const TIMESTAMP: &[&str] = &["timestamp"];
const CREATED: &[&str] = &["createdDate", "createdAt", "createdOn"];
const RECIPIENT_USER: &[&str] = &["recipientUserId"];
const RECIPIENT_TERMINAL_USER: &[&str] = &["recipientTerminalUserId"];
const ENTITY_TYPE: &[&str] = &["relatedEntityType", "entityType"];
const ENTITY_ID: &[&str] = &["relatedEntityId", "entityId"];
const ACTION_URL: &[&str] = &["actionUrl"];
const TERMINAL_ACTION: &[&str] = &["terminalActionCode"];

/// An enum value as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireEnum<'a> {
    Text(&'a str),
    Code(i64),
    Absent,
}

impl<'a> WireEnum<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(text)) => Self::Text(text),
            Some(other) => as_i64(other).map_or(Self::Absent, Self::Code),
            None => Self::Absent,
        }
    }
}

impl Severity {
    /// Decode a wire severity. Names match case-sensitively; unknown values
    /// become [`Severity::Info`].
    fn decode(value: Option<&Value>) -> Self {
        match WireEnum::of(value) {
            WireEnum::Text("info") | WireEnum::Code(1) => Self::Info,
            WireEnum::Text("warning") | WireEnum::Code(2) => Self::Warning,
            WireEnum::Text("error") | WireEnum::Code(3) => Self::Error,
            WireEnum::Text(_) | WireEnum::Code(_) | WireEnum::Absent => Self::Info,
        }
    }
}

impl DeliveryChannel {
    /// Decode a wire channel. Unknown values become [`DeliveryChannel::Web`].
    fn decode(value: Option<&Value>) -> Self {
        match WireEnum::of(value) {
            WireEnum::Text("Terminal") | WireEnum::Code(1) => Self::Terminal,
            WireEnum::Text("Web") | WireEnum::Code(2) => Self::Web,
            WireEnum::Text(_) | WireEnum::Code(_) | WireEnum::Absent => Self::Web,
        }
    }
}

impl NotificationType {
    /// Decode a business type against the allow-list. Unknown values become
    /// [`NotificationType::General`], which has no type-level route.
    fn decode(value: Option<&Value>) -> Self {
        let decoded = match WireEnum::of(value) {
            WireEnum::Text(name) => Self::from_name(name),
            WireEnum::Code(code) => Self::from_code(code),
            WireEnum::Absent => return Self::General,
        };
        decoded.unwrap_or_else(|| {
            debug!(value = ?value, "Unrecognized notification type, routing disabled");
            Self::General
        })
    }
}

impl RelatedEntityType {
    fn decode(value: Option<&Value>) -> Option<Self> {
        match WireEnum::of(value) {
            WireEnum::Text("Demand") | WireEnum::Code(1) => Some(Self::Demand),
            WireEnum::Text("Quotation") | WireEnum::Code(2) => Some(Self::Quotation),
            WireEnum::Text("Order") | WireEnum::Code(3) => Some(Self::Order),
            WireEnum::Text(_) | WireEnum::Code(_) | WireEnum::Absent => None,
        }
    }
}

/// Normalize a payload, using the current time for missing timestamps.
pub fn normalize(raw: &Value) -> Notification {
    normalize_at(raw, Utc::now())
}

/// Normalize a payload, using `now` for missing timestamps.
pub fn normalize_at(raw: &Value, now: DateTime<Utc>) -> Notification {
    match raw {
        Value::Object(map) => from_map(map, now),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => from_map(&map, now),
            _ => Notification::new(0, "", text.clone(), now),
        },
        _ => Notification::new(0, "", "", now),
    }
}

fn from_map(map: &Map<String, Value>, now: DateTime<Utc>) -> Notification {
    let fields = Fields(map);

    let created_date = fields.time(CREATED).unwrap_or(now);
    let timestamp = fields.time(TIMESTAMP);
    let read_date = fields.time(READ_DATE);
    let read_state = match (fields.flag(IS_READ), read_date) {
        (Some(true), at) => ReadState::Read {
            at: at.unwrap_or(now),
        },
        (None, Some(at)) => ReadState::Read { at },
        (Some(false), _) | (None, None) => ReadState::Unread,
    };

    Notification {
        id: fields.int(ID).unwrap_or(0),
        user_id: fields.int(USER_ID).unwrap_or(0),
        title: fields.text(TITLE).unwrap_or_default(),
        message: fields.text(MESSAGE).unwrap_or_default(),
        notification_type: NotificationType::decode(fields.get(TYPE)),
        channel: DeliveryChannel::decode(fields.get(CHANNEL)),
        severity: Severity::decode(fields.get(SEVERITY)),
        read_state,
        timestamp,
        created_date,
        recipient_user_id: fields.int(RECIPIENT_USER),
        recipient_terminal_user_id: fields.int(RECIPIENT_TERMINAL_USER),
        related_entity_type: RelatedEntityType::decode(fields.get(ENTITY_TYPE)),
        related_entity_id: fields.int(ENTITY_ID),
        action_url: fields.text(ACTION_URL).filter(|s| !s.is_empty()),
        terminal_action_code: fields.text(TERMINAL_ACTION).filter(|s| !s.is_empty()),
    }
}

/// Alias-aware field access over a JSON object.
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    /// First non-null value among `names`, exact match first, then
    /// ASCII case-insensitive.
    fn get(&self, names: &[&str]) -> Option<&'a Value> {
        let exact = names
            .iter()
            .find_map(|name| self.0.get(*name).filter(|v| !v.is_null()));
        exact.or_else(|| {
            names.iter().find_map(|name| {
                self.0
                    .iter()
                    .find(|(key, value)| key.eq_ignore_ascii_case(name) && !value.is_null())
                    .map(|(_, value)| value)
            })
        })
    }

    fn int(&self, names: &[&str]) -> Option<i64> {
        self.get(names).and_then(as_i64)
    }

    fn text(&self, names: &[&str]) -> Option<String> {
        match self.get(names)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn flag(&self, names: &[&str]) -> Option<bool> {
        match self.get(names)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.as_str() {
                "true" | "True" | "1" => Some(true),
                "false" | "False" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn time(&self, names: &[&str]) -> Option<DateTime<Utc>> {
        self.get(names).and_then(parse_timestamp)
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339, zone-less ISO (taken as UTC), or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
