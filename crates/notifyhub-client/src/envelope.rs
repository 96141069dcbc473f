//! Response envelope unwrapping.
//!
//! The backend answers scalar endpoints either bare (`3`, `true`) or wrapped
//! in an object (`{"data": 3}`, `{"succeeded": true}`).

use serde_json::Value;

use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;

const COUNT_KEYS: [&str; 4] = ["data", "count", "unreadCount", "unread"];
const EXPLICIT_FLAG_KEYS: [&str; 2] = ["succeeded", "success"];

/// Extract the unread count from an unread-count response.
pub fn unread_count(value: &Value) -> AppResult<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|n| n.max(0) as u64))
            .ok_or_else(|| AppError::external(format!("Unread count is not an integer: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| AppError::external(format!("Unread count is not a number: {s:?}"))),
        Value::Object(map) => COUNT_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .ok_or_else(|| AppError::external("Unread count response has no count field"))
            .and_then(unread_count),
        other => Err(AppError::external(format!(
            "Unexpected unread count response: {other}"
        ))),
    }
}

/// Extract the success flag from a command response. An empty body means
/// success. An explicit `succeeded`/`success` flag outranks `data`.
pub fn flag(value: &Value) -> AppResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(true),
        Value::Object(map) => {
            if let Some(explicit) = EXPLICIT_FLAG_KEYS.iter().find_map(|key| map.get(*key)) {
                return match explicit {
                    Value::Bool(b) => Ok(*b),
                    other => Err(AppError::external(format!(
                        "Command response flag is not a boolean: {other}"
                    ))),
                };
            }
            map.get("data")
                .ok_or_else(|| AppError::external("Command response has no result field"))
                .and_then(flag)
        }
        other => Err(AppError::external(format!(
            "Unexpected command response: {other}"
        ))),
    }
}
