//! JSON hub protocol framing.
//!
//! Every record is a JSON object terminated by `0x1E`. A text frame may
//! carry several records. The client opens with a handshake record and the
//! hub answers with `{}` (or `{"error": ...}`).

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::trace;

use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;

/// Record terminator.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const INVOCATION: u8 = 1;
const PING: u8 = 6;
const CLOSE: u8 = 7;

/// A decoded hub record.
#[derive(Debug, Clone, PartialEq)]
pub enum HubRecord {
    /// Server-to-client method call.
    Invocation {
        target: String,
        arguments: Vec<Value>,
    },
    /// Keep-alive.
    Ping,
    /// The hub is closing the connection.
    Close { error: Option<String> },
    /// Any record type this client does not act on.
    Other(u8),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: Option<u8>,
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    error: Option<String>,
}

fn frame(value: &Value) -> String {
    let mut text = value.to_string();
    text.push(RECORD_SEPARATOR);
    text
}

/// The opening handshake record.
pub fn handshake_request() -> String {
    frame(&json!({"protocol": "json", "version": 1}))
}

/// A client keep-alive record.
pub fn ping_record() -> String {
    frame(&json!({"type": PING}))
}

/// Check the hub's handshake answer. Anything after the first record is
/// returned for normal decoding.
pub fn parse_handshake_response(text: &str) -> AppResult<&str> {
    let (first, rest) = text
        .split_once(RECORD_SEPARATOR)
        .ok_or_else(|| AppError::transport("Handshake response is not terminated"))?;
    let value: Value = serde_json::from_str(first)?;
    match value.get("error").and_then(Value::as_str) {
        Some(error) => Err(AppError::transport(format!("Hub rejected handshake: {error}"))),
        None => Ok(rest),
    }
}

/// Split a text frame into records. Malformed records are skipped.
pub fn decode(text: &str) -> Vec<HubRecord> {
    text.split(RECORD_SEPARATOR)
        .filter(|chunk| !chunk.trim().is_empty())
        .filter_map(|chunk| match serde_json::from_str::<RawRecord>(chunk) {
            Ok(raw) => Some(raw),
            Err(e) => {
                trace!(error = %e, "Skipping malformed hub record");
                None
            }
        })
        .map(|raw| match (raw.kind, raw.target) {
            (Some(INVOCATION), Some(target)) => HubRecord::Invocation {
                target,
                arguments: raw.arguments,
            },
            (Some(PING), _) => HubRecord::Ping,
            (Some(CLOSE), _) => HubRecord::Close { error: raw.error },
            (kind, _) => HubRecord::Other(kind.unwrap_or(0)),
        })
        .collect()
}
