//! Event handshake decoding.
//!
//! A check-in flow starts by scanning the event's QR code. The code carries a
//! small JSON document naming the event; this module turns that text into an
//! [`EventContext`] or explains why it can't.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while decoding a scanned payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload is not a JSON object.
    #[error("invalid QR code format: {0}")]
    MalformedPayload(String),

    /// The payload is JSON but doesn't name an event and a date.
    #[error("invalid event QR code")]
    InvalidEvent,
}

/// The event a client is checking into.
///
/// Held for a single check-in flow and dropped once the check-in has been
/// submitted or the scan is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    /// Human-readable event name.
    pub event_name: String,
    /// Calendar date of the event, as issued.
    pub date: String,
    /// Opaque token assigned when the code was issued.
    pub id: String,
}

impl EventContext {
    /// Render the QR payload text for this event.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Decode a scanned payload into an [`EventContext`].
///
/// # Errors
///
/// Returns [`DecodeError::MalformedPayload`] if the text isn't a JSON object
/// and [`DecodeError::InvalidEvent`] if `eventName` or `date` is missing or
/// empty.
pub fn decode(raw: &str) -> Result<EventContext, DecodeError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(DecodeError::MalformedPayload(
            "expected a JSON object".to_string(),
        ));
    };

    let event_name = required_text(&fields, "eventName").ok_or(DecodeError::InvalidEvent)?;
    let date = required_text(&fields, "date").ok_or(DecodeError::InvalidEvent)?;

    let id = match fields.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    Ok(EventContext {
        event_name,
        date,
        id,
    })
}

fn required_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
