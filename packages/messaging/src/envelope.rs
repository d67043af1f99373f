//! Wire envelope carried by every broker delivery.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message as seen by the broker.
///
/// `message_id` is the externally-visible identity of the message and must
/// be stable across publish retries: the consuming side deduplicates on it.
/// Producers therefore take it from their outbox row rather than minting a
/// fresh id per publish attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Stable message identity, the dedup key on the consuming side.
    pub message_id: String,
    /// Serialized JSON payload.
    pub body: String,
    /// Type tag used to select the payload schema (e.g. "PaymentRequested").
    pub message_type: String,
    /// Transport headers.
    pub headers: HashMap<String, String>,
    /// Publish timestamp.
    pub timestamp: DateTime<Utc>,
}

impl MessageEnvelope {
    /// Create an envelope with empty headers and the current timestamp.
    #[must_use]
    pub fn new(
        message_id: impl Into<String>,
        message_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
            message_type: message_type.into(),
            headers: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Look up a header value.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_new_sets_fields() {
        let envelope = MessageEnvelope::new("msg-1", "PaymentRequested", "{}");
        assert_eq!(envelope.message_id, "msg-1");
        assert_eq!(envelope.message_type, "PaymentRequested");
        assert_eq!(envelope.body, "{}");
        assert!(envelope.headers.is_empty());
    }

    #[test]
    fn envelope_with_header() {
        let envelope = MessageEnvelope::new("msg-1", "PaymentRequested", "{}")
            .with_header("x-correlation-id", "corr-9");
        assert_eq!(envelope.header("x-correlation-id"), Some("corr-9"));
        assert_eq!(envelope.header("missing"), None);
    }

    #[test]
    fn envelope_serde_roundtrip() {
        let envelope = MessageEnvelope::new("msg-1", "PaymentProcessed", r#"{"ok":true}"#)
            .with_header("x-outbox-id", "row-3");
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: MessageEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.message_id, envelope.message_id);
        assert_eq!(parsed.header("x-outbox-id"), Some("row-3"));
    }
}
