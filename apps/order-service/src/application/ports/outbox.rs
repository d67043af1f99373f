//! Outbox message and the store port used by the relay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StorageError;

/// A message awaiting publication.
///
/// Appended in the same local transaction as the business change it
/// describes, and never deleted: `sent` flips to true only after the
/// broker accepted the publish. `message_id` is the stable wire identity
/// reused on every publish retry so consumers can deduplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Stable wire identity of the message.
    pub message_id: String,
    /// Correlates the message to the business exchange it belongs to.
    pub correlation_id: String,
    /// Type tag selecting the payload schema.
    pub message_type: String,
    /// Serialized JSON payload.
    pub body: String,
    /// Queue / routing key to publish to.
    pub destination: String,
    /// When the row was appended.
    pub created_at: DateTime<Utc>,
    /// Whether the broker accepted the publish.
    pub sent: bool,
    /// When the publish was accepted.
    pub sent_at: Option<DateTime<Utc>>,
    /// Failed publish attempts so far.
    pub retry_count: u32,
    /// Most recent publish error.
    pub last_error: Option<String>,
}

impl OutboxMessage {
    /// Create an unsent message with a fresh id, correlated to itself.
    #[must_use]
    pub fn new(
        message_type: impl Into<String>,
        body: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        let message_id = Uuid::new_v4().to_string();
        Self {
            correlation_id: message_id.clone(),
            message_id,
            message_type: message_type.into(),
            body: body.into(),
            destination: destination.into(),
            created_at: Utc::now(),
            sent: false,
            sent_at: None,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Override the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

/// Store port for the outbox relay.
///
/// `add` is deliberately absent here: appends happen only inside a unit
/// of work, through [`super::OrderTx::add_outbox`].
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Fetch the oldest `limit` unsent messages.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_unsent_batch(&self, limit: usize) -> Result<Vec<OutboxMessage>, StorageError>;

    /// Mark a batch of messages as sent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn mark_sent(&self, message_ids: &[String]) -> Result<(), StorageError>;

    /// Record a failed publish attempt for one message.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn record_failure(&self, message_id: &str, error: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_is_unsent_and_self_correlated() {
        let message = OutboxMessage::new("PaymentRequested", "{}", "payment-requests");
        assert!(!message.sent);
        assert_eq!(message.retry_count, 0);
        assert_eq!(message.correlation_id, message.message_id);
    }

    #[test]
    fn correlation_id_can_be_overridden() {
        let message =
            OutboxMessage::new("PaymentProcessed", "{}", "payment-results").with_correlation_id("cmd-7");
        assert_eq!(message.correlation_id, "cmd-7");
        assert_ne!(message.message_id, "cmd-7");
    }
}
