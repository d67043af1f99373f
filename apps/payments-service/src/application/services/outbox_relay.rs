//! Outbox relay: polls unsent outbox rows and publishes them.
//!
//! A publish failure for one message never blocks the rest of the batch;
//! the row stays unsent with the error recorded and is retried on the next
//! poll. The row's `message_id` travels with every retry so the order
//! service can deduplicate a double publish.

use std::sync::Arc;
use std::time::Duration;

use messaging::{MessageEnvelope, MessagePublisher};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::messages::{PaymentResult, PAYMENT_PROCESSED};
use crate::application::ports::{OutboxMessage, OutboxStore, StorageError};

/// Relay tuning knobs.
#[derive(Debug, Clone)]
pub struct OutboxRelayConfig {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Maximum rows fetched per poll.
    pub batch_size: usize,
    /// Delay after a whole-cycle failure (broker unreachable, store down).
    pub error_backoff: Duration,
    /// Extra randomization applied to the error backoff (0.2 = up to +20%).
    pub jitter_factor: f64,
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
            error_backoff: Duration::from_secs(10),
            jitter_factor: 0.2,
        }
    }
}

/// Result of decoding an outbox row through the type registry.
enum Decoded {
    /// Known type, payload re-serialized from the typed schema.
    Payload(String),
    /// Type tag not in the known set.
    UnknownType,
    /// Known type but the body does not parse.
    Malformed(String),
}

/// The closed set of message types this service publishes.
fn decode_outbound(message: &OutboxMessage) -> Decoded {
    match message.message_type.as_str() {
        PAYMENT_PROCESSED => match serde_json::from_str::<PaymentResult>(&message.body) {
            Ok(payload) => match serde_json::to_string(&payload) {
                Ok(body) => Decoded::Payload(body),
                Err(err) => Decoded::Malformed(err.to_string()),
            },
            Err(err) => Decoded::Malformed(err.to_string()),
        },
        _ => Decoded::UnknownType,
    }
}

/// Background loop turning committed outbox rows into broker publishes.
pub struct OutboxRelay<S: OutboxStore, P: MessagePublisher> {
    store: Arc<S>,
    publisher: Arc<P>,
    config: OutboxRelayConfig,
    cancel: CancellationToken,
}

impl<S: OutboxStore, P: MessagePublisher> OutboxRelay<S, P> {
    /// Create the relay.
    pub fn new(
        store: Arc<S>,
        publisher: Arc<P>,
        config: OutboxRelayConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
            cancel,
        }
    }

    /// Run until the cancellation token fires.
    pub async fn run(self) {
        info!("outbox relay started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let delay = match self.run_once().await {
                Ok(()) => self.config.poll_interval,
                Err(err) => {
                    error!(error = %err, "outbox relay cycle failed");
                    self.error_delay()
                }
            };
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        info!("outbox relay stopped");
    }

    /// Process a single poll cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the store itself fails; per-message
    /// publish failures are recorded on the rows instead.
    pub async fn run_once(&self) -> Result<(), StorageError> {
        let batch = self.store.get_unsent_batch(self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(());
        }
        debug!(count = batch.len(), "processing outbox batch");

        let mut sent = Vec::new();
        for message in batch {
            match self.publish_one(&message).await {
                Ok(true) => sent.push(message.message_id),
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        message_id = %message.message_id,
                        error = %err,
                        "failed to publish outbox message"
                    );
                    self.store
                        .record_failure(&message.message_id, &err.to_string())
                        .await?;
                }
            }
        }

        if !sent.is_empty() {
            info!(count = sent.len(), "outbox messages published");
            self.store.mark_sent(&sent).await?;
        }
        Ok(())
    }

    /// Publish one row. `Ok(true)` marks the row sent; `Ok(false)` skips it.
    async fn publish_one(&self, message: &OutboxMessage) -> Result<bool, messaging::PublishError> {
        let body = match decode_outbound(message) {
            Decoded::Payload(body) => body,
            Decoded::UnknownType => {
                warn!(
                    message_id = %message.message_id,
                    message_type = %message.message_type,
                    "unknown outbox message type, skipping"
                );
                return Ok(false);
            }
            Decoded::Malformed(err) => {
                warn!(
                    message_id = %message.message_id,
                    error = %err,
                    "outbox message body does not match its type, skipping"
                );
                return Ok(false);
            }
        };

        let envelope = MessageEnvelope::new(&message.message_id, &message.message_type, body)
            .with_header("x-outbox-id", &message.message_id)
            .with_header("x-correlation-id", &message.correlation_id);
        self.publisher
            .publish(envelope, &message.destination)
            .await?;
        Ok(true)
    }

    fn error_delay(&self) -> Duration {
        let factor = self.config.jitter_factor;
        if factor <= 0.0 {
            return self.config.error_backoff;
        }
        let jitter = rand::rng().random_range(0.0..=factor);
        self.config.error_backoff.mul_f64(1.0 + jitter)
    }
}

#[cfg(test)]
mod tests {
    use messaging::InMemoryBroker;

    use super::*;
    use crate::application::ports::{PaymentsTx, PaymentsUnitOfWork};
    use crate::domain::shared::{OrderId, UserId};
    use crate::infrastructure::persistence::InMemoryPaymentsStore;

    fn result_body() -> String {
        serde_json::to_string(&PaymentResult {
            message_id: "cmd-1".to_string(),
            order_id: OrderId::generate(),
            user_id: UserId::generate(),
            success: true,
            reason: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn publishes_results_and_marks_sent() {
        let store = Arc::new(InMemoryPaymentsStore::new());
        let broker = InMemoryBroker::new();

        let mut tx = store.begin().await.unwrap();
        tx.add_outbox(
            OutboxMessage::new(PAYMENT_PROCESSED, result_body(), "payment-results")
                .with_correlation_id("cmd-1"),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let relay = OutboxRelay::new(
            Arc::clone(&store),
            Arc::new(broker.clone()),
            OutboxRelayConfig::default(),
            CancellationToken::new(),
        );
        relay.run_once().await.unwrap();

        assert_eq!(broker.queue_depth("payment-results").await, 1);
        assert!(store.get_unsent_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_records_error_and_keeps_row() {
        let store = Arc::new(InMemoryPaymentsStore::new());
        let broker = InMemoryBroker::new();
        broker.inject_publish_failures(1);

        let mut tx = store.begin().await.unwrap();
        tx.add_outbox(OutboxMessage::new(
            PAYMENT_PROCESSED,
            result_body(),
            "payment-results",
        ))
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let relay = OutboxRelay::new(
            Arc::clone(&store),
            Arc::new(broker.clone()),
            OutboxRelayConfig::default(),
            CancellationToken::new(),
        );
        relay.run_once().await.unwrap();

        let unsent = store.get_unsent_batch(10).await.unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].retry_count, 1);
        assert!(unsent[0].last_error.is_some());
        assert_eq!(broker.queue_depth("payment-results").await, 0);
    }
}
