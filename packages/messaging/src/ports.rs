//! Broker ports (driven ports).
//!
//! The services depend on these traits only; transports implement them.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::envelope::MessageEnvelope;

/// Error publishing a message to the broker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// Broker is unreachable or the channel is closed.
    #[error("broker connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// The broker refused the message.
    #[error("publish to '{routing_key}' failed: {message}")]
    Rejected {
        /// Routing key the publish targeted.
        routing_key: String,
        /// Error details.
        message: String,
    },
}

/// Error on the consuming side of the broker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsumeError {
    /// Subscription target does not exist or is closed.
    #[error("queue '{queue}' is not available: {message}")]
    Subscription {
        /// Queue name.
        queue: String,
        /// Error details.
        message: String,
    },

    /// Ack/reject referenced a delivery the broker is not tracking.
    #[error("delivery {message_id} is not in flight")]
    NotInFlight {
        /// Message id of the unknown delivery.
        message_id: String,
    },
}

/// Handler invoked once per delivery.
///
/// The handler must settle every delivery by calling exactly one of
/// [`MessageConsumer::ack`] or [`MessageConsumer::reject`]; until it does,
/// the delivery stays in flight.
pub type MessageHandler =
    Arc<dyn Fn(MessageEnvelope) -> BoxFuture<'static, ()> + Send + Sync + 'static>;

/// Port for publishing messages.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish an envelope to a routing key.
    ///
    /// Returning `Ok` means the broker durably accepted the message; the
    /// outbox relay only marks rows sent after that.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the broker did not accept the message.
    async fn publish(
        &self,
        envelope: MessageEnvelope,
        routing_key: &str,
    ) -> Result<(), PublishError>;
}

/// Port for consuming messages.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Register a handler for a queue. Deliveries arrive one at a time,
    /// in queue order.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumeError`] if the subscription cannot be established.
    async fn subscribe(&self, queue: &str, handler: MessageHandler) -> Result<(), ConsumeError>;

    /// Acknowledge a delivery.
    ///
    /// This settles broker-level delivery only; business processing may
    /// still be pending in an inbox.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumeError::NotInFlight`] for an unknown delivery.
    async fn ack(&self, message: &MessageEnvelope) -> Result<(), ConsumeError>;

    /// Reject a delivery, optionally requeueing it for redelivery.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumeError::NotInFlight`] for an unknown delivery.
    async fn reject(&self, message: &MessageEnvelope, requeue: bool) -> Result<(), ConsumeError>;
}
