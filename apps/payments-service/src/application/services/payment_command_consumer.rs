//! Consumer for `PaymentRequested` commands.
//!
//! Two-phase consumption: this consumer's only job is to record the
//! delivery in the inbox (deduplicated by broker message id) inside one
//! local transaction, then acknowledge the broker. Business processing
//! happens later in the inbox processor, so a broker redelivery during a
//! crash costs a duplicate existence check, never a duplicate debit.

use std::sync::Arc;

use messaging::{ConsumeError, MessageConsumer, MessageEnvelope, MessageHandler};
use tracing::{debug, error, info, warn};

use crate::application::messages::PaymentCommandBody;
use crate::application::ports::{InboxMessage, PaymentsTx, PaymentsUnitOfWork, StorageError};

/// Subscribes to the payment-requests queue and records commands.
pub struct PaymentCommandConsumer<U: PaymentsUnitOfWork + 'static, C: MessageConsumer + 'static> {
    uow: Arc<U>,
    consumer: Arc<C>,
    queue: String,
}

impl<U: PaymentsUnitOfWork + 'static, C: MessageConsumer + 'static> PaymentCommandConsumer<U, C> {
    /// Create the consumer.
    pub fn new(uow: Arc<U>, consumer: Arc<C>, queue: impl Into<String>) -> Self {
        Self {
            uow,
            consumer,
            queue: queue.into(),
        }
    }

    /// Subscribe to the queue. Returns once the subscription is
    /// registered; deliveries are handled asynchronously after that.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumeError`] if the subscription cannot be established.
    pub async fn start(&self) -> Result<(), ConsumeError> {
        let uow = Arc::clone(&self.uow);
        let consumer = Arc::clone(&self.consumer);
        let handler: MessageHandler = Arc::new(move |envelope| {
            let uow = Arc::clone(&uow);
            let consumer = Arc::clone(&consumer);
            Box::pin(async move {
                handle_delivery(uow.as_ref(), consumer.as_ref(), envelope).await;
            })
        });
        self.consumer.subscribe(&self.queue, handler).await?;
        info!(queue = %self.queue, "subscribed to payment commands");
        Ok(())
    }
}

async fn handle_delivery<U: PaymentsUnitOfWork, C: MessageConsumer>(
    uow: &U,
    consumer: &C,
    envelope: MessageEnvelope,
) {
    let body: PaymentCommandBody = match serde_json::from_str(&envelope.body) {
        Ok(body) => body,
        Err(err) => {
            error!(
                message_id = %envelope.message_id,
                error = %err,
                "malformed payment command, dropping"
            );
            settle(consumer, &envelope, false).await;
            return;
        }
    };

    match record_in_inbox(uow, &envelope, &body).await {
        Ok(inserted) => {
            if inserted {
                debug!(
                    message_id = %envelope.message_id,
                    order_id = %body.order_id,
                    "command recorded in inbox"
                );
            } else {
                info!(
                    message_id = %envelope.message_id,
                    "command already in inbox, skipping"
                );
            }
            if let Err(err) = consumer.ack(&envelope).await {
                error!(message_id = %envelope.message_id, error = %err, "failed to ack delivery");
            }
        }
        Err(err) => {
            warn!(
                message_id = %envelope.message_id,
                error = %err,
                "failed to record command, requeueing"
            );
            settle(consumer, &envelope, true).await;
        }
    }
}

/// Insert a Pending inbox row unless one exists. Returns whether a row was
/// inserted.
async fn record_in_inbox<U: PaymentsUnitOfWork>(
    uow: &U,
    envelope: &MessageEnvelope,
    body: &PaymentCommandBody,
) -> Result<bool, StorageError> {
    let mut tx = uow.begin().await?;
    if tx.inbox_contains(&envelope.message_id).await? {
        tx.rollback().await;
        return Ok(false);
    }
    tx.insert_inbox(InboxMessage::pending(
        &envelope.message_id,
        body.order_id,
        body.user_id,
        &envelope.body,
        &envelope.message_type,
    ))
    .await?;
    tx.commit().await?;
    Ok(true)
}

async fn settle<C: MessageConsumer>(consumer: &C, envelope: &MessageEnvelope, requeue: bool) {
    if let Err(err) = consumer.reject(envelope, requeue).await {
        error!(
            message_id = %envelope.message_id,
            error = %err,
            "failed to settle delivery"
        );
    }
}
