//! Consumer for `PaymentProcessed` results.
//!
//! Each delivery is settled with exactly one ack or reject. The broker id
//! of the delivery doubles as the idempotency key, so redelivered results
//! are harmless.

use std::sync::Arc;

use messaging::{ConsumeError, MessageConsumer, MessageEnvelope, MessageHandler};
use tracing::{error, info, warn};

use crate::application::dto::PaymentStatusUpdate;
use crate::application::messages::PaymentResult;
use crate::application::ports::OrderUnitOfWork;
use crate::application::use_cases::ApplyPaymentStatusUseCase;
use crate::error::OrderServiceError;

/// Subscribes to the payment-results queue and applies each result.
pub struct PaymentResultConsumer<U: OrderUnitOfWork + 'static, C: MessageConsumer + 'static> {
    use_case: Arc<ApplyPaymentStatusUseCase<U>>,
    consumer: Arc<C>,
    queue: String,
}

impl<U: OrderUnitOfWork + 'static, C: MessageConsumer + 'static> PaymentResultConsumer<U, C> {
    /// Create the consumer.
    pub fn new(
        use_case: Arc<ApplyPaymentStatusUseCase<U>>,
        consumer: Arc<C>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            use_case,
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
        let use_case = Arc::clone(&self.use_case);
        let consumer = Arc::clone(&self.consumer);
        let handler: MessageHandler = Arc::new(move |envelope| {
            let use_case = Arc::clone(&use_case);
            let consumer = Arc::clone(&consumer);
            Box::pin(async move {
                handle_delivery(&use_case, consumer.as_ref(), envelope).await;
            })
        });
        self.consumer.subscribe(&self.queue, handler).await?;
        info!(queue = %self.queue, "subscribed to payment results");
        Ok(())
    }
}

async fn handle_delivery<U: OrderUnitOfWork, C: MessageConsumer>(
    use_case: &ApplyPaymentStatusUseCase<U>,
    consumer: &C,
    envelope: MessageEnvelope,
) {
    let result: PaymentResult = match serde_json::from_str(&envelope.body) {
        Ok(result) => result,
        Err(err) => {
            error!(
                message_id = %envelope.message_id,
                error = %err,
                "malformed payment result, dropping"
            );
            settle(consumer, &envelope, Settle::Drop).await;
            return;
        }
    };

    let update = PaymentStatusUpdate {
        message_id: envelope.message_id.clone(),
        order_id: result.order_id,
        user_id: result.user_id,
        success: result.success,
        reason: result.reason,
    };

    match use_case.execute(update).await {
        Ok(outcome) => {
            info!(
                message_id = %envelope.message_id,
                order_id = %result.order_id,
                ?outcome,
                "payment result handled"
            );
            settle(consumer, &envelope, Settle::Ack).await;
        }
        Err(err) if err.is_retriable() => {
            warn!(
                message_id = %envelope.message_id,
                order_id = %result.order_id,
                error = %err,
                "transient failure applying payment result, requeueing"
            );
            settle(consumer, &envelope, Settle::Requeue).await;
        }
        Err(err) => {
            log_permanent_failure(&err, &envelope);
            settle(consumer, &envelope, Settle::Drop).await;
        }
    }
}

fn log_permanent_failure(err: &OrderServiceError, envelope: &MessageEnvelope) {
    error!(
        message_id = %envelope.message_id,
        error = %err,
        "payment result cannot be applied, dropping"
    );
}

enum Settle {
    Ack,
    Requeue,
    Drop,
}

async fn settle<C: MessageConsumer>(consumer: &C, envelope: &MessageEnvelope, how: Settle) {
    let result = match how {
        Settle::Ack => consumer.ack(envelope).await,
        Settle::Requeue => consumer.reject(envelope, true).await,
        Settle::Drop => consumer.reject(envelope, false).await,
    };
    if let Err(err) = result {
        error!(
            message_id = %envelope.message_id,
            error = %err,
            "failed to settle delivery"
        );
    }
}
