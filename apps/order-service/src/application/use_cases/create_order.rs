//! Create Order use case.

use std::sync::Arc;

use chrono::Utc;

use crate::application::dto::{CreateOrderRequest, OrderDto};
use crate::application::messages::{PaymentRequested, PAYMENT_REQUESTED};
use crate::application::ports::{OrderTx, OrderUnitOfWork, OutboxMessage};
use crate::domain::order::{Order, OrderDescription, OrderError};
use crate::domain::shared::Money;
use crate::error::OrderServiceError;

/// Creates an order and, atomically with it, the `PaymentRequested`
/// command in the outbox. The relay picks the command up afterwards; if
/// this transaction does not commit, no command ever leaves the service.
pub struct CreateOrderUseCase<U: OrderUnitOfWork> {
    uow: Arc<U>,
    payment_requests_queue: String,
}

impl<U: OrderUnitOfWork> CreateOrderUseCase<U> {
    /// Create the use case.
    pub fn new(uow: Arc<U>, payment_requests_queue: impl Into<String>) -> Self {
        Self {
            uow,
            payment_requests_queue: payment_requests_queue.into(),
        }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad amount or description, or a
    /// storage error if the transaction fails.
    pub async fn execute(&self, request: CreateOrderRequest) -> Result<OrderDto, OrderServiceError> {
        let amount =
            Money::new(request.amount, &request.currency).map_err(OrderError::from)?;
        let description = OrderDescription::new(&request.description)?;
        let order = Order::create(request.user_id, amount, description, Utc::now())?;

        let payload = PaymentRequested {
            order_id: order.id(),
            user_id: order.user_id(),
            amount: order.amount().amount(),
            currency: order.amount().currency().to_string(),
            requested_at: Utc::now(),
        };
        let message = OutboxMessage::new(
            PAYMENT_REQUESTED,
            serde_json::to_string(&payload)?,
            &self.payment_requests_queue,
        );

        let mut tx = self.uow.begin().await?;
        tx.insert_order(&order).await?;
        tx.add_outbox(message).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id(), user_id = %order.user_id(), "order created");
        Ok(OrderDto::from_order(&order))
    }
}
