//! Data transfer objects at the use-case boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::Order;
use crate::domain::shared::{OrderId, UserId};

/// Request to create an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    /// User placing the order.
    pub user_id: UserId,
    /// Order amount.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
    /// Free-text description, 1-500 characters.
    pub description: String,
}

/// Order as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDto {
    /// Order id.
    pub id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Amount.
    pub amount: Decimal,
    /// Currency.
    pub currency: String,
    /// Description.
    pub description: String,
    /// Current status as text.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl OrderDto {
    /// Build a DTO from the aggregate.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id(),
            user_id: order.user_id(),
            amount: order.amount().amount(),
            currency: order.amount().currency().to_string(),
            description: order.description().as_str().to_string(),
            status: order.status().to_string(),
            created_at: order.created_at(),
        }
    }
}

/// Inbound payment status, decoded from a `PaymentProcessed` delivery.
#[derive(Debug, Clone)]
pub struct PaymentStatusUpdate {
    /// Idempotency key: the broker message id of the result delivery.
    pub message_id: String,
    /// Order the result is for.
    pub order_id: OrderId,
    /// User the payments service debited.
    pub user_id: UserId,
    /// Whether the payment succeeded.
    pub success: bool,
    /// Failure reason when unsuccessful.
    pub reason: Option<String>,
}
