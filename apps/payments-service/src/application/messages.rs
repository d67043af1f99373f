//! Wire contracts exchanged with the order service.
//!
//! Field names are camelCase on the wire; both services own their copy of
//! these contracts. Unknown JSON fields (such as the order service's
//! `requestedAt`) are ignored on deserialization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{OrderId, UserId};

/// Type tag of the inbound payment command.
pub const PAYMENT_REQUESTED: &str = "PaymentRequested";

/// Type tag of the outbound payment result.
pub const PAYMENT_PROCESSED: &str = "PaymentProcessed";

/// Default queue payment commands arrive on.
pub const PAYMENT_REQUESTS_QUEUE: &str = "payment-requests";

/// Default queue payment results are published to.
pub const PAYMENT_RESULTS_QUEUE: &str = "payment-results";

/// Body of a `PaymentRequested` delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCommandBody {
    /// Order to settle.
    pub order_id: OrderId,
    /// Paying user.
    pub user_id: UserId,
    /// Amount to debit.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
}

/// Final outcome of a payment, published as `PaymentProcessed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Id of the command message this result answers.
    pub message_id: String,
    /// Order the payment was for.
    pub order_id: OrderId,
    /// Paying user.
    pub user_id: UserId,
    /// Whether the debit succeeded.
    pub success: bool,
    /// Failure reason when `success` is false.
    pub reason: Option<String>,
}
