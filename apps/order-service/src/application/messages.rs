//! Wire contracts exchanged with the payments service.
//!
//! Field names are camelCase on the wire; both services own their copy of
//! these contracts, as usual between independently deployed services.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{OrderId, UserId};

/// Type tag for the outbound payment command.
pub const PAYMENT_REQUESTED: &str = "PaymentRequested";

/// Type tag for the inbound payment result.
pub const PAYMENT_PROCESSED: &str = "PaymentProcessed";

/// Default queue the payment commands are published to.
pub const PAYMENT_REQUESTS_QUEUE: &str = "payment-requests";

/// Default queue the payment results arrive on.
pub const PAYMENT_RESULTS_QUEUE: &str = "payment-results";

/// Command asking the payments service to settle an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequested {
    /// Order to settle.
    pub order_id: OrderId,
    /// Paying user.
    pub user_id: UserId,
    /// Amount to debit.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
    /// When the order service requested payment.
    pub requested_at: DateTime<Utc>,
}

/// Final outcome of a payment, published by the payments service.
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

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn payment_requested_uses_camel_case() {
        let message = PaymentRequested {
            order_id: OrderId::generate(),
            user_id: UserId::generate(),
            amount: dec!(100.00),
            currency: "RUB".to_string(),
            requested_at: Utc::now(),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"orderId\""));
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"requestedAt\""));
    }

    #[test]
    fn payment_result_roundtrip() {
        let message = PaymentResult {
            message_id: "msg-1".to_string(),
            order_id: OrderId::generate(),
            user_id: UserId::generate(),
            success: false,
            reason: Some("Insufficient funds".to_string()),
        };
        let json = serde_json::to_string(&message).unwrap();
        let parsed: PaymentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.message_id, "msg-1");
        assert!(!parsed.success);
        assert_eq!(parsed.reason.as_deref(), Some("Insufficient funds"));
    }
}
