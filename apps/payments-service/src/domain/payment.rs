//! Payment aggregate root.
//!
//! Exactly one payment exists per order (enforced by the store's
//! uniqueness constraint on the order id). A payment settles to `Success`
//! or `Failed` exactly once; repeating the same outcome is a no-op and the
//! opposite outcome is illegal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{Money, OrderId, PaymentId, UserId};

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Created, not yet settled.
    Pending,
    /// Debit succeeded. Terminal.
    Success,
    /// Debit failed. Terminal.
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Errors raised by Payment state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// The requested status change is not legal from the current status.
    #[error("invalid payment state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: PaymentStatus,
        /// Attempted status.
        to: PaymentStatus,
    },
}

/// Payment aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: OrderId,
    user_id: UserId,
    amount: Money,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Payment {
    /// Create a pending payment for an order.
    #[must_use]
    pub fn create(order_id: OrderId, user_id: UserId, amount: Money) -> Self {
        Self {
            id: PaymentId::generate(),
            order_id,
            user_id,
            amount,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            version: 1,
        }
    }

    /// Reconstitute a payment from stored state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn reconstitute(
        id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        status: PaymentStatus,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        version: u64,
    ) -> Self {
        Self {
            id,
            order_id,
            user_id,
            amount,
            status,
            created_at,
            completed_at,
            version,
        }
    }

    /// Get the payment id.
    #[must_use]
    pub const fn id(&self) -> PaymentId {
        self.id
    }

    /// Get the order the payment settles.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Get the paying user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Get the amount.
    #[must_use]
    pub const fn amount(&self) -> &Money {
        &self.amount
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the completion timestamp, if settled.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Get the version counter.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Settle the payment as successful.
    ///
    /// Idempotent when already `Success`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidTransition`] when already `Failed`.
    pub fn mark_success(&mut self) -> Result<(), PaymentError> {
        match self.status {
            PaymentStatus::Success => Ok(()),
            PaymentStatus::Failed => Err(PaymentError::InvalidTransition {
                from: self.status,
                to: PaymentStatus::Success,
            }),
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Success;
                self.completed_at = Some(Utc::now());
                self.version += 1;
                Ok(())
            }
        }
    }

    /// Settle the payment as failed.
    ///
    /// Idempotent when already `Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidTransition`] when already `Success`.
    pub fn mark_failed(&mut self) -> Result<(), PaymentError> {
        match self.status {
            PaymentStatus::Failed => Ok(()),
            PaymentStatus::Success => Err(PaymentError::InvalidTransition {
                from: self.status,
                to: PaymentStatus::Failed,
            }),
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Failed;
                self.completed_at = Some(Utc::now());
                self.version += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn make_payment() -> Payment {
        Payment::create(
            OrderId::generate(),
            UserId::generate(),
            Money::new(dec!(100), "RUB").unwrap(),
        )
    }

    #[test]
    fn create_starts_pending() {
        let payment = make_payment();
        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert_eq!(payment.version(), 1);
        assert!(payment.completed_at().is_none());
    }

    #[test]
    fn mark_success_sets_completed_at() {
        let mut payment = make_payment();
        payment.mark_success().unwrap();
        assert_eq!(payment.status(), PaymentStatus::Success);
        assert!(payment.completed_at().is_some());
        assert_eq!(payment.version(), 2);
    }

    #[test]
    fn mark_success_is_idempotent() {
        let mut payment = make_payment();
        payment.mark_success().unwrap();
        payment.mark_success().unwrap();
        assert_eq!(payment.version(), 2);
    }

    #[test]
    fn mark_success_illegal_after_failed() {
        let mut payment = make_payment();
        payment.mark_failed().unwrap();
        assert!(payment.mark_success().is_err());
        assert_eq!(payment.status(), PaymentStatus::Failed);
    }

    #[test]
    fn mark_failed_illegal_after_success() {
        let mut payment = make_payment();
        payment.mark_success().unwrap();
        assert!(payment.mark_failed().is_err());
    }

    #[test]
    fn mark_failed_is_idempotent() {
        let mut payment = make_payment();
        payment.mark_failed().unwrap();
        payment.mark_failed().unwrap();
        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert_eq!(payment.version(), 2);
    }
}
