//! Withdrawal record.
//!
//! Written at most once per payment; its existence is the idempotency
//! guard for the ledger-affecting debit. A failed debit is recorded too,
//! so a retried payment reuses the recorded outcome instead of touching
//! the account again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Money, PaymentId, WithdrawalId};

/// Immutable record of a debit attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    id: WithdrawalId,
    payment_id: PaymentId,
    amount: Money,
    success: bool,
    created_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Record a debit attempt.
    #[must_use]
    pub fn record(payment_id: PaymentId, amount: Money, success: bool) -> Self {
        Self {
            id: WithdrawalId::generate(),
            payment_id,
            amount,
            success,
            created_at: Utc::now(),
        }
    }

    /// Reconstitute a withdrawal from stored state.
    #[must_use]
    pub const fn reconstitute(
        id: WithdrawalId,
        payment_id: PaymentId,
        amount: Money,
        success: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payment_id,
            amount,
            success,
            created_at,
        }
    }

    /// Get the withdrawal id.
    #[must_use]
    pub const fn id(&self) -> WithdrawalId {
        self.id
    }

    /// Get the payment this debit belongs to.
    #[must_use]
    pub const fn payment_id(&self) -> PaymentId {
        self.payment_id
    }

    /// Get the amount.
    #[must_use]
    pub const fn amount(&self) -> &Money {
        &self.amount
    }

    /// Whether the debit succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Get the record timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
