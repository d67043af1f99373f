//! Unit-of-work port: the local transaction boundary of every use case.

use async_trait::async_trait;

use super::inbox::InboxMessage;
use super::outbox::OutboxMessage;
use super::StorageError;
use crate::domain::shared::{OrderId, PaymentId, UserId};
use crate::domain::{Account, Payment, Withdrawal};

/// Factory for local transactions.
#[async_trait]
pub trait PaymentsUnitOfWork: Send + Sync {
    /// Concrete transaction type of the adapter.
    type Tx: PaymentsTx;

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot open a transaction.
    async fn begin(&self) -> Result<Self::Tx, StorageError>;
}

/// One local transaction over the payments store.
///
/// Every write staged through this handle commits atomically in
/// [`PaymentsTx::commit`] or not at all; dropping the handle without
/// committing rolls everything back.
#[async_trait]
pub trait PaymentsTx: Send {
    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if the user already has one.
    async fn insert_account(&mut self, account: &Account) -> Result<(), StorageError>;

    /// Load an account. Its `version()` is the value to pass back to
    /// [`PaymentsTx::try_update_account`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_account(&mut self, user_id: UserId) -> Result<Option<Account>, StorageError>;

    /// Compare-and-swap update of an account; `false` when the stored
    /// version no longer equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn try_update_account(
        &mut self,
        account: &Account,
        expected_version: u64,
    ) -> Result<bool, StorageError>;

    /// Insert a new payment. The order id is unique: one payment per
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if the order already has a
    /// payment.
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StorageError>;

    /// Load the payment for an order, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_payment_by_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, StorageError>;

    /// Compare-and-swap update of a payment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn try_update_payment(
        &mut self,
        payment: &Payment,
        expected_version: u64,
    ) -> Result<bool, StorageError>;

    /// Load the withdrawal recorded for a payment, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_withdrawal_by_payment(
        &mut self,
        payment_id: PaymentId,
    ) -> Result<Option<Withdrawal>, StorageError>;

    /// Insert a withdrawal record. The payment id is unique: at most one
    /// debit attempt is ever recorded per payment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if one exists.
    async fn insert_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StorageError>;

    /// Append an outbox message.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn add_outbox(&mut self, message: OutboxMessage) -> Result<(), StorageError>;

    /// Find an outbox message by correlation id, used to avoid re-emitting
    /// a result that was already written for the same command.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn find_outbox_by_correlation(
        &mut self,
        correlation_id: &str,
    ) -> Result<Option<OutboxMessage>, StorageError>;

    /// Whether an inbox row with this id exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn inbox_contains(&mut self, message_id: &str) -> Result<bool, StorageError>;

    /// Insert an inbox row.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if the id exists.
    async fn insert_inbox(&mut self, message: InboxMessage) -> Result<(), StorageError>;

    /// Commit all staged writes atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the commit fails; nothing is applied.
    async fn commit(self) -> Result<(), StorageError>;

    /// Discard all staged writes. Dropping the handle has the same effect.
    async fn rollback(self);
}
