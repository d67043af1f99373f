//! Unit-of-work port: the local transaction boundary of every use case.

use async_trait::async_trait;

use super::outbox::OutboxMessage;
use super::StorageError;
use crate::domain::order::Order;
use crate::domain::shared::OrderId;

/// Factory for local transactions.
#[async_trait]
pub trait OrderUnitOfWork: Send + Sync {
    /// Concrete transaction type of the adapter.
    type Tx: OrderTx;

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot open a transaction.
    async fn begin(&self) -> Result<Self::Tx, StorageError>;
}

/// One local transaction over the order store.
///
/// Every write staged through this handle commits atomically in
/// [`OrderTx::commit`] or not at all; dropping the handle without
/// committing rolls everything back.
#[async_trait]
pub trait OrderTx: Send {
    /// Insert a freshly created order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if the id is taken.
    async fn insert_order(&mut self, order: &Order) -> Result<(), StorageError>;

    /// Load an order together with the version the caller must pass back
    /// to [`OrderTx::try_update_order`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_order_with_version(
        &mut self,
        id: OrderId,
    ) -> Result<Option<(Order, u64)>, StorageError>;

    /// Compare-and-swap update: persist `order` only if the stored version
    /// still equals `expected_version`.
    ///
    /// Returns `false` (never an error) when another writer got there
    /// first; the caller decides whether to retry the whole use case.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn try_update_order(
        &mut self,
        order: &Order,
        expected_version: u64,
    ) -> Result<bool, StorageError>;

    /// Append an outbox message.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn add_outbox(&mut self, message: OutboxMessage) -> Result<(), StorageError>;

    /// Check the idempotency ledger for a key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn was_processed(&mut self, idempotency_key: &str) -> Result<bool, StorageError>;

    /// Record a key in the idempotency ledger.
    ///
    /// Inserting a key that is already present fails the transaction: a
    /// concurrent duplicate can never apply the same transition twice.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if the key exists.
    async fn mark_processed(
        &mut self,
        idempotency_key: &str,
        details: &str,
    ) -> Result<(), StorageError>;

    /// Commit all staged writes atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the commit fails; nothing is applied.
    async fn commit(self) -> Result<(), StorageError>;

    /// Discard all staged writes. Dropping the handle has the same effect.
    async fn rollback(self);
}
