//! Read-only query port for the request-handling path.

use async_trait::async_trait;

use super::StorageError;
use crate::domain::order::Order;
use crate::domain::shared::{OrderId, UserId};

/// Queries that do not need a transaction.
#[async_trait]
pub trait OrderQueries: Send + Sync {
    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StorageError>;

    /// List orders, optionally restricted to one user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StorageError>;
}
