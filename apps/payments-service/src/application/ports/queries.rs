//! Read-only query port for the request-handling path.

use async_trait::async_trait;

use super::StorageError;
use crate::domain::shared::UserId;
use crate::domain::Account;

/// Queries that do not need a transaction.
#[async_trait]
pub trait AccountQueries: Send + Sync {
    /// Fetch one account.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_account(&self, user_id: UserId) -> Result<Option<Account>, StorageError>;
}
