//! Get Balance use case.

use std::sync::Arc;

use crate::application::dto::AccountDto;
use crate::application::ports::AccountQueries;
use crate::domain::shared::UserId;
use crate::error::PaymentsServiceError;

/// Fetches a user's balance.
pub struct GetBalanceUseCase<Q: AccountQueries> {
    queries: Arc<Q>,
}

impl<Q: AccountQueries> GetBalanceUseCase<Q> {
    /// Create the use case.
    pub fn new(queries: Arc<Q>) -> Self {
        Self { queries }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentsServiceError::AccountNotFound`] for an unknown
    /// user.
    pub async fn execute(&self, user_id: UserId) -> Result<AccountDto, PaymentsServiceError> {
        let account = self
            .queries
            .get_account(user_id)
            .await?
            .ok_or(PaymentsServiceError::AccountNotFound(user_id))?;
        Ok(AccountDto::from_account(&account))
    }
}
