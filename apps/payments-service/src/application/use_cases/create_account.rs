//! Create Account use case.

use std::sync::Arc;

use crate::application::dto::{AccountDto, CreateAccountRequest};
use crate::application::ports::{PaymentsTx, PaymentsUnitOfWork};
use crate::domain::Account;
use crate::error::PaymentsServiceError;

/// Opens a zero-balance account for a user.
pub struct CreateAccountUseCase<U: PaymentsUnitOfWork> {
    uow: Arc<U>,
}

impl<U: PaymentsUnitOfWork> CreateAccountUseCase<U> {
    /// Create the use case.
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentsServiceError::AccountAlreadyExists`] when the
    /// user already has an account.
    pub async fn execute(
        &self,
        request: CreateAccountRequest,
    ) -> Result<AccountDto, PaymentsServiceError> {
        let account = Account::create(request.user_id, &request.currency)?;

        let mut tx = self.uow.begin().await?;
        if tx.get_account(request.user_id).await?.is_some() {
            return Err(PaymentsServiceError::AccountAlreadyExists(request.user_id));
        }
        tx.insert_account(&account).await?;
        tx.commit().await?;

        tracing::info!(user_id = %request.user_id, "account created");
        Ok(AccountDto::from_account(&account))
    }
}
