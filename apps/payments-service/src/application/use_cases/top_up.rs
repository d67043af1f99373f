//! Top Up use case.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::dto::{AccountDto, TopUpRequest};
use crate::application::ports::{PaymentsTx, PaymentsUnitOfWork};
use crate::domain::shared::Money;
use crate::error::PaymentsServiceError;

/// Adds money to an account through a compare-and-swap update.
pub struct TopUpUseCase<U: PaymentsUnitOfWork> {
    uow: Arc<U>,
}

impl<U: PaymentsUnitOfWork> TopUpUseCase<U> {
    /// Create the use case.
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// - [`PaymentsServiceError::Validation`] for a non-positive amount.
    /// - [`PaymentsServiceError::AccountNotFound`] for an unknown user.
    /// - [`PaymentsServiceError::Conflict`] when a concurrent writer got
    ///   there first; callers may retry with a fresh read.
    pub async fn execute(&self, request: TopUpRequest) -> Result<AccountDto, PaymentsServiceError> {
        if request.amount <= Decimal::ZERO {
            return Err(PaymentsServiceError::Validation {
                field: "amount",
                message: "top-up amount must be positive".to_string(),
            });
        }
        let amount = Money::new(request.amount, &request.currency)?;

        let mut tx = self.uow.begin().await?;
        let mut account = tx
            .get_account(request.user_id)
            .await?
            .ok_or(PaymentsServiceError::AccountNotFound(request.user_id))?;
        let expected_version = account.version();

        account.top_up(&amount)?;

        if !tx.try_update_account(&account, expected_version).await? {
            return Err(PaymentsServiceError::Conflict {
                entity: "account",
                key: request.user_id.to_string(),
            });
        }
        tx.commit().await?;

        tracing::info!(
            user_id = %request.user_id,
            balance = %account.balance(),
            "account topped up"
        );
        Ok(AccountDto::from_account(&account))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::dto::CreateAccountRequest;
    use crate::application::use_cases::CreateAccountUseCase;
    use crate::domain::shared::UserId;
    use crate::infrastructure::persistence::InMemoryPaymentsStore;

    async fn store_with_account() -> (Arc<InMemoryPaymentsStore>, UserId) {
        let store = Arc::new(InMemoryPaymentsStore::new());
        let user_id = UserId::generate();
        CreateAccountUseCase::new(Arc::clone(&store))
            .execute(CreateAccountRequest {
                user_id,
                currency: "RUB".to_string(),
            })
            .await
            .unwrap();
        (store, user_id)
    }

    #[tokio::test]
    async fn top_up_adds_to_balance() {
        let (store, user_id) = store_with_account().await;
        let use_case = TopUpUseCase::new(store);

        let dto = use_case
            .execute(TopUpRequest {
                user_id,
                amount: dec!(150.00),
                currency: "RUB".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(dto.balance, dec!(150.00));
        assert_eq!(dto.version, 2);
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let (store, user_id) = store_with_account().await;
        let use_case = TopUpUseCase::new(store);

        let err = use_case
            .execute(TopUpRequest {
                user_id,
                amount: dec!(0),
                currency: "RUB".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentsServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn currency_mismatch_is_rejected() {
        let (store, user_id) = store_with_account().await;
        let use_case = TopUpUseCase::new(store);

        let err = use_case
            .execute(TopUpRequest {
                user_id,
                amount: dec!(10),
                currency: "USD".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentsServiceError::Account(_)));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (store, _) = store_with_account().await;
        let use_case = TopUpUseCase::new(store);

        let err = use_case
            .execute(TopUpRequest {
                user_id: UserId::generate(),
                amount: dec!(10),
                currency: "RUB".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentsServiceError::AccountNotFound(_)));
    }
}
