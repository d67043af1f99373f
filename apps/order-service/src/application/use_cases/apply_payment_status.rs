//! Apply Payment Status use case.
//!
//! Applies the final payment result to the order. Safe under redelivery:
//! the idempotency-ledger check and insert happen in the same transaction
//! as the order mutation, so "already processed" and "apply the
//! transition" can never both succeed for one key.

use std::sync::Arc;

use crate::application::dto::PaymentStatusUpdate;
use crate::application::ports::{OrderTx, OrderUnitOfWork};
use crate::domain::order::{OrderError, OrderStatus};
use crate::error::OrderServiceError;

/// What applying a payment status did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The order transitioned to its terminal state.
    Applied,
    /// This exact message was applied before; nothing changed.
    AlreadyApplied,
    /// A different message already put the order in the same terminal
    /// state; nothing changed.
    AlreadyInState,
}

/// Applies a `PaymentProcessed` result to the order it belongs to.
pub struct ApplyPaymentStatusUseCase<U: OrderUnitOfWork> {
    uow: Arc<U>,
}

impl<U: OrderUnitOfWork> ApplyPaymentStatusUseCase<U> {
    /// Create the use case.
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// - [`OrderServiceError::NotFound`] for an unknown order.
    /// - [`OrderServiceError::UserMismatch`] when the result names a
    ///   different user than the order.
    /// - [`OrderServiceError::Domain`] when the result contradicts the
    ///   opposite terminal state (not retriable; redelivery cannot fix it).
    /// - [`OrderServiceError::Conflict`] when a concurrent writer changed
    ///   the order; retrying with a fresh read is expected to succeed.
    pub async fn execute(
        &self,
        update: PaymentStatusUpdate,
    ) -> Result<ApplyOutcome, OrderServiceError> {
        if update.message_id.trim().is_empty() {
            return Err(OrderServiceError::Domain(OrderError::InvalidValue {
                field: "message_id",
                message: "idempotency key cannot be empty".to_string(),
            }));
        }

        let mut tx = self.uow.begin().await?;

        if tx.was_processed(&update.message_id).await? {
            tracing::info!(
                message_id = %update.message_id,
                order_id = %update.order_id,
                "payment result already processed"
            );
            tx.rollback().await;
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let Some((mut order, loaded_version)) = tx.get_order_with_version(update.order_id).await?
        else {
            return Err(OrderServiceError::NotFound(update.order_id));
        };

        if order.user_id() != update.user_id {
            return Err(OrderServiceError::UserMismatch {
                order_id: update.order_id,
                user_id: update.user_id,
            });
        }

        let target = if update.success {
            OrderStatus::Finished
        } else {
            OrderStatus::Cancelled
        };

        if order.status() == target {
            // A different delivery already landed this outcome.
            tracing::info!(order_id = %order.id(), status = %target, "order already in target state");
            tx.rollback().await;
            return Ok(ApplyOutcome::AlreadyInState);
        }

        if update.success {
            order.mark_finished()?;
        } else {
            order.mark_cancelled()?;
        }

        if !tx.try_update_order(&order, loaded_version).await? {
            tracing::warn!(order_id = %order.id(), "concurrent update detected");
            return Err(OrderServiceError::Conflict(update.order_id));
        }

        let details = format!("order {} -> {}", order.id(), order.status());
        tx.mark_processed(&update.message_id, &details).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id(),
            status = %order.status(),
            message_id = %update.message_id,
            "payment status applied"
        );
        Ok(ApplyOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::dto::CreateOrderRequest;
    use crate::application::ports::OrderQueries;
    use crate::application::use_cases::CreateOrderUseCase;
    use crate::domain::shared::{OrderId, UserId};
    use crate::infrastructure::persistence::InMemoryOrderStore;

    async fn seeded_store() -> (Arc<InMemoryOrderStore>, OrderId, UserId) {
        let store = Arc::new(InMemoryOrderStore::new());
        let user_id = UserId::generate();
        let create = CreateOrderUseCase::new(Arc::clone(&store), "payment-requests");
        let dto = create
            .execute(CreateOrderRequest {
                user_id,
                amount: dec!(100.00),
                currency: "RUB".to_string(),
                description: "two books".to_string(),
            })
            .await
            .unwrap();
        (store, dto.id, user_id)
    }

    fn update(order_id: OrderId, user_id: UserId, success: bool) -> PaymentStatusUpdate {
        PaymentStatusUpdate {
            message_id: "result-1".to_string(),
            order_id,
            user_id,
            success,
            reason: None,
        }
    }

    #[tokio::test]
    async fn success_finishes_order() {
        let (store, order_id, user_id) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(Arc::clone(&store));

        let outcome = use_case.execute(update(order_id, user_id, true)).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Finished);
        assert_eq!(order.version(), 2);
    }

    #[tokio::test]
    async fn failure_cancels_order() {
        let (store, order_id, user_id) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(Arc::clone(&store));

        let outcome = use_case
            .execute(update(order_id, user_id, false))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn second_delivery_of_same_message_is_noop() {
        let (store, order_id, user_id) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(Arc::clone(&store));

        let first = use_case.execute(update(order_id, user_id, true)).await.unwrap();
        assert_eq!(first, ApplyOutcome::Applied);

        let second = use_case.execute(update(order_id, user_id, true)).await.unwrap();
        assert_eq!(second, ApplyOutcome::AlreadyApplied);

        let order = store.get_order(order_id).await.unwrap().unwrap();
        // Applied exactly once: one transition, one version bump.
        assert_eq!(order.version(), 2);
    }

    #[tokio::test]
    async fn different_message_same_outcome_is_silent_noop() {
        let (store, order_id, user_id) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(Arc::clone(&store));

        use_case.execute(update(order_id, user_id, true)).await.unwrap();

        let mut other = update(order_id, user_id, true);
        other.message_id = "result-2".to_string();
        let outcome = use_case.execute(other).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::AlreadyInState);
    }

    #[tokio::test]
    async fn opposite_terminal_state_is_hard_error() {
        let (store, order_id, user_id) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(Arc::clone(&store));

        use_case.execute(update(order_id, user_id, true)).await.unwrap();

        let mut contradiction = update(order_id, user_id, false);
        contradiction.message_id = "result-2".to_string();
        let err = use_case.execute(contradiction).await.unwrap_err();
        assert!(matches!(err, OrderServiceError::Domain(_)));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (store, _, user_id) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(store);

        let err = use_case
            .execute(update(OrderId::generate(), user_id, true))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn user_mismatch_is_rejected() {
        let (store, order_id, _) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(store);

        let err = use_case
            .execute(update(order_id, UserId::generate(), true))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::UserMismatch { .. }));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn empty_message_id_is_rejected() {
        let (store, order_id, user_id) = seeded_store().await;
        let use_case = ApplyPaymentStatusUseCase::new(store);

        let mut bad = update(order_id, user_id, true);
        bad.message_id = "  ".to_string();
        assert!(use_case.execute(bad).await.is_err());
    }
}
