//! End-to-end saga tests: both services wired over one in-memory broker.
//!
//! No shared transaction exists anywhere in this flow; agreement is
//! reached purely through the outbox relays, the inbox, and the
//! idempotency guards on both sides.

use std::sync::Arc;
use std::time::Duration;

use messaging::{InMemoryBroker, MessagePublisher};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use order_service::application::dto::CreateOrderRequest;
use order_service::application::ports::{OrderQueries, OutboxStore};
use order_service::application::services as order_services;
use order_service::application::use_cases::{ApplyPaymentStatusUseCase, CreateOrderUseCase};
use order_service::domain::order::OrderStatus;
use order_service::infrastructure::persistence::InMemoryOrderStore;

use payments_service::application::ports::{
    AccountQueries, PaymentsTx, PaymentsUnitOfWork,
};
use payments_service::application::services as payment_services;
use payments_service::application::use_cases::ProcessPaymentUseCase;
use payments_service::domain::shared::Money;
use payments_service::domain::{Account, PaymentStatus};
use payments_service::infrastructure::persistence::InMemoryPaymentsStore;

const REQUESTS: &str = "payment-requests";
const RESULTS: &str = "payment-results";

struct Saga {
    broker: Arc<InMemoryBroker>,
    order_store: Arc<InMemoryOrderStore>,
    payments_store: Arc<InMemoryPaymentsStore>,
    create_order: CreateOrderUseCase<InMemoryOrderStore>,
    order_relay: order_services::OutboxRelay<InMemoryOrderStore, InMemoryBroker>,
    payments_processor:
        payment_services::InboxProcessor<InMemoryPaymentsStore, InMemoryPaymentsStore>,
    payments_relay: payment_services::OutboxRelay<InMemoryPaymentsStore, InMemoryBroker>,
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if condition().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wire both services to one broker and open an account with `balance`.
async fn setup(balance: Decimal, user: uuid::Uuid) -> Saga {
    let broker = Arc::new(InMemoryBroker::new());
    let cancel = CancellationToken::new();

    // Order side.
    let order_store = Arc::new(InMemoryOrderStore::new());
    let create_order = CreateOrderUseCase::new(Arc::clone(&order_store), REQUESTS);
    let order_relay = order_services::OutboxRelay::new(
        Arc::clone(&order_store),
        Arc::clone(&broker),
        order_services::OutboxRelayConfig::default(),
        cancel.clone(),
    );
    let result_consumer = order_services::PaymentResultConsumer::new(
        Arc::new(ApplyPaymentStatusUseCase::new(Arc::clone(&order_store))),
        Arc::clone(&broker),
        RESULTS,
    );
    result_consumer.start().await.unwrap();

    // Payments side.
    let payments_store = Arc::new(InMemoryPaymentsStore::new());
    let user_id = payments_service::domain::shared::UserId::new(user);
    let mut account = Account::create(user_id, "RUB").unwrap();
    if balance > Decimal::ZERO {
        account.top_up(&Money::new(balance, "RUB").unwrap()).unwrap();
    }
    let mut tx = payments_store.begin().await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.commit().await.unwrap();

    let command_consumer = payment_services::PaymentCommandConsumer::new(
        Arc::clone(&payments_store),
        Arc::clone(&broker),
        REQUESTS,
    );
    command_consumer.start().await.unwrap();

    let payments_processor = payment_services::InboxProcessor::new(
        Arc::new(ProcessPaymentUseCase::new(
            Arc::clone(&payments_store),
            RESULTS,
        )),
        Arc::clone(&payments_store),
        payment_services::InboxProcessorConfig::default(),
        cancel.clone(),
    );
    let payments_relay = payment_services::OutboxRelay::new(
        Arc::clone(&payments_store),
        Arc::clone(&broker),
        payment_services::OutboxRelayConfig::default(),
        cancel,
    );

    Saga {
        broker,
        order_store,
        payments_store,
        create_order,
        order_relay,
        payments_processor,
        payments_relay,
    }
}

/// Drive one full saga round: relay the command, process it, relay the
/// result, and wait for the order to reach a terminal state.
async fn drive_round(saga: &Saga, order_id: order_service::domain::shared::OrderId) {
    saga.order_relay.run_once().await.unwrap();

    let payments_store = Arc::clone(&saga.payments_store);
    wait_until(move || {
        let store = Arc::clone(&payments_store);
        async move { store.inbox_count().await >= 1 }
    })
    .await;

    saga.payments_processor.run_once().await.unwrap();
    saga.payments_relay.run_once().await.unwrap();

    let order_store = Arc::clone(&saga.order_store);
    wait_until(move || {
        let store = Arc::clone(&order_store);
        async move {
            store
                .get_order(order_id)
                .await
                .unwrap()
                .is_some_and(|order| order.status().is_terminal())
        }
    })
    .await;
}

#[tokio::test]
async fn sufficient_funds_finish_the_order() {
    let user = uuid::Uuid::new_v4();
    let saga = setup(dec!(150.00), user).await;

    let dto = saga
        .create_order
        .execute(CreateOrderRequest {
            user_id: order_service::domain::shared::UserId::new(user),
            amount: dec!(100.00),
            currency: "RUB".to_string(),
            description: "two books".to_string(),
        })
        .await
        .unwrap();

    drive_round(&saga, dto.id).await;

    // Order side: finished.
    let order = saga.order_store.get_order(dto.id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Finished);

    // Payments side: balance 150 - 100, payment Success, withdrawal
    // recorded successful.
    let payments_user = payments_service::domain::shared::UserId::new(user);
    let account = saga
        .payments_store
        .get_account(payments_user)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance().amount(), dec!(50.00));

    let order_ref = payments_service::domain::shared::OrderId::new(dto.id.as_uuid());
    let mut tx = saga.payments_store.begin().await.unwrap();
    let payment = tx.get_payment_by_order(order_ref).await.unwrap().unwrap();
    assert_eq!(payment.status(), PaymentStatus::Success);
    let withdrawal = tx
        .get_withdrawal_by_payment(payment.id())
        .await
        .unwrap()
        .unwrap();
    assert!(withdrawal.success());
    tx.rollback().await;
}

#[tokio::test]
async fn insufficient_funds_cancel_the_order() {
    let user = uuid::Uuid::new_v4();
    let saga = setup(dec!(10.00), user).await;

    let dto = saga
        .create_order
        .execute(CreateOrderRequest {
            user_id: order_service::domain::shared::UserId::new(user),
            amount: dec!(100.00),
            currency: "RUB".to_string(),
            description: "two books".to_string(),
        })
        .await
        .unwrap();

    drive_round(&saga, dto.id).await;

    let order = saga.order_store.get_order(dto.id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Cancelled);

    // Balance untouched, payment Failed, withdrawal recorded failed.
    let payments_user = payments_service::domain::shared::UserId::new(user);
    let account = saga
        .payments_store
        .get_account(payments_user)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance().amount(), dec!(10.00));

    let order_ref = payments_service::domain::shared::OrderId::new(dto.id.as_uuid());
    let mut tx = saga.payments_store.begin().await.unwrap();
    let payment = tx.get_payment_by_order(order_ref).await.unwrap().unwrap();
    assert_eq!(payment.status(), PaymentStatus::Failed);
    let withdrawal = tx
        .get_withdrawal_by_payment(payment.id())
        .await
        .unwrap()
        .unwrap();
    assert!(!withdrawal.success());
    tx.rollback().await;
}

#[tokio::test]
async fn double_published_command_still_debits_once() {
    let user = uuid::Uuid::new_v4();
    let saga = setup(dec!(150.00), user).await;

    let dto = saga
        .create_order
        .execute(CreateOrderRequest {
            user_id: order_service::domain::shared::UserId::new(user),
            amount: dec!(100.00),
            currency: "RUB".to_string(),
            description: "two books".to_string(),
        })
        .await
        .unwrap();

    // Simulate the relay crashing after publish but before mark-sent: the
    // cycle publishes once, and we re-publish the same outbox row by hand.
    // The command id is stable across retries, so the payments inbox
    // deduplicates the second copy.
    let rows = saga.order_store.get_unsent_batch(10).await.unwrap();
    let row = rows[0].clone();
    saga.order_relay.run_once().await.unwrap();
    saga.broker
        .publish(
            messaging::MessageEnvelope::new(&row.message_id, &row.message_type, row.body.clone()),
            REQUESTS,
        )
        .await
        .unwrap();

    drive_round(&saga, dto.id).await;

    let payments_user = payments_service::domain::shared::UserId::new(user);
    let account = saga
        .payments_store
        .get_account(payments_user)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance().amount(), dec!(50.00));
    assert_eq!(saga.payments_store.inbox_count().await, 1);
}
