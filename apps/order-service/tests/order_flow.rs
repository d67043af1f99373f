//! Order-side integration tests: create-order publish path and idempotent
//! result application through the consumer.

use std::sync::Arc;
use std::time::Duration;

use messaging::{InMemoryBroker, MessageConsumer, MessageEnvelope, MessageHandler, MessagePublisher};
use order_service::application::dto::CreateOrderRequest;
use order_service::application::messages::{PaymentRequested, PaymentResult, PAYMENT_PROCESSED};
use order_service::application::ports::OrderQueries;
use order_service::application::services::{
    OutboxRelay, OutboxRelayConfig, PaymentResultConsumer,
};
use order_service::application::use_cases::{ApplyPaymentStatusUseCase, CreateOrderUseCase};
use order_service::domain::order::OrderStatus;
use order_service::domain::shared::{OrderId, UserId};
use order_service::infrastructure::persistence::InMemoryOrderStore;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const REQUESTS: &str = "payment-requests";
const RESULTS: &str = "payment-results";

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

fn capturing_handler(tx: mpsc::UnboundedSender<MessageEnvelope>) -> MessageHandler {
    Arc::new(move |envelope| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(envelope);
        })
    })
}

#[tokio::test]
async fn create_order_then_relay_publishes_exactly_one_command() {
    let store = Arc::new(InMemoryOrderStore::new());
    let broker = Arc::new(InMemoryBroker::new());
    let user_id = UserId::generate();

    let create = CreateOrderUseCase::new(Arc::clone(&store), REQUESTS);
    let dto = create
        .execute(CreateOrderRequest {
            user_id,
            amount: dec!(100.00),
            currency: "RUB".to_string(),
            description: "two books".to_string(),
        })
        .await
        .unwrap();

    let relay = OutboxRelay::new(
        Arc::clone(&store),
        Arc::clone(&broker),
        OutboxRelayConfig::default(),
        CancellationToken::new(),
    );
    relay.run_once().await.unwrap();
    // A second cycle must not publish again.
    relay.run_once().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    broker
        .subscribe(REQUESTS, capturing_handler(tx))
        .await
        .unwrap();

    let delivered = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    broker.ack(&delivered).await.unwrap();

    let payload: PaymentRequested = serde_json::from_str(&delivered.body).unwrap();
    assert_eq!(payload.order_id, dto.id);
    assert_eq!(payload.user_id, user_id);
    assert_eq!(payload.amount, dec!(100.00));
    assert_eq!(payload.currency, "RUB");

    // Nothing else was published.
    assert!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn duplicate_result_deliveries_apply_once() {
    let store = Arc::new(InMemoryOrderStore::new());
    let broker = Arc::new(InMemoryBroker::new());
    let user_id = UserId::generate();

    let create = CreateOrderUseCase::new(Arc::clone(&store), REQUESTS);
    let dto = create
        .execute(CreateOrderRequest {
            user_id,
            amount: dec!(100.00),
            currency: "RUB".to_string(),
            description: "two books".to_string(),
        })
        .await
        .unwrap();
    let order_id = dto.id;

    let consumer = PaymentResultConsumer::new(
        Arc::new(ApplyPaymentStatusUseCase::new(Arc::clone(&store))),
        Arc::clone(&broker),
        RESULTS,
    );
    consumer.start().await.unwrap();

    let body = serde_json::to_string(&PaymentResult {
        message_id: "result-1".to_string(),
        order_id,
        user_id,
        success: true,
        reason: None,
    })
    .unwrap();
    let envelope = MessageEnvelope::new("result-1", PAYMENT_PROCESSED, body);

    // The broker delivers the same result twice.
    broker.publish(envelope.clone(), RESULTS).await.unwrap();
    broker.publish(envelope, RESULTS).await.unwrap();

    wait_until(|| {
        let broker = Arc::clone(&broker);
        async move {
            broker.queue_depth(RESULTS).await == 0 && broker.in_flight_len(RESULTS).await == 0
        }
    })
    .await;

    let order = store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Finished);
    // Applied exactly once: a single version bump past creation.
    assert_eq!(order.version(), 2);
    assert_eq!(store.processed_count().await, 1);
}

#[tokio::test]
async fn result_for_unknown_order_is_dropped() {
    let store = Arc::new(InMemoryOrderStore::new());
    let broker = Arc::new(InMemoryBroker::new());

    let consumer = PaymentResultConsumer::new(
        Arc::new(ApplyPaymentStatusUseCase::new(Arc::clone(&store))),
        Arc::clone(&broker),
        RESULTS,
    );
    consumer.start().await.unwrap();

    let body = serde_json::to_string(&PaymentResult {
        message_id: "result-x".to_string(),
        order_id: OrderId::generate(),
        user_id: UserId::generate(),
        success: true,
        reason: None,
    })
    .unwrap();
    broker
        .publish(MessageEnvelope::new("result-x", PAYMENT_PROCESSED, body), RESULTS)
        .await
        .unwrap();

    wait_until(|| {
        let broker = Arc::clone(&broker);
        async move { !broker.dropped(RESULTS).await.is_empty() }
    })
    .await;
    assert_eq!(store.processed_count().await, 0);
}
