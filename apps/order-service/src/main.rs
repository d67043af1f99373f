//! Order Service Binary
//!
//! Starts the order service: the in-memory store, the outbox relay and the
//! payment-result consumer, wired to the local in-memory broker.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-service
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log level (default: info)
//! - `PAYMENT_REQUESTS_QUEUE` / `PAYMENT_RESULTS_QUEUE`: queue names
//! - `OUTBOX_POLL_INTERVAL_MS` / `OUTBOX_BATCH_SIZE` /
//!   `OUTBOX_ERROR_BACKOFF_MS`: relay tuning

use std::sync::Arc;

use messaging::InMemoryBroker;
use order_service::application::services::{OutboxRelay, PaymentResultConsumer};
use order_service::application::use_cases::ApplyPaymentStatusUseCase;
use order_service::config::Config;
use order_service::infrastructure::persistence::InMemoryOrderStore;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("starting order service");

    let config = Config::from_env();
    let store = Arc::new(InMemoryOrderStore::new());
    let broker = Arc::new(InMemoryBroker::new());
    let cancel = CancellationToken::new();

    let apply_status = Arc::new(ApplyPaymentStatusUseCase::new(Arc::clone(&store)));
    let consumer = PaymentResultConsumer::new(
        apply_status,
        Arc::clone(&broker),
        config.payment_results_queue.clone(),
    );
    consumer
        .start()
        .await
        .map_err(|err| anyhow::anyhow!("failed to subscribe: {err}"))?;

    let relay = OutboxRelay::new(
        Arc::clone(&store),
        Arc::clone(&broker),
        config.outbox.clone(),
        cancel.clone(),
    );
    let relay_handle = tokio::spawn(relay.run());

    tracing::info!("order service started, press ctrl-c to stop");
    signal::ctrl_c().await?;
    tracing::info!("shutting down");

    cancel.cancel();
    relay_handle.await?;
    broker.shutdown();

    tracing::info!("order service stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
