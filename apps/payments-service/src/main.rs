//! Payments Service Binary
//!
//! Starts the payments service: the in-memory store, the payment-command
//! consumer, the inbox processor and the outbox relay, wired to the local
//! in-memory broker.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin payments-service
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log level (default: info)
//! - `PAYMENT_REQUESTS_QUEUE` / `PAYMENT_RESULTS_QUEUE`: queue names
//! - `INBOX_*` / `OUTBOX_*`: loop tuning, see [`payments_service::config`]

use std::sync::Arc;

use messaging::InMemoryBroker;
use payments_service::application::services::{
    InboxProcessor, OutboxRelay, PaymentCommandConsumer,
};
use payments_service::application::use_cases::ProcessPaymentUseCase;
use payments_service::config::Config;
use payments_service::infrastructure::persistence::InMemoryPaymentsStore;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("starting payments service");

    let config = Config::from_env();
    let store = Arc::new(InMemoryPaymentsStore::new());
    let broker = Arc::new(InMemoryBroker::new());
    let cancel = CancellationToken::new();

    let consumer = PaymentCommandConsumer::new(
        Arc::clone(&store),
        Arc::clone(&broker),
        config.payment_requests_queue.clone(),
    );
    consumer
        .start()
        .await
        .map_err(|err| anyhow::anyhow!("failed to subscribe: {err}"))?;

    let process_payment = Arc::new(ProcessPaymentUseCase::new(
        Arc::clone(&store),
        config.payment_results_queue.clone(),
    ));
    let processor = InboxProcessor::new(
        process_payment,
        Arc::clone(&store),
        config.inbox.clone(),
        cancel.clone(),
    );
    let processor_handle = tokio::spawn(processor.run());

    let relay = OutboxRelay::new(
        Arc::clone(&store),
        Arc::clone(&broker),
        config.outbox.clone(),
        cancel.clone(),
    );
    let relay_handle = tokio::spawn(relay.run());

    tracing::info!("payments service started, press ctrl-c to stop");
    signal::ctrl_c().await?;
    tracing::info!("shutting down");

    cancel.cancel();
    processor_handle.await?;
    relay_handle.await?;
    broker.shutdown();

    tracing::info!("payments service stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
