//! Long-running background services: the outbox relay and the broker
//! consumer. Both observe a shared cancellation token and finish in-flight
//! work before exiting.

mod outbox_relay;
mod payment_result_consumer;

pub use outbox_relay::{OutboxRelay, OutboxRelayConfig};
pub use payment_result_consumer::PaymentResultConsumer;
