//! Long-running background services: the payment-command consumer, the
//! inbox processor and the outbox relay. All observe a shared cancellation
//! token and finish in-flight work before exiting.

mod inbox_processor;
mod outbox_relay;
mod payment_command_consumer;

pub use inbox_processor::{InboxProcessor, InboxProcessorConfig};
pub use outbox_relay::{OutboxRelay, OutboxRelayConfig};
pub use payment_command_consumer::PaymentCommandConsumer;
