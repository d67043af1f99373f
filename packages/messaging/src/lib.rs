//! Messaging contracts for the Settle services.
//!
//! Both services talk to the broker exclusively through the ports defined
//! here: [`MessagePublisher`] on the producing side and [`MessageConsumer`]
//! on the consuming side. The broker guarantees at-least-once delivery;
//! everything stronger (dedup, idempotent effects) is the responsibility of
//! the outbox/inbox layers inside each service.
//!
//! [`InMemoryBroker`] is the adapter used for local wiring and tests. A
//! production transport (AMQP, Kafka, ...) would implement the same two
//! ports.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod memory;
mod ports;

pub use envelope::MessageEnvelope;
pub use memory::InMemoryBroker;
pub use ports::{ConsumeError, MessageConsumer, MessageHandler, MessagePublisher, PublishError};
