// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::default_trait_access
    )
)]

//! Payments Service
//!
//! Owns the money side of the saga: accounts, payments and withdrawals.
//! Commands arrive over an at-least-once broker; the inbox deduplicates
//! and serializes them, and the withdrawal record makes the debit itself
//! idempotent, so a command may be delivered or processed any number of
//! times while the account is debited at most once.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! - **Domain**: `Account`, `Payment`, `Withdrawal` aggregates, `Money`
//!   with currency-checked arithmetic, typed ids.
//! - **Application**: ports (`PaymentsUnitOfWork`, `InboxStore`,
//!   `OutboxStore`, `AccountQueries`), use cases (`ProcessPayment`,
//!   `CreateAccount`, `TopUp`, `GetBalance`), background services
//!   (payment-command consumer, inbox processor, outbox relay).
//! - **Infrastructure**: the in-memory storage adapter.
//!
//! # Guarantees
//!
//! - A redelivered command id results in exactly one inbox row and exactly
//!   one business execution.
//! - Insufficient funds is a recorded business outcome (Payment `Failed`,
//!   Withdrawal `success = false`), never an error path that retries.
//! - Account and Payment writes are compare-and-swap; stale writers lose
//!   and the inbox retries the whole step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - aggregates and value objects, no infrastructure deps.
pub mod domain;

/// Application layer - ports, DTOs, use cases and background services.
pub mod application;

/// Infrastructure layer - storage adapter.
pub mod infrastructure;

/// Service configuration.
pub mod config;

mod error;

pub use error::PaymentsServiceError;
