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

//! Order Service
//!
//! Owns the Order aggregate and the order-facing half of the payment saga.
//! There is no shared transaction with the payments service; agreement is
//! reached through the transactional outbox on the way out and an
//! idempotency ledger on the way back in.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! - **Domain**: `Order` aggregate with its status state machine, the
//!   `Money` and `OrderDescription` value objects, typed ids.
//! - **Application**: ports (`OrderUnitOfWork`, `OutboxStore`,
//!   `OrderQueries`), use cases (`CreateOrder`, `ApplyPaymentStatus`,
//!   `GetOrder`, `ListOrders`), background services (outbox relay,
//!   payment-result consumer).
//! - **Infrastructure**: the in-memory storage adapter implementing every
//!   port over one transactional state.
//!
//! # Guarantees
//!
//! - An order row and its `PaymentRequested` outbox row commit atomically
//!   or not at all.
//! - A payment result applied twice changes the order exactly once; the
//!   second application is a no-op recorded by the idempotency ledger.
//! - Concurrent writers are detected by compare-and-swap version updates
//!   and surfaced as typed conflicts, never silent overwrites.

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

pub use error::OrderServiceError;
