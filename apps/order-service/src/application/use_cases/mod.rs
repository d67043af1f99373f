//! Use cases orchestrating aggregates, outbox and the idempotency ledger.

mod apply_payment_status;
mod create_order;
mod get_order;
mod list_orders;

pub use apply_payment_status::{ApplyOutcome, ApplyPaymentStatusUseCase};
pub use create_order::CreateOrderUseCase;
pub use get_order::GetOrderUseCase;
pub use list_orders::ListOrdersUseCase;
