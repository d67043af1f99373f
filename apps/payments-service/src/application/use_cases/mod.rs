//! Use cases orchestrating aggregates, inbox/outbox and the withdrawal
//! idempotency guard.

mod create_account;
mod get_balance;
mod process_payment;
mod top_up;

pub use create_account::CreateAccountUseCase;
pub use get_balance::GetBalanceUseCase;
pub use process_payment::{PaymentCommand, PaymentOutcome, ProcessPaymentUseCase};
pub use top_up::TopUpUseCase;
