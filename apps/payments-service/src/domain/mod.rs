//! Domain layer for the payments service.

mod account;
mod payment;
pub mod shared;
mod withdrawal;

pub use account::{Account, AccountError};
pub use payment::{Payment, PaymentError, PaymentStatus};
pub use withdrawal::Withdrawal;
