//! Value objects shared across the payments domain.

mod ids;
mod money;

pub use ids::{OrderId, PaymentId, UserId, WithdrawalId};
pub use money::{Money, MoneyError};
