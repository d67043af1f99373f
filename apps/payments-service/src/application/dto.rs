//! Data transfer objects at the use-case boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::UserId;
use crate::domain::Account;

/// Request to open an account.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    /// Owning user.
    pub user_id: UserId,
    /// Account currency.
    pub currency: String,
}

/// Request to add money to an account.
#[derive(Debug, Clone, Deserialize)]
pub struct TopUpRequest {
    /// Owning user.
    pub user_id: UserId,
    /// Amount to add.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
}

/// Account as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AccountDto {
    /// Owning user.
    pub user_id: UserId,
    /// Current balance.
    pub balance: Decimal,
    /// Account currency.
    pub currency: String,
    /// Version counter.
    pub version: u64,
}

impl AccountDto {
    /// Build a DTO from the aggregate.
    #[must_use]
    pub fn from_account(account: &Account) -> Self {
        Self {
            user_id: account.user_id(),
            balance: account.balance().amount(),
            currency: account.balance().currency().to_string(),
            version: account.version(),
        }
    }
}
