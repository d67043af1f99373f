//! Account aggregate root.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{Money, MoneyError, UserId};

/// Errors raised by Account operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// Currency or amount problem.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Balance does not cover the requested debit.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Current balance.
        balance: Money,
        /// Amount that was requested.
        requested: Money,
    },
}

/// A user's money account. One per user; balance never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    user_id: UserId,
    balance: Money,
    version: u64,
}

impl Account {
    /// Open an account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidCurrency`] for a malformed currency.
    pub fn create(user_id: UserId, currency: &str) -> Result<Self, AccountError> {
        Ok(Self {
            user_id,
            balance: Money::zero(currency)?,
            version: 1,
        })
    }

    /// Reconstitute an account from stored state.
    #[must_use]
    pub const fn reconstitute(user_id: UserId, balance: Money, version: u64) -> Self {
        Self {
            user_id,
            balance,
            version,
        }
    }

    /// Get the owning user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Get the balance.
    #[must_use]
    pub const fn balance(&self) -> &Money {
        &self.balance
    }

    /// Get the version counter.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Add money to the account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Money`] on currency mismatch.
    pub fn top_up(&mut self, amount: &Money) -> Result<(), AccountError> {
        self.balance = self.balance.add(amount)?;
        self.version += 1;
        Ok(())
    }

    /// Debit the account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InsufficientFunds`] when the balance does
    /// not cover the amount; the balance is left untouched.
    pub fn withdraw(&mut self, amount: &Money) -> Result<(), AccountError> {
        if !self.can_withdraw(amount) {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance.clone(),
                requested: amount.clone(),
            });
        }
        self.balance = self.balance.subtract(amount)?;
        self.version += 1;
        Ok(())
    }

    /// Whether a debit of `amount` would succeed.
    #[must_use]
    pub fn can_withdraw(&self, amount: &Money) -> bool {
        self.balance.can_afford(amount)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn rub(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, "RUB").unwrap()
    }

    #[test]
    fn create_starts_with_zero_balance() {
        let account = Account::create(UserId::generate(), "RUB").unwrap();
        assert!(account.balance().is_zero());
        assert_eq!(account.version(), 1);
    }

    #[test]
    fn top_up_adds_and_bumps_version() {
        let mut account = Account::create(UserId::generate(), "RUB").unwrap();
        account.top_up(&rub(dec!(150.00))).unwrap();
        assert_eq!(account.balance().amount(), dec!(150.00));
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn withdraw_subtracts() {
        let mut account = Account::create(UserId::generate(), "RUB").unwrap();
        account.top_up(&rub(dec!(150.00))).unwrap();
        account.withdraw(&rub(dec!(100.00))).unwrap();
        assert_eq!(account.balance().amount(), dec!(50.00));
        assert_eq!(account.version(), 3);
    }

    #[test]
    fn withdraw_more_than_balance_fails_and_leaves_balance() {
        let mut account = Account::create(UserId::generate(), "RUB").unwrap();
        account.top_up(&rub(dec!(10.00))).unwrap();

        let err = account.withdraw(&rub(dec!(100.00))).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        assert_eq!(account.balance().amount(), dec!(10.00));
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn withdraw_entire_balance_reaches_exactly_zero() {
        let mut account = Account::create(UserId::generate(), "RUB").unwrap();
        account.top_up(&rub(dec!(42.00))).unwrap();
        account.withdraw(&rub(dec!(42.00))).unwrap();
        assert!(account.balance().is_zero());
    }

    #[test]
    fn withdraw_different_currency_fails() {
        let mut account = Account::create(UserId::generate(), "RUB").unwrap();
        account.top_up(&rub(dec!(100))).unwrap();
        let usd = Money::new(dec!(1), "USD").unwrap();
        assert!(account.withdraw(&usd).is_err());
    }

    #[test]
    fn reconstitute_preserves_fields() {
        let user = UserId::generate();
        let account = Account::reconstitute(user, rub(dec!(7)), 4);
        assert_eq!(account.user_id(), user);
        assert_eq!(account.version(), 4);
    }
}
