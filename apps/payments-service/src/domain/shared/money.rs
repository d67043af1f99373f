//! Money value object with currency-checked arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors constructing or combining [`Money`] values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Amount below zero.
    #[error("amount cannot be negative: {amount}")]
    NegativeAmount {
        /// The offending amount.
        amount: Decimal,
    },

    /// Currency code is not three ASCII letters.
    #[error("invalid currency code: '{code}'")]
    InvalidCurrency {
        /// The offending code.
        code: String,
    },

    /// Two amounts in different currencies were combined.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Left-hand currency.
        left: String,
        /// Right-hand currency.
        right: String,
    },

    /// Subtraction would produce a negative amount.
    #[error("subtracting {subtrahend} from {minuend} would go below zero")]
    NegativeResult {
        /// Amount subtracted from.
        minuend: Decimal,
        /// Amount subtracted.
        subtrahend: Decimal,
    },
}

/// A non-negative amount of money in a single currency.
///
/// Immutable; arithmetic returns new values. Every operation that combines
/// two amounts validates currency equality explicitly, and no operation
/// can produce a negative amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    /// Create a new amount.
    ///
    /// The currency code must be three ASCII letters and is normalized to
    /// upper case.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] if the amount is negative or the currency
    /// code is malformed.
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, MoneyError> {
        if amount < Decimal::ZERO {
            return Err(MoneyError::NegativeAmount { amount });
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency {
                code: currency.to_string(),
            });
        }
        Ok(Self {
            amount,
            currency: currency.to_ascii_uppercase(),
        })
    }

    /// Zero in the given currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidCurrency`] for a malformed code.
    pub fn zero(currency: &str) -> Result<Self, MoneyError> {
        Self::new(Decimal::ZERO, currency)
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Get the currency code.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount == Decimal::ZERO
    }

    /// Add another amount in the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] for different currencies.
    pub fn add(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self {
            amount: self.amount + other.amount,
            currency: self.currency.clone(),
        })
    }

    /// Subtract another amount in the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] for different currencies
    /// and [`MoneyError::NegativeResult`] if the result would be negative.
    pub fn subtract(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        if other.amount > self.amount {
            return Err(MoneyError::NegativeResult {
                minuend: self.amount,
                subtrahend: other.amount,
            });
        }
        Ok(Self {
            amount: self.amount - other.amount,
            currency: self.currency.clone(),
        })
    }

    /// Whether this amount covers `other`. False for a different currency.
    #[must_use]
    pub fn can_afford(&self, other: &Self) -> bool {
        self.currency == other.currency && self.amount >= other.amount
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;

    fn rub(amount: Decimal) -> Money {
        Money::new(amount, "RUB").unwrap()
    }

    #[test]
    fn new_rejects_negative_amount() {
        assert!(matches!(
            Money::new(dec!(-0.01), "RUB"),
            Err(MoneyError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn new_rejects_bad_currency() {
        assert!(Money::new(dec!(1), "RUBLE").is_err());
        assert!(Money::new(dec!(1), "r1b").is_err());
    }

    #[test]
    fn add_same_currency() {
        let sum = rub(dec!(100)).add(&rub(dec!(50.50))).unwrap();
        assert_eq!(sum.amount(), dec!(150.50));
    }

    #[test]
    fn add_rejects_currency_mismatch() {
        let usd = Money::new(dec!(1), "USD").unwrap();
        assert!(matches!(
            rub(dec!(1)).add(&usd),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn subtract_below_zero_fails() {
        assert!(matches!(
            rub(dec!(10)).subtract(&rub(dec!(10.01))),
            Err(MoneyError::NegativeResult { .. })
        ));
    }

    #[test]
    fn subtract_to_exactly_zero_succeeds() {
        let result = rub(dec!(10)).subtract(&rub(dec!(10))).unwrap();
        assert!(result.is_zero());
    }

    #[test]
    fn can_afford_respects_currency() {
        let usd = Money::new(dec!(1), "USD").unwrap();
        assert!(rub(dec!(10)).can_afford(&rub(dec!(10))));
        assert!(!rub(dec!(10)).can_afford(&rub(dec!(10.01))));
        assert!(!rub(dec!(10)).can_afford(&usd));
    }

    #[test]
    fn display_shows_two_decimals() {
        assert_eq!(format!("{}", rub(dec!(50))), "50.00 RUB");
    }

    proptest! {
        #[test]
        fn add_then_subtract_roundtrips(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let a = rub(Decimal::from(a));
            let b = rub(Decimal::from(b));
            let roundtrip = a.add(&b).unwrap().subtract(&b).unwrap();
            prop_assert_eq!(roundtrip, a);
        }

        #[test]
        fn subtract_never_goes_negative(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let a_money = rub(Decimal::from(a));
            let b_money = rub(Decimal::from(b));
            match a_money.subtract(&b_money) {
                Ok(result) => prop_assert!(result.amount() >= Decimal::ZERO),
                Err(_) => prop_assert!(b > a),
            }
        }
    }
}
