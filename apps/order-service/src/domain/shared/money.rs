//! Money value object for order amounts.

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
}

/// A non-negative amount of money in a single currency.
///
/// Immutable. There are no silent numeric conversions: every operation
/// that combines two amounts validates currency equality explicitly.
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

    /// Check that another amount is in the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] otherwise.
    pub fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
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
