//! Domain errors for the Order aggregate.

use super::aggregate::OrderStatus;
use crate::domain::shared::MoneyError;

/// Errors raised by Order construction and state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// A field failed validation.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The requested status change is not legal from the current status.
    #[error("invalid order state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
    },
}

impl From<MoneyError> for OrderError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidValue {
            field: "amount",
            message: err.to_string(),
        }
    }
}
