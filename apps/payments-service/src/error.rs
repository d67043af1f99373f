//! Service-level error type.

use crate::application::ports::StorageError;
use crate::domain::shared::{MoneyError, UserId};
use crate::domain::{AccountError, PaymentError};

/// Errors surfaced by payments-service use cases.
///
/// Insufficient funds is deliberately absent: it is a business outcome
/// recorded on the payment, not an error. The taxonomy matters to the
/// inbox processor: only conflicts and transient storage errors are worth
/// retrying; everything else dead-ends the message.
#[derive(Debug, thiserror::Error)]
pub enum PaymentsServiceError {
    /// A command field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Field name.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// Money construction or arithmetic error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Account domain error.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Payment domain error.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// No account exists for the user.
    #[error("account not found for user {0}")]
    AccountNotFound(UserId),

    /// An account already exists for the user.
    #[error("account already exists for user {0}")]
    AccountAlreadyExists(UserId),

    /// Another writer changed an aggregate between our read and our write.
    #[error("{entity} was modified concurrently: {key}")]
    Conflict {
        /// Aggregate kind.
        entity: &'static str,
        /// Aggregate key.
        key: String,
    },

    /// Storage adapter failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentsServiceError {
    /// Whether a retry with a fresh read can succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Storage(err) => err.is_transient(),
            Self::Validation { .. }
            | Self::Money(_)
            | Self::Account(_)
            | Self::Payment(_)
            | Self::AccountNotFound(_)
            | Self::AccountAlreadyExists(_)
            | Self::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retriable() {
        let err = PaymentsServiceError::Conflict {
            entity: "account",
            key: "k".to_string(),
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn account_not_found_is_not_retriable() {
        let err = PaymentsServiceError::AccountNotFound(UserId::generate());
        assert!(!err.is_retriable());
    }
}
