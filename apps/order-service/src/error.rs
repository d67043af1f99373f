//! Service-level error type.

use crate::application::ports::StorageError;
use crate::domain::order::OrderError;
use crate::domain::shared::{OrderId, UserId};

/// Errors surfaced by order-service use cases.
///
/// The taxonomy matters to callers: validation, not-found and
/// user-mismatch errors are never retried; conflicts and storage errors
/// are retried by the owning loop with a fresh read.
#[derive(Debug, thiserror::Error)]
pub enum OrderServiceError {
    /// Validation or illegal-transition error from the domain.
    #[error(transparent)]
    Domain(#[from] OrderError),

    /// No order with the given id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The order exists but belongs to a different user than the message
    /// claims.
    #[error("order {order_id} does not belong to user {user_id}")]
    UserMismatch {
        /// Order referenced by the message.
        order_id: OrderId,
        /// User the message claims.
        user_id: UserId,
    },

    /// Another writer changed the order between our read and our write.
    #[error("order {0} was modified concurrently")]
    Conflict(OrderId),

    /// Storage adapter failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrderServiceError {
    /// Whether a retry with a fresh read can succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Storage(err) => err.is_transient(),
            Self::Domain(_) | Self::NotFound(_) | Self::UserMismatch { .. } | Self::Serialization(_) => {
                false
            }
        }
    }
}
