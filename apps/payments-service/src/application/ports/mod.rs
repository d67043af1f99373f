//! Ports (driven interfaces) implemented by infrastructure adapters.

mod inbox;
mod outbox;
mod queries;
mod unit_of_work;

pub use inbox::{InboxMessage, InboxStatus, InboxStore};
pub use outbox::{OutboxMessage, OutboxStore};
pub use queries::AccountQueries;
pub use unit_of_work::{PaymentsTx, PaymentsUnitOfWork};

/// Error from the storage adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint was violated.
    #[error("{entity} already exists: {key}")]
    DuplicateKey {
        /// Entity kind (e.g. "payment").
        entity: &'static str,
        /// Offending key.
        key: String,
    },

    /// The storage backend failed.
    #[error("storage backend error: {message}")]
    Backend {
        /// Error details.
        message: String,
    },
}

impl StorageError {
    /// Whether retrying the same operation can succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Backend { .. } => true,
            Self::DuplicateKey { .. } => false,
        }
    }
}
