//! Ports (driven interfaces) implemented by infrastructure adapters.

mod outbox;
mod queries;
mod unit_of_work;

pub use outbox::{OutboxMessage, OutboxStore};
pub use queries::OrderQueries;
pub use unit_of_work::{OrderTx, OrderUnitOfWork};

/// Error from the storage adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint was violated.
    #[error("{entity} already exists: {key}")]
    DuplicateKey {
        /// Entity kind (e.g. "order").
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
