//! Inbox message, its processing state machine, and the store port.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::StorageError;
use crate::domain::shared::{OrderId, UserId};

/// Processing state of an inbox row.
///
/// `Pending -> Processing -> {Processed | Pending (retry) | DeadLetter |
/// Failed}`. Processing is never terminal: a crashed owner is reclaimed by
/// the stuck sweep. `Processed`, `DeadLetter` and `Failed` are terminal;
/// `DeadLetter` means the retry budget ran out, `Failed` means retrying
/// could never help (poison body, permanently invalid command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboxStatus {
    /// Recorded, waiting for a processor.
    Pending,
    /// Locked by one processor instance.
    Processing,
    /// Business processing completed. Terminal.
    Processed,
    /// Non-retriable failure. Terminal.
    Failed,
    /// Retry budget exhausted. Terminal; operators must intervene.
    DeadLetter,
}

impl InboxStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Failed | Self::DeadLetter)
    }
}

impl fmt::Display for InboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Processing => write!(f, "Processing"),
            Self::Processed => write!(f, "Processed"),
            Self::Failed => write!(f, "Failed"),
            Self::DeadLetter => write!(f, "DeadLetter"),
        }
    }
}

/// A recorded broker delivery.
///
/// `id` is the broker message id: inserting a second delivery of the same
/// id is a no-op, which is the whole dedup mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxMessage {
    /// Broker message id, the external idempotency key.
    pub id: String,
    /// Order the command refers to.
    pub order_id: OrderId,
    /// Paying user.
    pub user_id: UserId,
    /// Raw delivery body.
    pub body: String,
    /// Type tag of the delivery.
    pub message_type: String,
    /// Processing state.
    pub status: InboxStatus,
    /// Failed processing attempts so far.
    pub retry_count: u32,
    /// Instance currently holding the lock.
    pub processor_id: Option<String>,
    /// When the lock was taken.
    pub locked_at: Option<DateTime<Utc>>,
    /// When the delivery was recorded.
    pub received_at: DateTime<Utc>,
    /// When processing completed.
    pub processed_at: Option<DateTime<Utc>>,
    /// Most recent processing error.
    pub last_error: Option<String>,
    /// Optimistic-lock version.
    pub version: u64,
}

impl InboxMessage {
    /// Create a pending row for a fresh delivery.
    #[must_use]
    pub fn pending(
        id: impl Into<String>,
        order_id: OrderId,
        user_id: UserId,
        body: impl Into<String>,
        message_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            order_id,
            user_id,
            body: body.into(),
            message_type: message_type.into(),
            status: InboxStatus::Pending,
            retry_count: 0,
            processor_id: None,
            locked_at: None,
            received_at: Utc::now(),
            processed_at: None,
            last_error: None,
            version: 1,
        }
    }
}

/// Store port for the inbox processor.
///
/// Every operation is a single atomic store action; none of them joins an
/// ambient transaction. The `try_acquire` compare-and-swap is the
/// mutual-exclusion primitive between processor instances - not a row
/// lock held for the duration of the business work, so a crashed owner
/// never blocks others forever.
#[async_trait]
pub trait InboxStore: Send + Sync {
    /// Fetch up to `limit` pending rows, ordered by (received_at,
    /// retry_count).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_pending(&self, limit: usize) -> Result<Vec<InboxMessage>, StorageError>;

    /// Atomically move a row from `Pending` to `Processing` on behalf of
    /// `processor_id`. Returns `false` when the row is gone, not pending,
    /// or its version moved - exactly one racing caller wins.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn try_acquire(&self, message_id: &str, processor_id: &str)
        -> Result<bool, StorageError>;

    /// Return a `Processing` row to `Pending`, incrementing its retry
    /// count.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn release(&self, message_id: &str) -> Result<(), StorageError>;

    /// Finalize a row as `Processed`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn mark_processed(&self, message_id: &str) -> Result<(), StorageError>;

    /// Finalize a row as `Failed` (non-retriable).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn mark_failed(&self, message_id: &str, error: &str) -> Result<(), StorageError>;

    /// Finalize a row as `DeadLetter` (retry budget exhausted).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn mark_dead_letter(&self, message_id: &str, error: &str) -> Result<(), StorageError>;

    /// Rows stuck in `Processing` longer than `older_than`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn get_stuck(&self, older_than: Duration) -> Result<Vec<InboxMessage>, StorageError>;

    /// Return stuck rows to `Pending`. Returns how many were reclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn release_stuck(&self, older_than: Duration) -> Result<usize, StorageError>;
}
