//! In-memory order store.
//!
//! Implements every storage port over one mutex-protected state.
//! Transactions take the lock for their whole lifetime (single-writer, the
//! way an embedded database serializes writers) and operate on a working
//! copy: commit swaps the copy in, drop discards it. That gives the
//! adapter real transactional semantics: reads-your-writes inside the
//! transaction, atomic commit, and compare-and-swap updates that either
//! apply fully or report `false`.
//!
//! Suitable for testing and development. A relational adapter would
//! implement the same ports.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::ports::{
    OrderQueries, OrderTx, OrderUnitOfWork, OutboxMessage, OutboxStore, StorageError,
};
use crate::domain::order::Order;
use crate::domain::shared::{OrderId, UserId};

#[derive(Debug, Clone)]
struct ProcessedEntry {
    details: String,
    processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    outbox: Vec<OutboxMessage>,
    processed: HashMap<String, ProcessedEntry>,
}

/// In-memory implementation of the order-service storage ports.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders in the store.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Number of outbox rows, sent or not.
    pub async fn outbox_count(&self) -> usize {
        self.state.lock().await.outbox.len()
    }

    /// Number of idempotency-ledger entries.
    pub async fn processed_count(&self) -> usize {
        self.state.lock().await.processed.len()
    }
}

/// A transaction over [`InMemoryOrderStore`].
///
/// Holds the store lock until committed or dropped.
pub struct InMemoryOrderTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl OrderUnitOfWork for InMemoryOrderStore {
    type Tx = InMemoryOrderTx;

    async fn begin(&self) -> Result<Self::Tx, StorageError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryOrderTx { guard, working })
    }
}

#[async_trait]
impl OrderTx for InMemoryOrderTx {
    async fn insert_order(&mut self, order: &Order) -> Result<(), StorageError> {
        if self.working.orders.contains_key(&order.id()) {
            return Err(StorageError::DuplicateKey {
                entity: "order",
                key: order.id().to_string(),
            });
        }
        self.working.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order_with_version(
        &mut self,
        id: OrderId,
    ) -> Result<Option<(Order, u64)>, StorageError> {
        Ok(self
            .working
            .orders
            .get(&id)
            .map(|order| (order.clone(), order.version())))
    }

    async fn try_update_order(
        &mut self,
        order: &Order,
        expected_version: u64,
    ) -> Result<bool, StorageError> {
        match self.working.orders.get_mut(&order.id()) {
            Some(stored) if stored.version() == expected_version => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_outbox(&mut self, message: OutboxMessage) -> Result<(), StorageError> {
        self.working.outbox.push(message);
        Ok(())
    }

    async fn was_processed(&mut self, idempotency_key: &str) -> Result<bool, StorageError> {
        Ok(self.working.processed.contains_key(idempotency_key))
    }

    async fn mark_processed(
        &mut self,
        idempotency_key: &str,
        details: &str,
    ) -> Result<(), StorageError> {
        if self.working.processed.contains_key(idempotency_key) {
            return Err(StorageError::DuplicateKey {
                entity: "processed message",
                key: idempotency_key.to_string(),
            });
        }
        self.working.processed.insert(
            idempotency_key.to_string(),
            ProcessedEntry {
                details: details.to_string(),
                processed_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StorageError> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) {
        // Dropping the working copy and the guard discards everything.
    }
}

#[async_trait]
impl OutboxStore for InMemoryOrderStore {
    async fn get_unsent_batch(&self, limit: usize) -> Result<Vec<OutboxMessage>, StorageError> {
        let state = self.state.lock().await;
        let mut unsent: Vec<OutboxMessage> = state
            .outbox
            .iter()
            .filter(|message| !message.sent)
            .cloned()
            .collect();
        unsent.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        unsent.truncate(limit);
        Ok(unsent)
    }

    async fn mark_sent(&self, message_ids: &[String]) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        for message in &mut state.outbox {
            if message_ids.contains(&message.message_id) {
                message.sent = true;
                message.sent_at = Some(now);
            }
        }
        Ok(())
    }

    async fn record_failure(&self, message_id: &str, error: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state
            .outbox
            .iter_mut()
            .find(|message| message.message_id == message_id)
        {
            message.retry_count += 1;
            message.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl OrderQueries for InMemoryOrderStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StorageError> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StorageError> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| user_id.is_none_or(|user| order.user_id() == user))
            .cloned()
            .collect();
        orders.sort_by_key(Order::created_at);
        Ok(orders)
    }
}
