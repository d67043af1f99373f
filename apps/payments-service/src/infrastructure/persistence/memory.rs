//! In-memory payments store.
//!
//! Implements every storage port over one mutex-protected state.
//! Transactions take the lock for their whole lifetime (single-writer, the
//! way an embedded database serializes writers) and operate on a working
//! copy: commit swaps the copy in, drop discards it. Inbox operations are
//! individual atomic actions on the live state; the `try_acquire`
//! compare-and-swap there is what keeps multiple processor instances off
//! the same row.
//!
//! Suitable for testing and development. A relational adapter would
//! implement the same ports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::ports::{
    AccountQueries, InboxMessage, InboxStatus, InboxStore, OutboxMessage, OutboxStore, PaymentsTx,
    PaymentsUnitOfWork, StorageError,
};
use crate::domain::shared::{OrderId, PaymentId, UserId, WithdrawalId};
use crate::domain::{Account, Payment, Withdrawal};

#[derive(Debug, Clone, Default)]
struct State {
    accounts: HashMap<UserId, Account>,
    payments: HashMap<PaymentId, Payment>,
    payments_by_order: HashMap<OrderId, PaymentId>,
    withdrawals: HashMap<WithdrawalId, Withdrawal>,
    withdrawals_by_payment: HashMap<PaymentId, WithdrawalId>,
    inbox: HashMap<String, InboxMessage>,
    outbox: Vec<OutboxMessage>,
}

/// In-memory implementation of the payments-service storage ports.
#[derive(Clone, Default)]
pub struct InMemoryPaymentsStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryPaymentsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch one inbox row by id, for inspection.
    pub async fn inbox_message(&self, message_id: &str) -> Option<InboxMessage> {
        self.state.lock().await.inbox.get(message_id).cloned()
    }

    /// Number of inbox rows.
    pub async fn inbox_count(&self) -> usize {
        self.state.lock().await.inbox.len()
    }

    /// Number of outbox rows, sent or not.
    pub async fn outbox_count(&self) -> usize {
        self.state.lock().await.outbox.len()
    }

    /// Number of withdrawal records.
    pub async fn withdrawal_count(&self) -> usize {
        self.state.lock().await.withdrawals.len()
    }
}

/// A transaction over [`InMemoryPaymentsStore`].
///
/// Holds the store lock until committed or dropped.
pub struct InMemoryPaymentsTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl PaymentsUnitOfWork for InMemoryPaymentsStore {
    type Tx = InMemoryPaymentsTx;

    async fn begin(&self) -> Result<Self::Tx, StorageError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryPaymentsTx { guard, working })
    }
}

#[async_trait]
impl PaymentsTx for InMemoryPaymentsTx {
    async fn insert_account(&mut self, account: &Account) -> Result<(), StorageError> {
        if self.working.accounts.contains_key(&account.user_id()) {
            return Err(StorageError::DuplicateKey {
                entity: "account",
                key: account.user_id().to_string(),
            });
        }
        self.working
            .accounts
            .insert(account.user_id(), account.clone());
        Ok(())
    }

    async fn get_account(&mut self, user_id: UserId) -> Result<Option<Account>, StorageError> {
        Ok(self.working.accounts.get(&user_id).cloned())
    }

    async fn try_update_account(
        &mut self,
        account: &Account,
        expected_version: u64,
    ) -> Result<bool, StorageError> {
        match self.working.accounts.get_mut(&account.user_id()) {
            Some(stored) if stored.version() == expected_version => {
                *stored = account.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StorageError> {
        if self.working.payments_by_order.contains_key(&payment.order_id()) {
            return Err(StorageError::DuplicateKey {
                entity: "payment",
                key: payment.order_id().to_string(),
            });
        }
        self.working
            .payments_by_order
            .insert(payment.order_id(), payment.id());
        self.working.payments.insert(payment.id(), payment.clone());
        Ok(())
    }

    async fn get_payment_by_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, StorageError> {
        Ok(self
            .working
            .payments_by_order
            .get(&order_id)
            .and_then(|payment_id| self.working.payments.get(payment_id))
            .cloned())
    }

    async fn try_update_payment(
        &mut self,
        payment: &Payment,
        expected_version: u64,
    ) -> Result<bool, StorageError> {
        match self.working.payments.get_mut(&payment.id()) {
            Some(stored) if stored.version() == expected_version => {
                *stored = payment.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_withdrawal_by_payment(
        &mut self,
        payment_id: PaymentId,
    ) -> Result<Option<Withdrawal>, StorageError> {
        Ok(self
            .working
            .withdrawals_by_payment
            .get(&payment_id)
            .and_then(|withdrawal_id| self.working.withdrawals.get(withdrawal_id))
            .cloned())
    }

    async fn insert_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StorageError> {
        if self
            .working
            .withdrawals_by_payment
            .contains_key(&withdrawal.payment_id())
        {
            return Err(StorageError::DuplicateKey {
                entity: "withdrawal",
                key: withdrawal.payment_id().to_string(),
            });
        }
        self.working
            .withdrawals_by_payment
            .insert(withdrawal.payment_id(), withdrawal.id());
        self.working
            .withdrawals
            .insert(withdrawal.id(), withdrawal.clone());
        Ok(())
    }

    async fn add_outbox(&mut self, message: OutboxMessage) -> Result<(), StorageError> {
        self.working.outbox.push(message);
        Ok(())
    }

    async fn find_outbox_by_correlation(
        &mut self,
        correlation_id: &str,
    ) -> Result<Option<OutboxMessage>, StorageError> {
        Ok(self
            .working
            .outbox
            .iter()
            .find(|message| message.correlation_id == correlation_id)
            .cloned())
    }

    async fn inbox_contains(&mut self, message_id: &str) -> Result<bool, StorageError> {
        Ok(self.working.inbox.contains_key(message_id))
    }

    async fn insert_inbox(&mut self, message: InboxMessage) -> Result<(), StorageError> {
        if self.working.inbox.contains_key(&message.id) {
            return Err(StorageError::DuplicateKey {
                entity: "inbox message",
                key: message.id.clone(),
            });
        }
        self.working.inbox.insert(message.id.clone(), message);
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
impl InboxStore for InMemoryPaymentsStore {
    async fn get_pending(&self, limit: usize) -> Result<Vec<InboxMessage>, StorageError> {
        let state = self.state.lock().await;
        let mut pending: Vec<InboxMessage> = state
            .inbox
            .values()
            .filter(|message| message.status == InboxStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            (a.received_at, a.retry_count).cmp(&(b.received_at, b.retry_count))
        });
        pending.truncate(limit);
        Ok(pending)
    }

    async fn try_acquire(
        &self,
        message_id: &str,
        processor_id: &str,
    ) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        match state.inbox.get_mut(message_id) {
            Some(message) if message.status == InboxStatus::Pending => {
                message.status = InboxStatus::Processing;
                message.processor_id = Some(processor_id.to_string());
                message.locked_at = Some(Utc::now());
                message.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, message_id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.inbox.get_mut(message_id) {
            if message.status == InboxStatus::Processing {
                message.status = InboxStatus::Pending;
                message.processor_id = None;
                message.locked_at = None;
                message.retry_count += 1;
                message.version += 1;
            }
        }
        Ok(())
    }

    async fn mark_processed(&self, message_id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.inbox.get_mut(message_id) {
            if message.status == InboxStatus::Processing {
                message.status = InboxStatus::Processed;
                message.processor_id = None;
                message.locked_at = None;
                message.processed_at = Some(Utc::now());
                message.version += 1;
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, message_id: &str, error: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.inbox.get_mut(message_id) {
            message.status = InboxStatus::Failed;
            message.processor_id = None;
            message.locked_at = None;
            message.last_error = Some(error.to_string());
            message.version += 1;
        }
        Ok(())
    }

    async fn mark_dead_letter(&self, message_id: &str, error: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.inbox.get_mut(message_id) {
            message.status = InboxStatus::DeadLetter;
            message.processor_id = None;
            message.locked_at = None;
            message.last_error = Some(error.to_string());
            message.version += 1;
        }
        Ok(())
    }

    async fn get_stuck(&self, older_than: Duration) -> Result<Vec<InboxMessage>, StorageError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());
        let state = self.state.lock().await;
        Ok(state
            .inbox
            .values()
            .filter(|message| {
                message.status == InboxStatus::Processing
                    && message.locked_at.is_some_and(|locked| locked <= cutoff)
            })
            .cloned()
            .collect())
    }

    async fn release_stuck(&self, older_than: Duration) -> Result<usize, StorageError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());
        let mut state = self.state.lock().await;
        let mut reclaimed = 0;
        for message in state.inbox.values_mut() {
            if message.status == InboxStatus::Processing
                && message.locked_at.is_some_and(|locked| locked <= cutoff)
            {
                message.status = InboxStatus::Pending;
                message.processor_id = None;
                message.locked_at = None;
                message.retry_count += 1;
                message.version += 1;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }
}

#[async_trait]
impl OutboxStore for InMemoryPaymentsStore {
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
impl AccountQueries for InMemoryPaymentsStore {
    async fn get_account(&self, user_id: UserId) -> Result<Option<Account>, StorageError> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&user_id).cloned())
    }
}
