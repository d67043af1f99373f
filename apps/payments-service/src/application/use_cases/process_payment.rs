//! Process Payment use case: one saga step, safe to repeat.
//!
//! The step may run any number of times for the same command (broker
//! redelivery, inbox retry after a crash, a concurrent processor losing
//! the race) and must debit the account at most once. Three guards stack
//! up to make that true:
//!
//! 1. an already-`Success` payment short-circuits into re-emitting the
//!    result, deduplicated by the outbox correlation id;
//! 2. the withdrawal record keyed by payment id is consulted before
//!    touching the account - a recorded outcome is reused instead of
//!    debiting again;
//! 3. both the payment and the account are written with compare-and-swap
//!    version checks inside one transaction, so a stale writer loses
//!    wholesale and the inbox retries.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::messages::{PaymentResult, PAYMENT_PROCESSED};
use crate::application::ports::{OutboxMessage, PaymentsTx, PaymentsUnitOfWork};
use crate::domain::shared::{Money, OrderId, PaymentId, UserId};
use crate::domain::{Account, AccountError, Payment, PaymentStatus, Withdrawal};
use crate::error::PaymentsServiceError;

/// Reason published with a declined payment.
const INSUFFICIENT_FUNDS: &str = "Insufficient funds";

/// A payment command, as recorded in the inbox.
#[derive(Debug, Clone)]
pub struct PaymentCommand {
    /// Inbox/broker message id; correlation key of the emitted result.
    pub message_id: String,
    /// Order to settle.
    pub order_id: OrderId,
    /// Paying user.
    pub user_id: UserId,
    /// Amount to debit.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
}

/// What processing a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The payment settled; `success` tells how.
    Processed {
        /// Whether the debit succeeded.
        success: bool,
    },
    /// The order was already paid; the result was (re-)emitted without
    /// touching the account.
    AlreadyPaid,
}

/// Executes one payment command inside one local transaction.
pub struct ProcessPaymentUseCase<U: PaymentsUnitOfWork> {
    uow: Arc<U>,
    payment_results_queue: String,
}

impl<U: PaymentsUnitOfWork> ProcessPaymentUseCase<U> {
    /// Create the use case.
    pub fn new(uow: Arc<U>, payment_results_queue: impl Into<String>) -> Self {
        Self {
            uow,
            payment_results_queue: payment_results_queue.into(),
        }
    }

    /// Execute the use case.
    ///
    /// Insufficient funds is a success path here: the payment settles as
    /// `Failed`, a failed withdrawal is recorded for traceability, and a
    /// negative result is emitted.
    ///
    /// # Errors
    ///
    /// - [`PaymentsServiceError::Validation`] for a malformed command.
    /// - [`PaymentsServiceError::AccountNotFound`] for an unknown user.
    /// - [`PaymentsServiceError::Conflict`] when a concurrent writer
    ///   changed the payment or the account; the caller releases the inbox
    ///   lock and retries.
    pub async fn execute(
        &self,
        command: PaymentCommand,
    ) -> Result<PaymentOutcome, PaymentsServiceError> {
        validate(&command)?;
        let amount = Money::new(command.amount, &command.currency)?;

        let mut tx = self.uow.begin().await?;

        let existing = tx.get_payment_by_order(command.order_id).await?;
        if let Some(payment) = &existing {
            if payment.status() == PaymentStatus::Success {
                tracing::info!(
                    order_id = %command.order_id,
                    payment_id = %payment.id(),
                    "order already paid, re-emitting result"
                );
                self.emit_result_once(&mut tx, &command, true, None).await?;
                tx.commit().await?;
                return Ok(PaymentOutcome::AlreadyPaid);
            }
        }

        let mut account = tx
            .get_account(command.user_id)
            .await?
            .ok_or(PaymentsServiceError::AccountNotFound(command.user_id))?;
        let account_version = account.version();

        let mut payment = match existing.clone() {
            Some(payment) => payment,
            None => Payment::create(command.order_id, command.user_id, amount.clone()),
        };
        let payment_version = payment.version();

        let debit_succeeded = self
            .withdraw_idempotently(&mut tx, &mut account, payment.id(), &amount)
            .await?;

        if debit_succeeded {
            payment.mark_success()?;
        } else {
            payment.mark_failed()?;
        }

        if existing.is_some() {
            if !tx.try_update_payment(&payment, payment_version).await? {
                return Err(PaymentsServiceError::Conflict {
                    entity: "payment",
                    key: payment.id().to_string(),
                });
            }
        } else {
            tx.insert_payment(&payment).await?;
        }

        if !tx.try_update_account(&account, account_version).await? {
            return Err(PaymentsServiceError::Conflict {
                entity: "account",
                key: command.user_id.to_string(),
            });
        }

        let reason = if debit_succeeded {
            None
        } else {
            Some(INSUFFICIENT_FUNDS.to_string())
        };
        self.emit_result_once(&mut tx, &command, debit_succeeded, reason)
            .await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %command.order_id,
            payment_id = %payment.id(),
            success = debit_succeeded,
            "payment processed"
        );
        Ok(PaymentOutcome::Processed {
            success: debit_succeeded,
        })
    }

    /// Debit through the withdrawal idempotency record.
    ///
    /// An existing record means a previous attempt already settled the
    /// ledger side; its outcome is reused and the account is not touched.
    async fn withdraw_idempotently(
        &self,
        tx: &mut U::Tx,
        account: &mut Account,
        payment_id: PaymentId,
        amount: &Money,
    ) -> Result<bool, PaymentsServiceError> {
        if let Some(existing) = tx.get_withdrawal_by_payment(payment_id).await? {
            tracing::info!(
                payment_id = %payment_id,
                success = existing.success(),
                "reusing recorded withdrawal outcome"
            );
            return Ok(existing.success());
        }

        match account.withdraw(amount) {
            Ok(()) => {
                tx.insert_withdrawal(&Withdrawal::record(payment_id, amount.clone(), true))
                    .await?;
                Ok(true)
            }
            Err(AccountError::InsufficientFunds { balance, requested }) => {
                tracing::warn!(
                    payment_id = %payment_id,
                    %balance,
                    %requested,
                    "insufficient funds"
                );
                tx.insert_withdrawal(&Withdrawal::record(payment_id, amount.clone(), false))
                    .await?;
                Ok(false)
            }
            Err(err @ AccountError::Money(_)) => Err(err.into()),
        }
    }

    /// Write the result to the outbox unless one with the same correlation
    /// id is already there.
    async fn emit_result_once(
        &self,
        tx: &mut U::Tx,
        command: &PaymentCommand,
        success: bool,
        reason: Option<String>,
    ) -> Result<(), PaymentsServiceError> {
        if tx
            .find_outbox_by_correlation(&command.message_id)
            .await?
            .is_some()
        {
            tracing::debug!(
                message_id = %command.message_id,
                "result already emitted for this command"
            );
            return Ok(());
        }

        let body = serde_json::to_string(&PaymentResult {
            message_id: command.message_id.clone(),
            order_id: command.order_id,
            user_id: command.user_id,
            success,
            reason,
        })?;
        tx.add_outbox(
            OutboxMessage::new(PAYMENT_PROCESSED, body, &self.payment_results_queue)
                .with_correlation_id(&command.message_id),
        )
        .await?;
        Ok(())
    }
}

fn validate(command: &PaymentCommand) -> Result<(), PaymentsServiceError> {
    if command.message_id.trim().is_empty() {
        return Err(PaymentsServiceError::Validation {
            field: "message_id",
            message: "message id is required".to_string(),
        });
    }
    if command.amount <= Decimal::ZERO {
        return Err(PaymentsServiceError::Validation {
            field: "amount",
            message: "amount must be positive".to_string(),
        });
    }
    Ok(())
}
