//! Inbox processor: drives recorded commands through ProcessPayment.
//!
//! A poll cycle fetches pending rows and works through them one at a time,
//! so a failure stays isolated to its message. Each row is taken with a
//! compare-and-swap acquire; losing the race to another instance just
//! means skipping the row. Rows whose owner crashed mid-flight sit in
//! `Processing` until the periodic stuck sweep returns them to `Pending`.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::messages::PaymentCommandBody;
use crate::application::ports::{InboxMessage, InboxStore, PaymentsUnitOfWork, StorageError};
use crate::application::use_cases::{PaymentCommand, ProcessPaymentUseCase};

/// Processor tuning knobs.
#[derive(Debug, Clone)]
pub struct InboxProcessorConfig {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Maximum rows fetched per poll.
    pub batch_size: usize,
    /// Failed attempts after which a row dead-letters instead of retrying.
    pub max_retries: u32,
    /// Delay after a whole-cycle failure.
    pub error_backoff: Duration,
    /// Extra randomization applied to the error backoff (0.2 = up to +20%).
    pub jitter_factor: f64,
    /// Age at which a `Processing` row counts as stuck.
    pub stuck_after: Duration,
    /// How often the stuck sweep runs.
    pub sweep_interval: Duration,
}

impl Default for InboxProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 50,
            max_retries: 3,
            error_backoff: Duration::from_secs(5),
            jitter_factor: 0.2,
            stuck_after: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Background loop executing inbox rows exactly once per consumer.
pub struct InboxProcessor<U, S>
where
    U: PaymentsUnitOfWork,
    S: InboxStore,
{
    use_case: Arc<ProcessPaymentUseCase<U>>,
    inbox: Arc<S>,
    config: InboxProcessorConfig,
    cancel: CancellationToken,
    processor_id: String,
}

impl<U, S> InboxProcessor<U, S>
where
    U: PaymentsUnitOfWork,
    S: InboxStore,
{
    /// Create the processor with a unique instance id.
    pub fn new(
        use_case: Arc<ProcessPaymentUseCase<U>>,
        inbox: Arc<S>,
        config: InboxProcessorConfig,
        cancel: CancellationToken,
    ) -> Self {
        let processor_id = format!(
            "{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4().simple()
        );
        Self {
            use_case,
            inbox,
            config,
            cancel,
            processor_id,
        }
    }

    /// This instance's id, as written into the rows it locks.
    #[must_use]
    pub fn processor_id(&self) -> &str {
        &self.processor_id
    }

    /// Run until the cancellation token fires. An in-flight message is
    /// finished before the loop exits.
    pub async fn run(self) {
        info!(processor_id = %self.processor_id, "inbox processor started");
        let mut last_sweep = Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if last_sweep.elapsed() >= self.config.sweep_interval {
                last_sweep = Instant::now();
                match self.inbox.release_stuck(self.config.stuck_after).await {
                    Ok(0) => {}
                    Ok(count) => warn!(count, "reclaimed stuck inbox messages"),
                    Err(err) => error!(error = %err, "stuck sweep failed"),
                }
            }

            let delay = match self.run_once().await {
                Ok(()) => self.config.poll_interval,
                Err(err) => {
                    error!(error = %err, "inbox processor cycle failed");
                    self.error_delay()
                }
            };
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        info!(processor_id = %self.processor_id, "inbox processor stopped");
    }

    /// Process a single poll cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the inbox store itself fails;
    /// per-message failures are settled on the rows instead.
    pub async fn run_once(&self) -> Result<(), StorageError> {
        let batch = self.inbox.get_pending(self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(());
        }
        debug!(count = batch.len(), "processing inbox batch");

        for message in batch {
            self.process_one(message).await?;
        }
        Ok(())
    }

    async fn process_one(&self, message: InboxMessage) -> Result<(), StorageError> {
        if !self
            .inbox
            .try_acquire(&message.id, &self.processor_id)
            .await?
        {
            debug!(message_id = %message.id, "message taken by another instance");
            return Ok(());
        }

        let body: PaymentCommandBody = match serde_json::from_str(&message.body) {
            Ok(body) => body,
            Err(err) => {
                error!(
                    message_id = %message.id,
                    error = %err,
                    "inbox body does not deserialize, failing permanently"
                );
                self.inbox
                    .mark_failed(&message.id, &err.to_string())
                    .await?;
                return Ok(());
            }
        };

        // The inbox id is authoritative over anything inside the body.
        let command = PaymentCommand {
            message_id: message.id.clone(),
            order_id: body.order_id,
            user_id: body.user_id,
            amount: body.amount,
            currency: body.currency,
        };

        match self.use_case.execute(command).await {
            Ok(outcome) => {
                info!(message_id = %message.id, ?outcome, "inbox message processed");
                self.inbox.mark_processed(&message.id).await?;
            }
            Err(err) if err.is_retriable() => {
                if message.retry_count >= self.config.max_retries {
                    error!(
                        message_id = %message.id,
                        retry_count = message.retry_count,
                        error = %err,
                        "retry budget exhausted, dead-lettering"
                    );
                    self.inbox
                        .mark_dead_letter(&message.id, &err.to_string())
                        .await?;
                } else {
                    warn!(
                        message_id = %message.id,
                        retry_count = message.retry_count,
                        error = %err,
                        "processing failed, releasing for retry"
                    );
                    self.inbox.release(&message.id).await?;
                }
            }
            Err(err) => {
                error!(
                    message_id = %message.id,
                    error = %err,
                    "non-retriable failure, failing permanently"
                );
                self.inbox
                    .mark_failed(&message.id, &err.to_string())
                    .await?;
            }
        }
        Ok(())
    }

    fn error_delay(&self) -> Duration {
        let factor = self.config.jitter_factor;
        if factor <= 0.0 {
            return self.config.error_backoff;
        }
        let jitter = rand::rng().random_range(0.0..=factor);
        self.config.error_backoff.mul_f64(1.0 + jitter)
    }
}
