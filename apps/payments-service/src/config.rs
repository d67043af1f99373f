//! Service configuration, loaded from environment variables.

use std::time::Duration;

use crate::application::messages::{PAYMENT_REQUESTS_QUEUE, PAYMENT_RESULTS_QUEUE};
use crate::application::services::{InboxProcessorConfig, OutboxRelayConfig};

/// Payments-service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue payment commands arrive on.
    pub payment_requests_queue: String,
    /// Queue payment results are published to.
    pub payment_results_queue: String,
    /// Inbox processor tuning.
    pub inbox: InboxProcessorConfig,
    /// Outbox relay tuning.
    pub outbox: OutboxRelayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            payment_requests_queue: PAYMENT_REQUESTS_QUEUE.to_string(),
            payment_results_queue: PAYMENT_RESULTS_QUEUE.to_string(),
            inbox: InboxProcessorConfig::default(),
            outbox: OutboxRelayConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    ///
    /// - `PAYMENT_REQUESTS_QUEUE`, `PAYMENT_RESULTS_QUEUE`
    /// - `INBOX_POLL_INTERVAL_MS`, `INBOX_BATCH_SIZE`, `INBOX_MAX_RETRIES`,
    ///   `INBOX_STUCK_AFTER_MS`, `INBOX_SWEEP_INTERVAL_MS`
    /// - `OUTBOX_POLL_INTERVAL_MS`, `OUTBOX_BATCH_SIZE`,
    ///   `OUTBOX_ERROR_BACKOFF_MS`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            payment_requests_queue: env_string(
                "PAYMENT_REQUESTS_QUEUE",
                &defaults.payment_requests_queue,
            ),
            payment_results_queue: env_string(
                "PAYMENT_RESULTS_QUEUE",
                &defaults.payment_results_queue,
            ),
            inbox: InboxProcessorConfig {
                poll_interval: env_duration_ms("INBOX_POLL_INTERVAL_MS", defaults.inbox.poll_interval),
                batch_size: env_usize("INBOX_BATCH_SIZE", defaults.inbox.batch_size),
                max_retries: env_u32("INBOX_MAX_RETRIES", defaults.inbox.max_retries),
                error_backoff: env_duration_ms(
                    "INBOX_ERROR_BACKOFF_MS",
                    defaults.inbox.error_backoff,
                ),
                jitter_factor: defaults.inbox.jitter_factor,
                stuck_after: env_duration_ms("INBOX_STUCK_AFTER_MS", defaults.inbox.stuck_after),
                sweep_interval: env_duration_ms(
                    "INBOX_SWEEP_INTERVAL_MS",
                    defaults.inbox.sweep_interval,
                ),
            },
            outbox: OutboxRelayConfig {
                poll_interval: env_duration_ms(
                    "OUTBOX_POLL_INTERVAL_MS",
                    defaults.outbox.poll_interval,
                ),
                batch_size: env_usize("OUTBOX_BATCH_SIZE", defaults.outbox.batch_size),
                error_backoff: env_duration_ms(
                    "OUTBOX_ERROR_BACKOFF_MS",
                    defaults.outbox.error_backoff,
                ),
                jitter_factor: defaults.outbox.jitter_factor,
            },
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    match std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(ms) => Duration::from_millis(ms),
        None => default,
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.payment_requests_queue, "payment-requests");
        assert_eq!(config.inbox.max_retries, 3);
        assert_eq!(config.inbox.batch_size, 50);
        assert_eq!(config.outbox.batch_size, 100);
    }
}
