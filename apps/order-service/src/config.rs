//! Service configuration, loaded from environment variables.

use std::time::Duration;

use crate::application::messages::{PAYMENT_REQUESTS_QUEUE, PAYMENT_RESULTS_QUEUE};
use crate::application::services::OutboxRelayConfig;

/// Order-service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue payment commands are published to.
    pub payment_requests_queue: String,
    /// Queue payment results arrive on.
    pub payment_results_queue: String,
    /// Outbox relay tuning.
    pub outbox: OutboxRelayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            payment_requests_queue: PAYMENT_REQUESTS_QUEUE.to_string(),
            payment_results_queue: PAYMENT_RESULTS_QUEUE.to_string(),
            outbox: OutboxRelayConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    ///
    /// - `PAYMENT_REQUESTS_QUEUE`, `PAYMENT_RESULTS_QUEUE`
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.payment_requests_queue, "payment-requests");
        assert_eq!(config.payment_results_queue, "payment-results");
        assert_eq!(config.outbox.batch_size, 100);
    }
}
