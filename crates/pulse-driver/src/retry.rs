use std::time::Duration;

use pulse_common::config::DriverConfig;
use pulse_obs::{ATTEMPTS_TOTAL, RETRIES_TOTAL};
use tokio::time;

use crate::outcome::Outcome;
use crate::target::TargetDescriptor;
use crate::transport::{Attempt, AttemptError, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep between two failed attempts of the same request.
    pub backoff: Duration,
    /// Upper bound on a single attempt, including reading the body.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &DriverConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            backoff: Duration::from_millis(cfg.backoff_ms),
            attempt_timeout: Duration::from_millis(cfg.attempt_timeout_ms),
        }
    }
}

/// Drives one logical request to a terminal outcome.
///
/// At most `max_attempts` calls are made (at least one). Nothing is slept
/// after the final failure.
pub async fn attempt_request<T: Transport>(
    transport: &T,
    target: &TargetDescriptor,
    policy: &RetryPolicy,
    slot: usize,
) -> Outcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut index = 0;
    loop {
        let attempt = Attempt { slot, index };
        ATTEMPTS_TOTAL.inc();
        let result = match time::timeout(policy.attempt_timeout, transport.send(target, attempt)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout(policy.attempt_timeout)),
        };
        match result {
            Ok(body) => return Outcome::Success(body),
            Err(last_error) if index + 1 >= max_attempts => {
                tracing::warn!(target: "driver", slot, "request exhausted {} attempts: {}", max_attempts, last_error);
                return Outcome::Exhausted { attempts: max_attempts, last_error };
            }
            Err(err) => {
                tracing::debug!(target: "driver", slot, attempt = index, "attempt failed: {}", err);
                RETRIES_TOTAL.inc();
                time::sleep(policy.backoff).await;
                index += 1;
            }
        }
    }
}
