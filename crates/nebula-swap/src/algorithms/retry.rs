//! # Read Retry
//!
//! Exponential backoff for idempotent chain queries. Only transient errors
//! are retried; everything else surfaces on the first attempt.

use crate::config::RetryPolicy;
use crate::domain::SwapError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Backoff before retry number `attempt` (0-based), without jitter.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let backoff = policy
        .base_delay()
        .saturating_mul(2u32.saturating_pow(attempt));
    std::cmp::min(backoff, policy.max_delay())
}

/// Run a read, retrying transient failures with capped exponential backoff.
pub async fn retry_read<T, F, Fut>(
    label: &'static str,
    policy: &RetryPolicy,
    mut action: F,
) -> Result<T, SwapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SwapError>>,
{
    let attempts = policy.max_retries.saturating_add(1);
    let mut last_error = SwapError::NetworkError(format!("{label}: no attempt made"));

    for attempt in 0..attempts {
        match timeout(policy.attempt_timeout(), action()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) if err.is_transient() => {
                warn!(attempt = attempt + 1, error = %err, "[nebula-swap] read {label} failed; retrying");
                last_error = err;
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                warn!(attempt = attempt + 1, "[nebula-swap] read {label} timed out; retrying");
                last_error = SwapError::NetworkError(format!("{label} timed out"));
            }
        }

        if attempt + 1 < attempts {
            let jitter = if policy.jitter_ms == 0 {
                Duration::ZERO
            } else {
                Duration::from_millis(rand::thread_rng().gen_range(0..=policy.jitter_ms))
            };
            sleep(backoff_delay(policy, attempt) + jitter).await;
        }
    }

    Err(last_error)
}
