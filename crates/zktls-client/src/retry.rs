//! Bounded retry with exponential backoff
//!
//! Every failure is retried the same way: after the n-th failure the
//! operation waits `base_delay * 2^(n-1)` before trying again, and gives up
//! once `max_retries` failures have been seen after the initial try.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use dvc_common::{Error, Result};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Retry budget of one orchestration step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const SUBMIT_TASK: RetryPolicy = RetryPolicy::new(5, Duration::from_millis(1000));
    pub const ATTEST: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1000));
    pub const VERIFY_AND_POLL: RetryPolicy = RetryPolicy::new(5, Duration::from_millis(1000));

    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Wait before the retry following failure number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Sum of all waits when every attempt fails
    pub fn worst_case_wait(&self) -> Duration {
        (1..=self.max_retries)
            .map(|attempt| self.delay_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Run `op` until it succeeds or the policy's retry budget is spent
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let start = Instant::now();
    let mut attempt: u32 = 0;

    debug!(
        "{}: up to {} retries, {}ms total backoff",
        operation,
        policy.max_retries,
        policy.worst_case_wait().as_millis()
    );

    loop {
        debug!("{} attempt {} starting", operation, attempt);

        match op().await {
            Ok(value) => {
                info!("{} done ({}ms)", operation, start.elapsed().as_millis());
                return Ok(value);
            }
            Err(err) => {
                attempt += 1;
                // `{:#}` includes the full anyhow context chain
                let message = format!("{:#}", err);
                warn!(
                    "{} attempt {} failed ({}ms): {}",
                    operation,
                    attempt,
                    start.elapsed().as_millis(),
                    message
                );

                if attempt > policy.max_retries {
                    return Err(Error::RetriesExhausted {
                        operation: operation.to_string(),
                        retries: policy.max_retries,
                        last_error: message,
                    });
                }

                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
        }
    }
}
