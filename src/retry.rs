//! Bounded retry with exponential backoff and jitter for upstream calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::error::UpstreamError;

/// Extra sleep added on top of a backoff delay.
pub type JitterFn = fn(Duration) -> Duration;

/// Uniform jitter in `[0, delay / 2]`.
pub fn uniform_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=0.5);
    delay.mul_f64(factor)
}

pub fn no_jitter(_: Duration) -> Duration {
    Duration::ZERO
}

/// Retry policy shared by every upstream call site.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least one call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: JitterFn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            jitter: uniform_jitter,
        }
    }
}

impl RetryPolicy {
    pub fn without_jitter(self) -> Self {
        Self {
            jitter: no_jitter,
            ..self
        }
    }

    /// Backoff delays before jitter, one entry per retry.
    ///
    /// Starts at `base_delay`, doubles each step and is capped at `max_delay`.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> {
        let max_delay = self.max_delay;
        std::iter::successors(Some(self.base_delay.min(max_delay)), move |delay| {
            Some(delay.saturating_mul(2).min(max_delay))
        })
        .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn attempt<T, F, Fut>(
        &self,
        description: &str,
        mut operation: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delays = self.backoff_schedule();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                error!("Permanent upstream failure fetching {}: {}", description, err);
                return Err(err);
            }

            let Some(delay) = delays.next() else {
                error!(
                    "Giving up on {} after {} attempts: {}",
                    description, max_attempts, err
                );
                return Err(err);
            };

            warn!(
                "Problem fetching {} (attempt {} of {}): {}",
                description, attempt, max_attempts, err
            );
            tokio::time::sleep(delay + (self.jitter)(delay)).await;
        }
    }
}
