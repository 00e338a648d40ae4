//! Retry with exponential backoff for transient worker failures.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::MnemosError;

/// Retry policy. `max_attempts` counts the first call, so 1 means no retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self::default()
    }

    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Backoff before attempt `attempt + 1` (attempts are 1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_backoff_ms as f64 * self.multiplier.max(1.0).powi(exp);
        let capped = millis.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// Only errors where [`MnemosError::is_retryable`] holds are retried.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    stage: &str,
    mut op: F,
) -> Result<T, MnemosError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MnemosError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    stage,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after transient failure: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
