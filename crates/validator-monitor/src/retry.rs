//! Retry policy for data-source calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::RequestsConfig;

/// Retry configuration: a fixed attempt budget with a uniformly random
/// pause between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Shortest pause between attempts.
    pub backoff_min: Duration,
    /// Longest pause between attempts.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(requests: &RequestsConfig) -> Self {
        Self {
            max_attempts: requests.retries.max(1),
            backoff_min: requests.backoff_min(),
            backoff_max: requests.backoff_max(),
        }
    }

    /// Single attempt, no pause. Handy for tests and one-shot probes.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    /// Pick the pause before the next attempt.
    pub fn backoff(&self) -> Duration {
        if self.backoff_max <= self.backoff_min {
            return self.backoff_min;
        }
        let secs = rand::thread_rng()
            .gen_range(self.backoff_min.as_secs_f64()..=self.backoff_max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Run `f` until it succeeds or the attempt budget is spent.
    ///
    /// The error of the last attempt is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Request failed"
                    );

                    if attempt >= max_attempts {
                        return Err(e);
                    }

                    let delay = self.backoff();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
