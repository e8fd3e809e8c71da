//! Bounded retry with exponential backoff for source failures.

use kdss_core::PipelineError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_tries: u32,
    /// Wait before the second try; doubled after every failed try.
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_tries: 3,
            initial_backoff_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Wait after failed try number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

/// True when the error chain carries a retryable [`PipelineError`].
pub fn is_retryable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PipelineError>()
        .is_some_and(PipelineError::is_retryable)
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's tries are used up. The last error is returned on exhaustion.
///
/// Backoff waits on the tokio timer, so the runtime thread is not blocked.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let max_tries = policy.max_tries.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) if attempt >= max_tries => {
                warn!("Attempt {}/{}: {}", attempt, max_tries, e);
                warn!("All attempts failed");
                return Err(e);
            }
            Err(e) => {
                warn!("Attempt {}/{}: {}", attempt, max_tries, e);
                let wait = policy.backoff_after(attempt);
                info!("Sleeping for {} milliseconds before retry", wait.as_millis());
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max_tries: u32) -> RetryPolicy {
        RetryPolicy {
            max_tries,
            initial_backoff_ms: 0,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_after(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_retries_source_failures_until_success() {
        let mut calls = 0;
        let result = retry_with_backoff(&quick(3), || {
            calls += 1;
            let outcome = if calls < 3 {
                Err(PipelineError::SourceUnavailable("timeout".into()).into())
            } else {
                Ok(calls)
            };
            std::future::ready(outcome)
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_tries() {
        let mut calls = 0;
        let result: anyhow::Result<()> = retry_with_backoff(&quick(2), || {
            calls += 1;
            std::future::ready(Err(PipelineError::SourceUnavailable("down".into()).into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 2);
        assert!(is_retryable(&result.unwrap_err()));
    }

    #[tokio::test]
    async fn test_does_not_retry_other_errors() {
        let mut calls = 0;
        let result: anyhow::Result<()> = retry_with_backoff(&quick(5), || {
            calls += 1;
            std::future::ready(Err(PipelineError::MalformedInput("bad geometry".into()).into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);

        let mut calls = 0;
        let result: anyhow::Result<()> = retry_with_backoff(&quick(5), || {
            calls += 1;
            std::future::ready(Err(anyhow::anyhow!("plain failure")))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_on_the_runtime_timer() {
        let policy = RetryPolicy {
            max_tries: 3,
            initial_backoff_ms: 1000,
        };
        let started = tokio::time::Instant::now();
        let result: anyhow::Result<()> = retry_with_backoff(&policy, || {
            std::future::ready(Err(PipelineError::SourceUnavailable("down".into()).into()))
        })
        .await;
        assert!(result.is_err());
        // 1000 ms + 2000 ms of paused runtime time.
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }
}
