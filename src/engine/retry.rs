//! Retry, timeout and fallback wrappers for calls to external collaborators.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::config::RetryPolicy;

/// Run `op` up to `policy.attempts()` times, sleeping `min_delay * factor^k`
/// after failed attempt `k`. The last error comes back unchanged.
pub async fn with_retry<T, F, Fut>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    log::info!("{} succeeded on attempt {}/{}", label, attempt + 1, attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt + 1 >= attempts => {
                log::error!("{} failed after {} attempt(s): {:#}", label, attempts, e);
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "{} attempt {}/{} failed: {:#}. Retrying in {:?}",
                    label,
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Bound a single external call
pub async fn with_timeout<T, Fut>(label: &str, limit: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("{} timed out after {:?}", label, limit)),
    }
}

/// Await `primary`; on failure (and when enabled) substitute `fallback()`.
/// A failing fallback reports its own error.
pub async fn with_fallback<T, Fut, F>(
    label: &str,
    primary: Fut,
    fallback: F,
    enabled: bool,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
    F: FnOnce() -> Result<T>,
{
    match primary.await {
        Ok(value) => Ok(value),
        Err(e) if enabled => {
            log::warn!("{} unavailable ({:#}); using fallback", label, e);
            fallback()
        }
        Err(e) => Err(e),
    }
}
