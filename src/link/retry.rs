//! Retrying a failing link with a fixed delay.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::context::RetryInfo;
use crate::{Context, Error, Result};
use super::Link;

/// Retry settings, loadable from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Fixed pause between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 0,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// A link that re-runs `link` on failure, up to `max_retries` attempts.
///
/// Every attempt starts from a clone of the original context. On success the
/// result carries `retryInfo` with the number of attempts used. When every
/// attempt fails, the link fails with [`Error::RetryExhausted`]. Configuration
/// errors from the inner link are returned immediately.
///
/// # Example
///
/// ```rust
/// use link_chain::{retry, Context, FnLink, Link};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let calls = AtomicU32::new(0);
/// let flaky = FnLink::new(move |ctx: Context| {
///     if calls.fetch_add(1, Ordering::SeqCst) == 0 {
///         Err("temporarily unavailable".into())
///     } else {
///         Ok(ctx.set("fetched", true))
///     }
/// });
///
/// let out = retry(flaky, 3, Duration::ZERO).run(Context::new()).await.unwrap();
/// assert_eq!(out.retry_info.map(|r| r.attempts), Some(2));
/// # });
/// ```
pub struct Retry<L> {
    link: L,
    max_retries: u32,
    delay: Duration,
}

impl<L> Retry<L> {
    /// Create a retrying link.
    pub fn new(link: L, max_retries: u32, delay: Duration) -> Self {
        Self {
            link,
            max_retries,
            delay,
        }
    }

    /// Create a retrying link from a [`RetryConfig`].
    pub fn with_config(link: L, config: RetryConfig) -> Self {
        Self::new(link, config.max_retries, config.delay())
    }
}

/// Shorthand for [`Retry::new`].
pub fn retry<L: Link>(link: L, max_retries: u32, delay: Duration) -> Retry<L> {
    Retry::new(link, max_retries, delay)
}

#[async_trait]
impl<L: Link> Link for Retry<L> {
    async fn run(&self, ctx: Context) -> Result<Context> {
        if self.max_retries == 0 {
            return Err(Error::Config("retry needs at least one attempt".into()));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.link.run(ctx.clone()).await {
                Ok(mut out) => {
                    out.retry_info = Some(RetryInfo {
                        attempts: attempt,
                        successful: true,
                        max_retries: self.max_retries,
                    });
                    return Ok(out);
                }
                Err(err) if err.is_config() => return Err(err),
                Err(err) if attempt >= self.max_retries => {
                    tracing::warn!(
                        link = self.link.name(),
                        attempts = attempt,
                        error = %err,
                        "retries exhausted"
                    );
                    return Err(Error::RetryExhausted {
                        attempts: attempt,
                        max_retries: self.max_retries,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    tracing::debug!(
                        link = self.link.name(),
                        attempt,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.link.name()
    }

    fn is_async(&self) -> bool {
        self.link.is_async()
    }
}
