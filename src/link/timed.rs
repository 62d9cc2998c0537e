//! Timing wrapper recording link durations into the context.

use async_trait::async_trait;
use std::time::Instant;

use crate::{Context, Result};
use super::Link;

/// Wraps a link and records its wall-clock duration under `timings[label]`.
///
/// The duration is written in milliseconds onto the link's output. On failure
/// nothing is recorded and the error is returned unchanged.
///
/// # Example
///
/// ```rust
/// use link_chain::{timed, Context, FnLink, Link};
///
/// # tokio_test::block_on(async {
/// let lookup = timed("lookup", FnLink::new(|ctx: Context| Ok(ctx.set("found", true))));
/// let out = lookup.run(Context::new()).await.unwrap();
/// assert!(out.timings.contains_key("lookup"));
/// # });
/// ```
pub struct Timed<L> {
    inner: L,
    label: String,
}

impl<L: Link> Timed<L> {
    /// Wrap `inner`, recording its duration as `label`.
    pub fn new(label: impl Into<String>, inner: L) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }

    /// Access the inner link.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

/// Shorthand for [`Timed::new`].
pub fn timed<L: Link>(label: impl Into<String>, link: L) -> Timed<L> {
    Timed::new(label, link)
}

#[async_trait]
impl<L: Link> Link for Timed<L> {
    async fn run(&self, ctx: Context) -> Result<Context> {
        let start = Instant::now();
        let mut out = self.inner.run(ctx).await?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::trace!(label = %self.label, duration_ms, "timed link finished");
        out.timings.insert(self.label.clone(), duration_ms);
        Ok(out)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_async(&self) -> bool {
        self.inner.is_async()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, LambdaLink, LinkExt};
    use std::time::Duration;

    #[tokio::test]
    async fn test_records_duration() {
        let slow = LambdaLink::new(|ctx: Context| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, Error>(ctx)
        })
        .timed("slow");

        let out = slow.run(Context::new()).await.unwrap();
        assert!(out.timings["slow"] >= 20.0);
    }

    #[tokio::test]
    async fn test_failure_passes_through() {
        let failing = crate::FnLink::new(|_ctx: Context| Err(Error::Link("nope".into())));
        let err = timed("failing", failing).run(Context::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
