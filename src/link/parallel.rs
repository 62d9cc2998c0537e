//! Concurrent fan-out over several links.

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::{Context, Result};
use super::{Link, SharedLink};

/// A link that runs several links concurrently against the same input.
///
/// Every link receives its own clone of the input context. The combined
/// result starts from the input; each link's added or changed fields are then
/// applied in declaration order, so when two links write the same key the
/// last-listed one wins. Keys a link removed are not removed from the result.
///
/// The first failure fails the whole combinator and drops the links still in
/// flight.
///
/// # Example
///
/// ```rust
/// use link_chain::{parallel, Context, FnLink, Link, LinkExt};
///
/// # tokio_test::block_on(async {
/// let fan_out = parallel(vec![
///     FnLink::new(|ctx: Context| Ok(ctx.set("profile", "loaded"))).shared(),
///     FnLink::new(|ctx: Context| Ok(ctx.set("orders", 3))).shared(),
/// ]);
///
/// let out = fan_out.run(Context::new()).await.unwrap();
/// assert!(out.contains_key("profile") && out.contains_key("orders"));
/// # });
/// ```
pub struct Parallel {
    links: Vec<SharedLink>,
}

impl Parallel {
    /// Create a parallel link over `links`.
    pub fn new(links: Vec<SharedLink>) -> Self {
        Self { links }
    }

    /// Number of links run per invocation.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Shorthand for [`Parallel::new`].
pub fn parallel(links: Vec<SharedLink>) -> Parallel {
    Parallel::new(links)
}

#[async_trait]
impl Link for Parallel {
    async fn run(&self, ctx: Context) -> Result<Context> {
        if self.links.is_empty() {
            return Ok(ctx);
        }

        tracing::trace!(links = self.links.len(), "starting parallel links");
        let futures = self.links.iter().map(|link| link.run(ctx.clone()));
        let results = try_join_all(futures).await?;

        let mut merged = ctx.clone();
        for result in &results {
            merged.apply_changes(&ctx, result);
        }
        Ok(merged)
    }

    fn name(&self) -> &str {
        "parallel"
    }

    fn is_async(&self) -> bool {
        self.links.iter().any(|link| link.is_async())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, FnLink, LambdaLink, LinkExt};
    use serde_json::json;
    use std::time::Duration;

    fn delayed_set(key: &'static str, value: i64, ms: u64) -> SharedLink {
        LambdaLink::new(move |ctx: Context| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, Error>(ctx.set(key, value))
        })
        .shared()
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_concurrently_and_merges_all_fields() {
        let fan_out = parallel(vec![
            delayed_set("resultA", 1, 100),
            delayed_set("resultB", 2, 100),
            delayed_set("resultC", 3, 100),
        ]);

        let start = tokio::time::Instant::now();
        let out = fan_out.run(Context::new().set("input", true)).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(out.get("resultA"), Some(&json!(1)));
        assert_eq!(out.get("resultB"), Some(&json!(2)));
        assert_eq!(out.get("resultC"), Some(&json!(3)));
        assert_eq!(out.get("input"), Some(&json!(true)));
        assert!(elapsed < Duration::from_millis(150), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_does_not_matter() {
        let fan_out = parallel(vec![
            delayed_set("slow", 1, 300),
            delayed_set("fast", 2, 10),
        ]);
        let out = fan_out.run(Context::new()).await.unwrap();
        assert!(out.contains_key("slow") && out.contains_key("fast"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_listed_wins_on_conflict() {
        let fan_out = parallel(vec![
            delayed_set("winner", 1, 10),
            delayed_set("winner", 2, 200),
            delayed_set("winner", 3, 50),
        ]);
        let out = fan_out.run(Context::new()).await.unwrap();
        assert_eq!(out.get("winner"), Some(&json!(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_failure_fails_all() {
        let fan_out = parallel(vec![
            delayed_set("ok", 1, 100),
            FnLink::new(|_ctx: Context| Err(Error::Link("broken".into()))).shared(),
        ]);
        let err = fan_out.run(Context::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "broken");
    }

    #[test]
    fn test_is_async_follows_branches() {
        let sync_only = parallel(vec![
            FnLink::new(|ctx: Context| Ok(ctx.set("a", 1))).shared(),
            FnLink::new(|ctx: Context| Ok(ctx.set("b", 2))).shared(),
        ]);
        assert!(!sync_only.is_async());
        assert!(parallel(vec![delayed_set("a", 1, 10)]).is_async());
    }

    #[tokio::test]
    async fn test_empty_is_identity() {
        let input = Context::new().set("a", 1);
        let out = parallel(Vec::new()).run(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }
}
