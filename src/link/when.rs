//! Conditional link execution.

use async_trait::async_trait;

use crate::{Context, Result};
use super::Link;

/// A link that runs `link` only when a predicate over the context holds.
///
/// When the predicate is `false` the context passes through untouched: no
/// error, no added field.
///
/// # Example
///
/// ```rust
/// use link_chain::{when, Context, FnLink, Link};
///
/// # tokio_test::block_on(async {
/// let vip = when(
///     |ctx: &Context| ctx.get_as::<bool>("vip").unwrap_or(false),
///     FnLink::new(|ctx: Context| Ok(ctx.set("discount", 10))),
/// );
///
/// let regular = vip.run(Context::new()).await.unwrap();
/// assert!(!regular.contains_key("discount"));
/// # });
/// ```
pub struct When<P, L> {
    predicate: P,
    link: L,
}

impl<P, L> When<P, L> {
    /// Create a new conditional link.
    pub fn new(predicate: P, link: L) -> Self {
        Self { predicate, link }
    }
}

/// Shorthand for [`When::new`].
pub fn when<P, L>(predicate: P, link: L) -> When<P, L>
where
    P: Fn(&Context) -> bool + Send + Sync + 'static,
    L: Link,
{
    When::new(predicate, link)
}

#[async_trait]
impl<P, L> Link for When<P, L>
where
    P: Fn(&Context) -> bool + Send + Sync + 'static,
    L: Link,
{
    async fn run(&self, ctx: Context) -> Result<Context> {
        if (self.predicate)(&ctx) {
            self.link.run(ctx).await
        } else {
            Ok(ctx)
        }
    }

    fn name(&self) -> &str {
        self.link.name()
    }

    fn is_async(&self) -> bool {
        self.link.is_async()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnLink;

    fn mark() -> FnLink<impl Fn(Context) -> Result<Context> + Send + Sync + 'static> {
        FnLink::new(|ctx: Context| Ok(ctx.set("ran", true)))
    }

    #[tokio::test]
    async fn test_true_predicate_runs_link() {
        let input = Context::new().set("n", 1);
        let direct = mark().run(input.clone()).await.unwrap();
        let guarded = when(|_: &Context| true, mark()).run(input).await.unwrap();
        assert_eq!(guarded, direct);
    }

    #[tokio::test]
    async fn test_false_predicate_is_identity() {
        let input = Context::new().set("n", 1);
        let out = when(|_: &Context| false, mark()).run(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }
}
