//! First-success racing between links.

use async_trait::async_trait;
use futures::future::select_all;

use crate::{Context, Error, Result};
use super::{Link, SharedLink};

/// A link that runs several links concurrently and keeps the first success.
///
/// The winning link's context is returned as-is; the other futures are
/// dropped, which cancels them at their next suspension point. If every link
/// fails, the last failure is returned. A configuration error from any
/// contender ends the race at once. Racing zero links is a configuration
/// error.
pub struct Race {
    links: Vec<SharedLink>,
}

impl Race {
    /// Create a race between `links`.
    pub fn new(links: Vec<SharedLink>) -> Self {
        Self { links }
    }
}

/// Shorthand for [`Race::new`].
pub fn race(links: Vec<SharedLink>) -> Race {
    Race::new(links)
}

#[async_trait]
impl Link for Race {
    async fn run(&self, ctx: Context) -> Result<Context> {
        if self.links.is_empty() {
            return Err(Error::Config("race needs at least one link".into()));
        }

        let mut pending: Vec<_> = self.links.iter().map(|link| link.run(ctx.clone())).collect();
        loop {
            let (result, _index, rest) = select_all(pending).await;
            match result {
                Ok(winner) => return Ok(winner),
                Err(err) if err.is_config() || rest.is_empty() => return Err(err),
                Err(err) => {
                    tracing::debug!(error = %err, remaining = rest.len(), "race contender failed");
                    pending = rest;
                }
            }
        }
    }

    fn name(&self) -> &str {
        "race"
    }

    fn is_async(&self) -> bool {
        self.links.iter().any(|link| link.is_async())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnLink, LambdaLink, LinkExt};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn delayed(name: &'static str, ms: u64, finished: Arc<AtomicBool>) -> SharedLink {
        LambdaLink::new(move |ctx: Context| {
            let finished = finished.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                finished.store(true, Ordering::SeqCst);
                Ok::<_, Error>(ctx.set(name, true).set("winner", name))
            }
        })
        .shared()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_link_wins_without_slow_artifacts() {
        let slow_done = Arc::new(AtomicBool::new(false));
        let contest = race(vec![
            delayed("fast", 50, Arc::new(AtomicBool::new(false))),
            delayed("slow", 200, slow_done.clone()),
        ]);

        let start = tokio::time::Instant::now();
        let out = contest.run(Context::new()).await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(out.get_as::<String>("winner").as_deref(), Some("fast"));
        assert!(!out.contains_key("slow"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!slow_done.load(Ordering::SeqCst), "loser should be dropped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_win() {
        let contest = race(vec![
            FnLink::new(|_ctx: Context| Err(Error::Link("instant failure".into()))).shared(),
            delayed("steady", 20, Arc::new(AtomicBool::new(false))),
        ]);
        let out = contest.run(Context::new()).await.unwrap();
        assert_eq!(out.get_as::<String>("winner").as_deref(), Some("steady"));
    }

    #[tokio::test]
    async fn test_all_failing_returns_error() {
        let contest = race(vec![
            FnLink::new(|_ctx: Context| Err(Error::Link("a".into()))).shared(),
            FnLink::new(|_ctx: Context| Err(Error::Link("b".into()))).shared(),
        ]);
        let err = contest.run(Context::new()).await.unwrap_err();
        assert!(matches!(err, Error::Link(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_error_ends_race() {
        let steady_done = Arc::new(AtomicBool::new(false));
        let contest = race(vec![
            FnLink::new(|_ctx: Context| Err(Error::Config("missing endpoint".into()))).shared(),
            delayed("steady", 20, steady_done.clone()),
        ]);

        let err = contest.run(Context::new()).await.unwrap_err();
        assert!(err.is_config());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!steady_done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_is_async_follows_contenders() {
        let sync_only = race(vec![
            FnLink::new(|ctx: Context| Ok(ctx)).shared(),
            FnLink::new(|ctx: Context| Ok(ctx)).shared(),
        ]);
        assert!(!sync_only.is_async());

        let mixed = race(vec![
            FnLink::new(|ctx: Context| Ok(ctx)).shared(),
            delayed("slow", 10, Arc::new(AtomicBool::new(false))),
        ]);
        assert!(mixed.is_async());
    }

    #[tokio::test]
    async fn test_empty_race_is_config_error() {
        let err = race(Vec::new()).run(Context::new()).await.unwrap_err();
        assert!(err.is_config());
    }
}
