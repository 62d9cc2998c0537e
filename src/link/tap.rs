//! Tap link for side-effect inspection.

use async_trait::async_trait;

use crate::{Context, Result};
use super::Link;

/// A link that runs a side-effect closure on the context without modifying it.
///
/// Useful for logging, metrics, or debugging between links; as middleware it
/// observes every link's input or output.
pub struct Tap<F> {
    f: F,
}

impl<F> Tap<F>
where
    F: Fn(&Context) + Send + Sync + 'static,
{
    /// Create a new tap link.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

/// Shorthand for [`Tap::new`].
pub fn tap<F>(f: F) -> Tap<F>
where
    F: Fn(&Context) + Send + Sync + 'static,
{
    Tap::new(f)
}

#[async_trait]
impl<F> Link for Tap<F>
where
    F: Fn(&Context) + Send + Sync + 'static,
{
    async fn run(&self, ctx: Context) -> Result<Context> {
        (self.f)(&ctx);
        Ok(ctx)
    }

    fn name(&self) -> &str {
        "tap"
    }

    fn is_async(&self) -> bool {
        false
    }
}
