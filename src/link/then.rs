//! Raw sequential link composition.

use async_trait::async_trait;

use crate::{Context, Result};
use super::Link;

/// Two links composed sequentially: the output of `A` feeds into `B`.
///
/// Unlike a [`Chain`](crate::Chain), no middleware runs between the two and
/// no telemetry is written. Constructed via
/// [`LinkExt::then`](crate::LinkExt::then).
pub struct Then<A, B> {
    first: A,
    second: B,
}

impl<A, B> Then<A, B> {
    /// Create a new composed link.
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<A, B> Link for Then<A, B>
where
    A: Link,
    B: Link,
{
    async fn run(&self, ctx: Context) -> Result<Context> {
        let intermediate = self.first.run(ctx).await?;
        self.second.run(intermediate).await
    }

    fn is_async(&self) -> bool {
        self.first.is_async() || self.second.is_async()
    }
}
