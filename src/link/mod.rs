//! Core link trait and fundamental link types.
//!
//! This module defines the [`Link`] trait, the unit of business logic in a
//! chain, along with [`LambdaLink`] and [`FnLink`] for closure-based links
//! and [`LinkExt`] for fluent composition. Middleware is any [`Link`]
//! registered at a position of a [`Chain`](crate::Chain).

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::{Context, Result};

pub mod error_handler;
pub mod parallel;
pub mod race;
pub mod retry;
pub mod tap;
pub mod then;
pub mod timed;
pub mod transform;
pub mod validate;
pub mod when;

/// A type-erased link that can be shared between chains.
pub type SharedLink = Arc<dyn Link>;

/// Middleware has the same shape as a link; only its position differs.
pub type Middleware = SharedLink;

/// The fundamental trait for composable, async chain links.
///
/// A link consumes a [`Context`] and produces the next one. Returning an
/// error fails the link; the enclosing chain records it into the context's
/// `error` field.
///
/// # Example
///
/// ```rust
/// use link_chain::{Context, Link, LambdaLink};
///
/// # tokio_test::block_on(async {
/// let greet = LambdaLink::new(|ctx: Context| async move {
///     Ok::<_, link_chain::Error>(ctx.set("greeting", "hello"))
/// });
///
/// let out = greet.run(Context::new()).await.unwrap();
/// assert_eq!(out.get_as::<String>("greeting").as_deref(), Some("hello"));
/// # });
/// ```
#[async_trait]
pub trait Link: Send + Sync {
    /// Execute this link against the given context.
    async fn run(&self, ctx: Context) -> Result<Context>;

    /// Returns a human-readable name for this link.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Whether the link suspends; synchronous closures report `false`.
    fn is_async(&self) -> bool {
        true
    }
}

#[async_trait]
impl<L: Link + ?Sized> Link for Arc<L> {
    async fn run(&self, ctx: Context) -> Result<Context> {
        (**self).run(ctx).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_async(&self) -> bool {
        (**self).is_async()
    }
}

#[async_trait]
impl<L: Link + ?Sized> Link for Box<L> {
    async fn run(&self, ctx: Context) -> Result<Context> {
        (**self).run(ctx).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_async(&self) -> bool {
        (**self).is_async()
    }
}

/// A link constructed from an async closure.
///
/// # Example
///
/// ```rust
/// use link_chain::{Context, LambdaLink, Link};
///
/// let link = LambdaLink::new(|ctx: Context| async move {
///     Ok::<_, link_chain::Error>(ctx.set("seen", true))
/// })
/// .with_name("mark-seen");
/// assert_eq!(link.name(), "mark-seen");
/// ```
pub struct LambdaLink<F> {
    f: F,
    name: String,
}

impl<F, Fut> LambdaLink<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Context>> + Send + 'static,
{
    /// Create a new `LambdaLink` from the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "anonymous".to_string(),
        }
    }

    /// Set the debug name reported in `_currentLink`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F, Fut> Link for LambdaLink<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Context>> + Send + 'static,
{
    async fn run(&self, ctx: Context) -> Result<Context> {
        (self.f)(ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A link constructed from a synchronous closure.
pub struct FnLink<F> {
    f: F,
    name: String,
}

impl<F> FnLink<F>
where
    F: Fn(Context) -> Result<Context> + Send + Sync + 'static,
{
    /// Create a new `FnLink` from the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "anonymous".to_string(),
        }
    }

    /// Set the debug name reported in `_currentLink`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F> Link for FnLink<F>
where
    F: Fn(Context) -> Result<Context> + Send + Sync + 'static,
{
    async fn run(&self, ctx: Context) -> Result<Context> {
        (self.f)(ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_async(&self) -> bool {
        false
    }
}

/// Wraps a link with a different debug name.
///
/// Constructed via [`LinkExt::named`].
pub struct Named<L> {
    inner: L,
    name: String,
}

#[async_trait]
impl<L: Link> Link for Named<L> {
    async fn run(&self, ctx: Context) -> Result<Context> {
        self.inner.run(ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_async(&self) -> bool {
        self.inner.is_async()
    }
}

/// Extension trait providing fluent composition methods for all [`Link`] implementors.
///
/// This trait is automatically implemented for every type that implements [`Link`].
pub trait LinkExt: Link + Sized {
    /// Give this link a debug name.
    fn named(self, name: impl Into<String>) -> Named<Self> {
        Named {
            inner: self,
            name: name.into(),
        }
    }

    /// Run `next` on this link's output, without any middleware in between.
    ///
    /// # Example
    ///
    /// ```rust
    /// use link_chain::{Context, FnLink, Link, LinkExt};
    ///
    /// # tokio_test::block_on(async {
    /// let add1 = FnLink::new(|ctx: Context| {
    ///     let v = ctx.get_as::<i64>("value").unwrap_or(0);
    ///     Ok(ctx.set("value", v + 1))
    /// });
    /// let double = FnLink::new(|ctx: Context| {
    ///     let v = ctx.get_as::<i64>("value").unwrap_or(0);
    ///     Ok(ctx.set("value", v * 2))
    /// });
    ///
    /// let out = add1.then(double).run(Context::new().set("value", 5)).await.unwrap();
    /// assert_eq!(out.get_as::<i64>("value"), Some(12));
    /// # });
    /// ```
    fn then<N: Link>(self, next: N) -> then::Then<Self, N> {
        then::Then::new(self, next)
    }

    /// Only run this link when `predicate` holds.
    fn when<P>(self, predicate: P) -> when::When<P, Self>
    where
        P: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        when::When::new(predicate, self)
    }

    /// Guard this link with a validator.
    fn validate<V, R>(self, validator: V) -> validate::Validate<Self>
    where
        V: Fn(&Context) -> R + Send + Sync + 'static,
        R: Into<validate::Verdict>,
    {
        validate::Validate::new(validator, self)
    }

    /// Retry this link up to `max_retries` attempts with a fixed delay.
    fn retry(self, max_retries: u32, delay: std::time::Duration) -> retry::Retry<Self> {
        retry::Retry::new(self, max_retries, delay)
    }

    /// Record this link's duration into `timings[name]`.
    fn timed(self, name: impl Into<String>) -> timed::Timed<Self> {
        timed::Timed::new(name, self)
    }

    /// Erase the concrete link type behind an [`Arc`].
    fn shared(self) -> SharedLink
    where
        Self: 'static,
    {
        Arc::new(self)
    }
}

impl<T: Link + Sized> LinkExt for T {}

pub use error_handler::{error_handler, ErrorHandler};
pub use parallel::{parallel, Parallel};
pub use race::{race, Race};
pub use retry::{retry, Retry, RetryConfig};
pub use tap::{tap, Tap};
pub use then::Then;
pub use timed::{timed, Timed};
pub use transform::{add_data, omit, pick, transform, Transform};
pub use validate::{validate, Validate, Verdict};
pub use when::{when, When};
