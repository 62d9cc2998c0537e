//! Recovering from recorded failures.

use async_trait::async_trait;

use crate::error::ErrorRecord;
use crate::{Context, Result};
use super::Link;

/// A link that hands failed contexts to a recovery function.
///
/// If the context carries an `error`, the handler receives the record and the
/// context and returns the recovered context; clearing `error` is up to the
/// handler. Contexts without an error pass through unchanged. Register it with
/// [`Chain::use_middleware`](crate::Chain::use_middleware) so it runs after a
/// short-circuited chain.
///
/// # Example
///
/// ```rust
/// use link_chain::{error_handler, Context, ErrorRecord, Link};
///
/// # tokio_test::block_on(async {
/// let recover = error_handler(|err: ErrorRecord, ctx: Context| {
///     ctx.without_error().set("fallback", err.message)
/// });
///
/// let failed = Context::new().with_error(ErrorRecord::new("db down"));
/// let out = recover.run(failed).await.unwrap();
/// assert!(!out.is_failed());
/// assert_eq!(out.get_as::<String>("fallback").as_deref(), Some("db down"));
/// # });
/// ```
pub struct ErrorHandler<F> {
    handler: F,
}

impl<F> ErrorHandler<F>
where
    F: Fn(ErrorRecord, Context) -> Context + Send + Sync + 'static,
{
    /// Create a new error handling link.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

/// Shorthand for [`ErrorHandler::new`].
pub fn error_handler<F>(handler: F) -> ErrorHandler<F>
where
    F: Fn(ErrorRecord, Context) -> Context + Send + Sync + 'static,
{
    ErrorHandler::new(handler)
}

#[async_trait]
impl<F> Link for ErrorHandler<F>
where
    F: Fn(ErrorRecord, Context) -> Context + Send + Sync + 'static,
{
    async fn run(&self, ctx: Context) -> Result<Context> {
        match ctx.error.clone() {
            Some(record) => {
                tracing::debug!(error = %record, "handling recorded failure");
                Ok((self.handler)(record, ctx))
            }
            None => Ok(ctx),
        }
    }

    fn name(&self) -> &str {
        "errorHandler"
    }

    fn is_async(&self) -> bool {
        false
    }
}
