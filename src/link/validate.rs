//! Guarding a link with a validator.

use async_trait::async_trait;

use crate::{Context, Error, Result};
use super::Link;

/// Message used when a validator rejects without saying why.
pub const DEFAULT_VALIDATION_MESSAGE: &str = "Validation failed";

/// The answer a validator gives about a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// Rejected without a reason.
    Invalid,
    /// Rejected with a reason, used as the failure message.
    Rejected(String),
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok {
            Verdict::Valid
        } else {
            Verdict::Invalid
        }
    }
}

impl From<String> for Verdict {
    fn from(reason: String) -> Self {
        Verdict::Rejected(reason)
    }
}

impl From<&str> for Verdict {
    fn from(reason: &str) -> Self {
        Verdict::Rejected(reason.to_string())
    }
}

impl<E: Into<String>> From<std::result::Result<(), E>> for Verdict {
    fn from(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => Verdict::Valid,
            Err(reason) => Verdict::Rejected(reason.into()),
        }
    }
}

/// A link that runs `link` only if `validator` accepts the context.
///
/// A rejection fails the link with [`Error::Validation`].
///
/// # Example
///
/// ```rust
/// use link_chain::{validate, Context, Error, FnLink, Link};
///
/// # tokio_test::block_on(async {
/// let checkout = validate(
///     |ctx: &Context| {
///         if ctx.contains_key("cart") { Ok(()) } else { Err("cart is required") }
///     },
///     FnLink::new(|ctx: Context| Ok(ctx.set("paid", true))),
/// );
///
/// let err = checkout.run(Context::new()).await.unwrap_err();
/// assert!(matches!(err, Error::Validation(ref m) if m == "cart is required"));
/// # });
/// ```
pub struct Validate<L> {
    validator: Box<dyn Fn(&Context) -> Verdict + Send + Sync>,
    link: L,
}

impl<L> Validate<L> {
    /// Create a new validated link.
    pub fn new<V, R>(validator: V, link: L) -> Self
    where
        V: Fn(&Context) -> R + Send + Sync + 'static,
        R: Into<Verdict>,
    {
        Self {
            validator: Box::new(move |ctx: &Context| -> Verdict { validator(ctx).into() }),
            link,
        }
    }
}

/// Shorthand for [`Validate::new`].
pub fn validate<V, R, L>(validator: V, link: L) -> Validate<L>
where
    V: Fn(&Context) -> R + Send + Sync + 'static,
    R: Into<Verdict>,
    L: Link,
{
    Validate::new(validator, link)
}

#[async_trait]
impl<L: Link> Link for Validate<L> {
    async fn run(&self, ctx: Context) -> Result<Context> {
        match (self.validator)(&ctx) {
            Verdict::Valid => self.link.run(ctx).await,
            Verdict::Invalid => Err(Error::Validation(DEFAULT_VALIDATION_MESSAGE.to_string())),
            Verdict::Rejected(reason) => Err(Error::Validation(reason)),
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

    fn passthrough() -> FnLink<impl Fn(Context) -> Result<Context> + Send + Sync + 'static> {
        FnLink::new(|ctx: Context| Ok(ctx.set("ran", true)))
    }

    #[tokio::test]
    async fn test_true_runs_link() {
        let out = validate(|_: &Context| true, passthrough())
            .run(Context::new())
            .await
            .unwrap();
        assert_eq!(out.get_as::<bool>("ran"), Some(true));
    }

    #[tokio::test]
    async fn test_false_uses_generic_message() {
        let err = validate(|_: &Context| false, passthrough())
            .run(Context::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_VALIDATION_MESSAGE);
        assert_eq!(err.name(), "ValidationError");
    }

    #[tokio::test]
    async fn test_string_becomes_message() {
        let err = validate(|_: &Context| "age must be positive", passthrough())
            .run(Context::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "age must be positive");
    }
}
