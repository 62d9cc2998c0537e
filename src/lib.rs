//! # link-chain
//!
//! Composable async link chains with positioned middleware.
//!
//! A chain threads a [`Context`] through an ordered list of links. Each link
//! is wrapped by input and output middleware, and the whole run is wrapped by
//! global middleware. Failures are carried as data in the context's `error`
//! field, so a chain always hands a context back to its caller.
//!
//! ## Core Concepts
//!
//! - **Context**: Value-typed data carrier with reserved telemetry fields
//! - **Link**: The fundamental trait for async business-logic steps
//! - **Chain**: Ordered links plus input/output/global middleware
//! - **Combinators**: `when`, `validate`, `retry`, `transform`, `parallel`,
//!   `race`, `error_handler`, `add_data`, `pick`, `omit`, `tap`, `timed`
//! - **Registry**: Named links and instance-wide middleware
//! - **Trigger**: The event source that produced a context
//!
//! ## Example: Chain with Middleware
//!
//! ```rust
//! use link_chain::{chain, error_handler, Context, Error, ErrorRecord, FnLink};
//!
//! # tokio_test::block_on(async {
//! let load = FnLink::new(|ctx: Context| Ok(ctx.set("user", "ada"))).with_name("load");
//! let charge = FnLink::new(|_ctx: Context| Err(Error::Link("card declined".into())))
//!     .with_name("charge");
//!
//! let checkout = chain![load, charge].use_middleware(error_handler(
//!     |err: ErrorRecord, ctx: Context| ctx.without_error().set("notice", err.message),
//! ));
//!
//! let out = checkout.execute(Context::new()).await.unwrap();
//! assert!(!out.is_failed());
//! assert_eq!(out.get_as::<String>("notice").as_deref(), Some("card declined"));
//! # });
//! ```

pub mod chain;
pub mod context;
pub mod error;
pub mod link;
pub mod metrics;
pub mod registry;
pub mod trigger;

pub use chain::{Chain, DebugInfo, Position};
pub use context::{Context, CurrentLink, RetryInfo};
pub use error::{Error, ErrorRecord, Result};
pub use metrics::{ChainMetadata, ChainStats, MiddlewareCounts, PerformanceMetrics};
pub use registry::Registry;
pub use trigger::Trigger;

// Re-export link types
pub use link::{FnLink, LambdaLink, Link, LinkExt, Middleware, Named, SharedLink};
pub use link::{
    add_data, error_handler, omit, parallel, pick, race, retry, tap, timed, transform, validate,
    when,
};
pub use link::{
    ErrorHandler, Parallel, Race, Retry, RetryConfig, Tap, Then, Timed, Transform, Validate,
    Verdict, When,
};
