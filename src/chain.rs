//! The chain execution engine.
//!
//! A [`Chain`] runs an ordered list of links against a context, wrapping each
//! link with its positioned middleware:
//!
//! 1. global middleware registered with [`Chain::use_before`], once;
//! 2. for every link: `_currentLink` is updated, input middleware runs, the
//!    link runs, output middleware runs;
//! 3. global middleware registered with [`Chain::use_middleware`], once,
//!    after the last link or after a failure cut the chain short.
//!
//! Failures are data. A failing link or middleware has its error recorded
//! into `ctx.error` and the remaining links are skipped, but
//! [`Chain::execute`] still returns `Ok`. Only [`Error::Config`] is returned
//! as `Err`.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::context::CurrentLink;
use crate::link::{Link, Middleware, SharedLink};
use crate::metrics::{ChainMetadata, ChainStats, MiddlewareCounts, PerformanceMetrics};
use crate::{Context, Error, Result};

/// Where a middleware is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Immediately before every link.
    Input,
    /// Immediately after every successful link.
    Output,
    /// Once per invocation, after all links.
    Global,
}

/// Read-only diagnostic view of a chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    /// See [`Chain::id`].
    pub chain_id: String,
    pub name: String,
    pub link_count: usize,
    /// Link names in execution order.
    pub link_names: Vec<String>,
    pub middleware_counts: MiddlewareCounts,
    /// Statistics aggregated over every invocation so far.
    pub performance: ChainStats,
}

/// An ordered composition of links plus its middleware configuration.
///
/// Configuration methods take the chain by value, so once a chain is shared
/// and executed through `&self` its configuration can no longer change.
/// Clones share the link sequence and the aggregated statistics.
///
/// # Example
///
/// ```rust
/// use link_chain::{chain, Context, FnLink, tap};
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
/// let pipeline = chain![add1, double]
///     .with_name("arithmetic")
///     .on_output(tap(|ctx: &Context| println!("{:?}", ctx.get("value"))));
///
/// let out = pipeline.execute(Context::new().set("value", 5)).await.unwrap();
/// assert_eq!(out.get_as::<i64>("value"), Some(12));
/// assert_eq!(out.metadata.unwrap().performance.output_middleware_timings.len(), 2);
/// # });
/// ```
#[derive(Clone)]
pub struct Chain {
    id: String,
    name: String,
    links: Arc<[SharedLink]>,
    input: Vec<Middleware>,
    output: Vec<Middleware>,
    before: Vec<Middleware>,
    after: Vec<Middleware>,
    stats: Arc<Mutex<ChainStats>>,
}

enum Outcome {
    Continue(Context),
    Failed(Context),
}

impl Outcome {
    fn into_context(self) -> Context {
        match self {
            Outcome::Continue(ctx) | Outcome::Failed(ctx) => ctx,
        }
    }
}

impl Chain {
    /// Create a chain over `links` with no middleware.
    pub fn new(links: impl IntoIterator<Item = SharedLink>) -> Self {
        Self::from_shared(links.into_iter().collect(), "chain")
    }

    fn from_shared(links: Arc<[SharedLink]>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            links,
            input: Vec::new(),
            output: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            stats: Arc::new(Mutex::new(ChainStats::default())),
        }
    }

    /// Set a human-readable name for this chain.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append global middleware that runs once after the links.
    pub fn use_middleware<M: Link + 'static>(self, middleware: M) -> Self {
        self.with_middleware(Position::Global, Arc::new(middleware))
    }

    /// Append global middleware that runs once before the first link.
    pub fn use_before<M: Link + 'static>(mut self, middleware: M) -> Self {
        self.before.push(Arc::new(middleware));
        self
    }

    /// Append middleware that runs before every link.
    pub fn on_input<M: Link + 'static>(self, middleware: M) -> Self {
        self.with_middleware(Position::Input, Arc::new(middleware))
    }

    /// Append middleware that runs after every successful link.
    pub fn on_output<M: Link + 'static>(self, middleware: M) -> Self {
        self.with_middleware(Position::Output, Arc::new(middleware))
    }

    /// Append already-shared middleware at `position`.
    pub fn with_middleware(mut self, position: Position, middleware: Middleware) -> Self {
        match position {
            Position::Input => self.input.push(middleware),
            Position::Output => self.output.push(middleware),
            Position::Global => self.after.push(middleware),
        }
        self
    }

    /// Unique id of this chain, a v4 UUID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain has no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Debug names of the links, in execution order.
    pub fn link_names(&self) -> Vec<String> {
        self.links.iter().map(|l| l.name().to_string()).collect()
    }

    /// Registered middleware per position; before and after phases both
    /// count as global.
    pub fn middleware_counts(&self) -> MiddlewareCounts {
        MiddlewareCounts {
            input: self.input.len(),
            output: self.output.len(),
            global: self.before.len() + self.after.len(),
        }
    }

    /// The same link sequence with no middleware and fresh statistics.
    ///
    /// Embed this in a larger chain to reuse the business logic without
    /// dragging this chain's middleware along.
    pub fn core_execution(&self) -> Chain {
        Self::from_shared(self.links.clone(), format!("{}:core", self.name))
    }

    /// Snapshot of the aggregated statistics.
    pub fn stats(&self) -> ChainStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read-only diagnostic view: links, middleware counts, and statistics.
    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            chain_id: self.id.clone(),
            name: self.name.clone(),
            link_count: self.links.len(),
            link_names: self.link_names(),
            middleware_counts: self.middleware_counts(),
            performance: self.stats(),
        }
    }

    /// Run the chain against `ctx`.
    ///
    /// Returns `Ok` with the final context, whose `error` field is set if a
    /// link or middleware failed. Returns `Err` only for configuration errors.
    pub async fn execute(&self, ctx: Context) -> Result<Context> {
        let started = Instant::now();
        let counts = self.middleware_counts();
        let entry_link = ctx.current_link.clone();
        let mut perf = PerformanceMetrics::default();
        let mut ctx = ctx;

        let opened = (counts.total() > 0).then(|| {
            ChainMetadata::start(&self.id, &self.name, self.links.len(), counts)
        });
        if let Some(meta) = &opened {
            ctx.metadata = Some(meta.clone());
        }

        debug!(chain = %self.name, links = self.links.len(), "chain started");

        let mut failed = false;
        for mw in self.before.iter() {
            match invoke(mw, ctx, Some(&mut perf.global_middleware_timings)).await? {
                Outcome::Continue(next) => ctx = next,
                Outcome::Failed(next) => {
                    ctx = next;
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            ctx = self.run_links(ctx, &mut perf).await?;
        }

        for mw in self.after.iter() {
            ctx = invoke(mw, ctx, Some(&mut perf.global_middleware_timings))
                .await?
                .into_context();
        }

        ctx.current_link = entry_link;

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(meta) = opened {
            ctx.metadata = Some(meta.finish(duration_ms, perf.clone()));
        }

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_run(duration_ms, &perf, ctx.error.as_ref().map(|e| e.message.as_str()));

        debug!(
            chain = %self.name,
            duration_ms,
            failed = ctx.is_failed(),
            "chain finished"
        );
        Ok(ctx)
    }

    async fn run_links(&self, mut ctx: Context, perf: &mut PerformanceMetrics) -> Result<Context> {
        let length = self.links.len();

        for (index, link) in self.links.iter().enumerate() {
            ctx.current_link = Some(CurrentLink {
                name: link.name().to_string(),
                index,
                length,
                is_async: link.is_async(),
            });
            trace!(chain = %self.name, link = link.name(), index, "running link");

            for mw in self.input.iter() {
                match invoke(mw, ctx, Some(&mut perf.input_middleware_timings)).await? {
                    Outcome::Continue(next) => ctx = next,
                    Outcome::Failed(next) => return Ok(next),
                }
            }

            match invoke(link, ctx, None).await? {
                Outcome::Continue(next) => ctx = next,
                Outcome::Failed(next) => return Ok(next),
            }

            for mw in self.output.iter() {
                match invoke(mw, ctx, Some(&mut perf.output_middleware_timings)).await? {
                    Outcome::Continue(next) => ctx = next,
                    Outcome::Failed(next) => return Ok(next),
                }
            }
        }

        Ok(ctx)
    }
}

/// Run one link or middleware, recording its duration into `timings` and
/// turning any non-configuration failure into an error-bearing context.
async fn invoke(
    link: &SharedLink,
    ctx: Context,
    timings: Option<&mut Vec<f64>>,
) -> Result<Outcome> {
    let fallback = ctx.clone();
    let start = Instant::now();
    let result = link.run(ctx).await;
    if let Some(timings) = timings {
        timings.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    match result {
        Ok(next) => Ok(Outcome::Continue(next)),
        Err(err) if err.is_config() => Err(err),
        Err(Error::Recorded { record, context }) => {
            warn!(link = link.name(), error = %record, "nested chain failed");
            let mut failed = *context;
            failed.metadata = fallback.metadata;
            failed.current_link = fallback.current_link;
            Ok(Outcome::Failed(failed.with_error(record)))
        }
        Err(err) => {
            warn!(link = link.name(), error = %err, "link failed");
            Ok(Outcome::Failed(fallback.record_failure(&err)))
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("links", &self.link_names())
            .field("middleware", &self.middleware_counts())
            .finish()
    }
}

/// A chain embedded as a link.
///
/// The outer context's `_metadata` is kept, so the inner chain's telemetry
/// does not leak outwards. If the inner chain ends with an error the input did
/// not already carry, the embedded chain fails with [`Error::Recorded`], which
/// hands the inner context back so the enclosing chain records onto it.
#[async_trait]
impl Link for Chain {
    async fn run(&self, ctx: Context) -> Result<Context> {
        let outer_metadata = ctx.metadata.clone();
        let had_error = ctx.is_failed();

        let mut out = self.execute(ctx).await?;
        out.metadata = outer_metadata;
        if !had_error {
            if let Some(record) = out.error.clone() {
                return Err(Error::Recorded {
                    record,
                    context: Box::new(out),
                });
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a [`Chain`] from a list of links of any type.
///
/// ```rust
/// use link_chain::{chain, Context, FnLink};
///
/// let pipeline = chain![
///     FnLink::new(|ctx: Context| Ok(ctx.set("a", 1))).with_name("a"),
///     FnLink::new(|ctx: Context| Ok(ctx.set("b", 2))).with_name("b"),
/// ];
/// assert_eq!(pipeline.link_names(), vec!["a", "b"]);
/// ```
#[macro_export]
macro_rules! chain {
    ($($link:expr),* $(,)?) => {
        $crate::Chain::new(::std::vec![$($crate::LinkExt::shared($link)),*])
    };
}
