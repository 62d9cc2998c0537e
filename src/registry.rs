//! Application-level registry of named links.
//!
//! A [`Registry`] maps names to links and carries instance-wide middleware
//! that is attached to every chain it builds.

use std::collections::HashMap;
use std::sync::Arc;

use crate::link::{Link, Middleware, SharedLink};
use crate::{Chain, Error, Result};

/// A named collection of links and the middleware applied to chains built
/// from them.
///
/// # Example
///
/// ```rust
/// use link_chain::{Context, FnLink, Registry};
///
/// # tokio_test::block_on(async {
/// let mut registry = Registry::new();
/// registry
///     .register_link("load", FnLink::new(|ctx: Context| Ok(ctx.set("user", "ada"))))
///     .register_link("greet", FnLink::new(|ctx: Context| {
///         let user = ctx.get_as::<String>("user").unwrap_or_default();
///         Ok(ctx.set("greeting", format!("hello {user}")))
///     }));
///
/// let chain = registry.connect("load", "greet").unwrap();
/// let out = chain.execute(Context::new()).await.unwrap();
/// assert_eq!(out.get_as::<String>("greeting").as_deref(), Some("hello ada"));
/// # });
/// ```
#[derive(Default)]
pub struct Registry {
    links: HashMap<String, SharedLink>,
    middleware: Vec<Middleware>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `link` under `name`, replacing any previous registration.
    pub fn register_link<L: Link + 'static>(&mut self, name: impl Into<String>, link: L) -> &mut Self {
        let name = name.into();
        if self.links.insert(name.clone(), Arc::new(link)).is_some() {
            tracing::debug!(link = %name, "replaced registered link");
        }
        self
    }

    /// Look up a registered link.
    pub fn link(&self, name: &str) -> Option<SharedLink> {
        self.links.get(name).cloned()
    }

    /// Names of all registered links, sorted.
    pub fn link_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.links.keys().cloned().collect();
        names.sort();
        names
    }

    /// Add middleware applied to every chain this registry creates.
    pub fn use_middleware<M: Link + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Build a chain from `links`, with the registry's middleware attached.
    pub fn create_chain(&self, links: impl IntoIterator<Item = SharedLink>) -> Chain {
        self.middleware
            .iter()
            .cloned()
            .fold(Chain::new(links), |chain, mw| {
                chain.with_middleware(crate::Position::Global, mw)
            })
    }

    /// Build a chain from registered link names, in order.
    ///
    /// Unknown names are a configuration error.
    pub fn create_chain_from_links<S: AsRef<str>>(&self, names: &[S]) -> Result<Chain> {
        let links = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.link(name)
                    .ok_or_else(|| Error::Config(format!("no link registered as '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.create_chain(links))
    }

    /// Build a two-link chain from registered names.
    pub fn connect(&self, from: &str, to: &str) -> Result<Chain> {
        self.create_chain_from_links(&[from, to])
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("links", &self.link_names())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tap, Context, FnLink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_link(key: &'static str) -> FnLink<impl Fn(Context) -> Result<Context> + Send + Sync + 'static> {
        FnLink::new(move |ctx: Context| {
            let n = ctx.get_as::<i64>(key).unwrap_or(0);
            Ok(ctx.set(key, n + 1))
        })
    }

    #[tokio::test]
    async fn test_chain_from_names_runs_in_order() {
        let mut registry = Registry::new();
        registry
            .register_link("a", counter_link("a").with_name("a"))
            .register_link("b", counter_link("b").with_name("b"));

        let chain = registry.create_chain_from_links(&["b", "a", "b"]).unwrap();
        assert_eq!(chain.link_names(), vec!["b", "a", "b"]);

        let out = chain.execute(Context::new()).await.unwrap();
        assert_eq!(out.get_as::<i64>("a"), Some(1));
        assert_eq!(out.get_as::<i64>("b"), Some(2));
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let registry = Registry::new();
        let err = registry.connect("missing", "also-missing").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_instance_middleware_applies_to_every_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut registry = Registry::new();
        registry
            .register_link("a", counter_link("a"))
            .use_middleware(tap(move |_ctx: &Context| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));

        let first = registry.create_chain_from_links(&["a"]).unwrap();
        let second = registry.create_chain(vec![registry.link("a").unwrap()]);
        assert_eq!(first.middleware_counts().global, 1);

        first.execute(Context::new()).await.unwrap();
        second.execute(Context::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
