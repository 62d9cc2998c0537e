//! Synchronous data reshaping links.
//!
//! [`Transform`] covers every link that only reshapes the context:
//! merging a computed patch, replacing the context, adding fixed data,
//! and narrowing with pick/omit.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{Context, Result};
use super::Link;

type ReshapeFn = Box<dyn Fn(Context) -> Context + Send + Sync>;

/// A link that applies a synchronous function to the context.
pub struct Transform {
    f: ReshapeFn,
    name: String,
}

impl Transform {
    /// Shallow-merge the patch computed by `f` into the context; patch keys win.
    ///
    /// # Example
    ///
    /// ```rust
    /// use link_chain::{Context, Link, Transform};
    /// use serde_json::{json, Map};
    ///
    /// # tokio_test::block_on(async {
    /// let full_name = Transform::merge(|ctx: &Context| {
    ///     let first = ctx.get_as::<String>("first").unwrap_or_default();
    ///     let last = ctx.get_as::<String>("last").unwrap_or_default();
    ///     let mut patch = Map::new();
    ///     patch.insert("name".into(), json!(format!("{first} {last}")));
    ///     patch
    /// });
    ///
    /// let ctx = Context::new().set("first", "Ada").set("last", "Lovelace");
    /// let out = full_name.run(ctx).await.unwrap();
    /// assert_eq!(out.get("name"), Some(&json!("Ada Lovelace")));
    /// # });
    /// ```
    pub fn merge<F>(f: F) -> Self
    where
        F: Fn(&Context) -> Map<String, Value> + Send + Sync + 'static,
    {
        Self {
            f: Box::new(move |ctx: Context| {
                let patch = f(&ctx);
                ctx.merge(patch)
            }),
            name: "transform".to_string(),
        }
    }

    /// Replace the context with whatever `f` returns.
    pub fn replace<F>(f: F) -> Self
    where
        F: Fn(Context) -> Context + Send + Sync + 'static,
    {
        Self {
            f: Box::new(f),
            name: "transform".to_string(),
        }
    }

    /// Set the debug name reported in `_currentLink`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Link for Transform {
    async fn run(&self, ctx: Context) -> Result<Context> {
        Ok((self.f)(ctx))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_async(&self) -> bool {
        false
    }
}

/// Shorthand for [`Transform::merge`].
pub fn transform<F>(f: F) -> Transform
where
    F: Fn(&Context) -> Map<String, Value> + Send + Sync + 'static,
{
    Transform::merge(f)
}

/// A link that merges a fixed map into the context; later keys win.
pub fn add_data(data: Map<String, Value>) -> Transform {
    Transform::merge(move |_| data.clone()).with_name("addData")
}

/// A link that keeps only `keys`, reserved fields included.
pub fn pick<I, S>(keys: I) -> Transform
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    Transform::replace(move |ctx| ctx.pick(keys.as_slice())).with_name("pick")
}

/// A link that drops `keys`, reserved fields included.
pub fn omit<I, S>(keys: I) -> Transform
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    Transform::replace(move |ctx| ctx.omit(keys.as_slice())).with_name("omit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Trigger;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_data_overwrites_existing_keys() {
        let mut data = Map::new();
        data.insert("source".into(), json!("api"));
        data.insert("version".into(), json!(2));

        let ctx = Context::new().set("version", 1).set("user", "ada");
        let out = add_data(data).run(ctx).await.unwrap();

        assert_eq!(out.get("version"), Some(&json!(2)));
        assert_eq!(out.get("source"), Some(&json!("api")));
        assert_eq!(out.get("user"), Some(&json!("ada")));
    }

    #[tokio::test]
    async fn test_pick_drops_unlisted_reserved_fields() {
        let ctx = Context::from_trigger(Trigger::http("GET", "/users"))
            .set("user", "ada")
            .set("token", "secret");
        let out = pick(["user"]).run(ctx).await.unwrap();

        assert!(out.trigger.is_none());
        assert!(out.timestamp.is_none());
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["user"]);
    }

    #[tokio::test]
    async fn test_omit_removes_listed_keys() {
        let ctx = Context::from_trigger(Trigger::http("GET", "/users"))
            .set("user", "ada")
            .set("token", "secret");
        let out = omit(vec!["token".to_string()]).run(ctx).await.unwrap();

        assert!(out.trigger.is_some());
        assert!(!out.contains_key("token"));
        assert!(out.contains_key("user"));
    }

    #[tokio::test]
    async fn test_replace_swaps_context() {
        let reset = Transform::replace(|_| Context::new().set("fresh", true));
        let out = reset.run(Context::new().set("stale", 1)).await.unwrap();
        assert!(!out.contains_key("stale"));
        assert_eq!(reset.name(), "transform");
    }
}
