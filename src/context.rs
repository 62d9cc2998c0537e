//! The data carrier threaded through every link of a chain.
//!
//! A [`Context`] is an open, string-keyed JSON map plus a fixed set of
//! reserved, optional fields (`trigger`, `timestamp`, `_metadata`,
//! `_currentLink`, `error`, `cached`, `retryInfo`, `timings`).
//!
//! Contexts are values. Links take them by value and hand back a new one, so
//! a link can never change what its caller sees. The data map sits behind an
//! [`Arc`] and is copied only when a context that shares it is written to.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, ErrorRecord, Result};
use crate::metrics::{now_millis, ChainMetadata};
use crate::trigger::Trigger;

/// Wire names of the reserved context fields.
pub const RESERVED_KEYS: [&str; 8] = [
    "trigger",
    "timestamp",
    "_metadata",
    "_currentLink",
    "error",
    "cached",
    "retryInfo",
    "timings",
];

/// Position of the link a chain is currently executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentLink {
    pub name: String,
    /// Zero-based index within the chain.
    pub index: usize,
    /// Number of links in the chain.
    pub length: usize,
    pub is_async: bool,
}

/// Outcome of a [`Retry`](crate::Retry) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryInfo {
    pub attempts: u32,
    pub successful: bool,
    pub max_retries: u32,
}

/// Data passed through every link and middleware of a chain.
///
/// # Example
///
/// ```rust
/// use link_chain::Context;
/// use serde_json::json;
///
/// let ctx = Context::new().set("value", 5);
/// let next = ctx.clone().set("value", 6);
///
/// assert_eq!(ctx.get("value"), Some(&json!(5)));
/// assert_eq!(next.get_as::<i64>("value"), Some(6));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    /// Creation time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChainMetadata>,
    #[serde(rename = "_currentLink", default, skip_serializing_if = "Option::is_none")]
    pub current_link: Option<CurrentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(rename = "retryInfo", default, skip_serializing_if = "Option::is_none")]
    pub retry_info: Option<RetryInfo>,
    /// Named duration measurements in milliseconds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timings: BTreeMap<String, f64>,
    #[serde(flatten)]
    data: Arc<Map<String, Value>>,
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context for the given trigger, stamped with the current time.
    #[must_use]
    pub fn from_trigger(trigger: Trigger) -> Self {
        Self {
            trigger: Some(trigger),
            timestamp: Some(now_millis()),
            ..Self::default()
        }
    }

    /// Build a context from a JSON object, reading reserved fields by wire name.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Render the context as a JSON object.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Look up a data value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Look up a data value and deserialize it, returning `None` when the key
    /// is missing or has a different shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| T::deserialize(v).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Return a context with `key` set to `value`.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a data value in place, returning the previous one.
    ///
    /// Reserved names belong to the typed fields and are refused.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        if is_reserved(&key) {
            tracing::warn!(key = %key, "refusing to store reserved key as context data");
            return None;
        }
        Arc::make_mut(&mut self.data).insert(key, value.into())
    }

    /// Remove a data value in place.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if !self.data.contains_key(key) {
            return None;
        }
        Arc::make_mut(&mut self.data).remove(key)
    }

    /// Shallow-merge `patch` into the data map; patch keys win.
    #[must_use]
    pub fn merge(mut self, patch: Map<String, Value>) -> Self {
        for (key, value) in patch {
            self.insert(key, value);
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// The open data map, without reserved fields.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Return a context carrying the given failure.
    #[must_use]
    pub fn with_error(mut self, error: ErrorRecord) -> Self {
        self.error = Some(error);
        self
    }

    /// Return a context with any failure cleared.
    #[must_use]
    pub fn without_error(mut self) -> Self {
        self.error = None;
        self
    }

    /// Whether a failure has been recorded.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Record a link failure, including retry bookkeeping when present.
    #[must_use]
    pub fn record_failure(mut self, err: &Error) -> Self {
        if let Error::RetryExhausted {
            attempts,
            max_retries,
            ..
        } = err
        {
            self.retry_info = Some(RetryInfo {
                attempts: *attempts,
                successful: false,
                max_retries: *max_retries,
            });
        }
        self.with_error(err.to_record())
    }

    /// Keep only the listed keys. Reserved fields are filtered by wire name
    /// like any other key.
    #[must_use]
    pub fn pick<S: AsRef<str>>(self, keys: &[S]) -> Self {
        let keep = |name: &str| keys.iter().any(|k| k.as_ref() == name);
        self.filter(keep)
    }

    /// Drop the listed keys, reserved fields included.
    #[must_use]
    pub fn omit<S: AsRef<str>>(self, keys: &[S]) -> Self {
        let keep = |name: &str| keys.iter().all(|k| k.as_ref() != name);
        self.filter(keep)
    }

    fn filter(mut self, keep: impl Fn(&str) -> bool) -> Self {
        if !keep("trigger") {
            self.trigger = None;
        }
        if !keep("timestamp") {
            self.timestamp = None;
        }
        if !keep("_metadata") {
            self.metadata = None;
        }
        if !keep("_currentLink") {
            self.current_link = None;
        }
        if !keep("error") {
            self.error = None;
        }
        if !keep("cached") {
            self.cached = None;
        }
        if !keep("retryInfo") {
            self.retry_info = None;
        }
        if !keep("timings") {
            self.timings.clear();
        }
        if self.data.keys().any(|k| !keep(k)) {
            Arc::make_mut(&mut self.data).retain(|k, _| keep(k));
        }
        self
    }

    /// Apply every field of `changed` that differs from `base` onto `self`.
    ///
    /// Keys removed in `changed` are left alone.
    pub(crate) fn apply_changes(&mut self, base: &Context, changed: &Context) {
        macro_rules! take_if_changed {
            ($($field:ident),*) => {
                $(
                    if changed.$field != base.$field {
                        self.$field = changed.$field.clone();
                    }
                )*
            };
        }
        take_if_changed!(trigger, timestamp, metadata, current_link, error, cached, retry_info);

        for (name, ms) in &changed.timings {
            if base.timings.get(name) != Some(ms) {
                self.timings.insert(name.clone(), *ms);
            }
        }

        if Arc::ptr_eq(&changed.data, &base.data) {
            return;
        }
        for (key, value) in changed.data.iter() {
            if base.data.get(key) != Some(value) {
                Arc::make_mut(&mut self.data).insert(key.clone(), value.clone());
            }
        }
    }
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_does_not_touch_original() {
        let original = Context::new().set("a", 1);
        let updated = original.clone().set("a", 2).set("b", true);

        assert_eq!(original.get("a"), Some(&json!(1)));
        assert!(!original.contains_key("b"));
        assert_eq!(updated.get_as::<i64>("a"), Some(2));
    }

    #[test]
    fn test_clone_shares_data_until_written() {
        let original = Context::new().set("a", 1);
        let copy = original.clone();
        assert!(Arc::ptr_eq(&original.data, &copy.data));

        let written = copy.set("a", 3);
        assert!(!Arc::ptr_eq(&original.data, &written.data));
    }

    #[test]
    fn test_reserved_keys_are_not_data() {
        let mut ctx = Context::new();
        assert!(ctx.insert("error", "nope").is_none());
        assert!(!ctx.contains_key("error"));
        assert!(ctx.error.is_none());
    }

    #[test]
    fn test_json_round_trip_uses_wire_names() {
        let value = json!({
            "user": "ada",
            "timestamp": 42,
            "retryInfo": {"attempts": 2, "successful": true, "maxRetries": 3},
            "error": {"message": "boom", "name": "Error"}
        });
        let ctx = Context::from_value(value.clone()).unwrap();

        assert_eq!(ctx.timestamp, Some(42));
        assert_eq!(ctx.retry_info.map(|r| r.attempts), Some(2));
        assert_eq!(ctx.error.as_ref().map(|e| e.message.as_str()), Some("boom"));
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["user"]);
        assert_eq!(ctx.to_value().unwrap(), value);
    }

    #[test]
    fn test_pick_filters_reserved_fields() {
        let ctx = Context::from_trigger(Trigger::custom("job"))
            .set("a", 1)
            .set("b", 2);
        let picked = ctx.pick(&["a", "trigger"]);

        assert!(picked.trigger.is_some());
        assert!(picked.timestamp.is_none());
        assert_eq!(picked.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_omit_drops_reserved_fields() {
        let ctx = Context::from_trigger(Trigger::custom("job")).set("a", 1).set("b", 2);
        let omitted = ctx.omit(&["b", "timestamp"]);

        assert!(omitted.trigger.is_some());
        assert!(omitted.timestamp.is_none());
        assert_eq!(omitted.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_record_failure_sets_retry_info() {
        let err = Error::RetryExhausted {
            attempts: 2,
            max_retries: 2,
            source: Box::new(Error::Link("down".into())),
        };
        let ctx = Context::new().record_failure(&err);

        assert!(ctx.is_failed());
        assert_eq!(
            ctx.retry_info,
            Some(RetryInfo { attempts: 2, successful: false, max_retries: 2 })
        );
    }

    #[test]
    fn test_apply_changes_keeps_untouched_keys() {
        let base = Context::new().set("shared", 1);
        let a = base.clone().set("a", "x");
        let b = base.clone().set("shared", 2);
        let stale = base.clone().set("shared", 1);

        let mut merged = base.clone();
        merged.apply_changes(&base, &b);
        merged.apply_changes(&base, &a);
        merged.apply_changes(&base, &stale);

        assert_eq!(merged.get("shared"), Some(&json!(2)));
        assert_eq!(merged.get("a"), Some(&json!("x")));
    }
}
