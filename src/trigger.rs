//! Trigger descriptors.
//!
//! A trigger is the event source that created a [`Context`](crate::Context):
//! an HTTP request, a cron tick, a CLI invocation, a queue message, or an
//! error report. Each variant carries only the fields relevant to it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The event source that produced a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Trigger {
    /// An inbound HTTP request.
    Http {
        /// Request method, e.g. `GET`.
        method: String,
        /// Request URL or path.
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        /// Path parameters.
        #[serde(default)]
        params: BTreeMap<String, String>,
        /// Query string parameters.
        #[serde(default)]
        query: BTreeMap<String, String>,
    },
    /// A scheduled cron firing.
    Cron {
        #[serde(rename = "cronExpression")]
        cron_expression: String,
        /// Epoch milliseconds the job was scheduled for.
        #[serde(rename = "scheduledTime")]
        scheduled_time: u64,
        /// Epoch milliseconds the job actually fired.
        #[serde(rename = "actualTime")]
        actual_time: u64,
    },
    /// A command-line invocation.
    Cli {
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        options: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
    /// A message consumed from a queue or topic.
    Message {
        message: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    /// An error report; the failure itself lives in the context's `error` field.
    Error,
    /// Any application-defined trigger.
    Custom {
        name: String,
    },
}

impl Trigger {
    /// The discriminator tag, e.g. `"http"` or the custom name.
    pub fn kind(&self) -> &str {
        match self {
            Trigger::Http { .. } => "http",
            Trigger::Cron { .. } => "cron",
            Trigger::Cli { .. } => "cli",
            Trigger::Message { .. } => "message",
            Trigger::Error => "error",
            Trigger::Custom { name } => name,
        }
    }

    /// Shorthand for an HTTP trigger with no headers, body, or parameters.
    pub fn http(method: impl Into<String>, url: impl Into<String>) -> Self {
        Trigger::Http {
            method: method.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            params: BTreeMap::new(),
            query: BTreeMap::new(),
        }
    }

    /// Shorthand for a custom trigger.
    pub fn custom(name: impl Into<String>) -> Self {
        Trigger::Custom { name: name.into() }
    }
}
