//! Error types for chain execution.
//!
//! Link failures are normally carried as data: the chain catches the [`Error`]
//! returned by a link and stores an [`ErrorRecord`] in the context. Only
//! [`Error::Config`] escapes [`Chain::execute`](crate::Chain::execute).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Context;

/// The main error type for link and chain operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A link failed while processing the context.
    #[error("{0}")]
    Link(String),

    /// A validator rejected the context.
    #[error("{0}")]
    Validation(String),

    /// A retried link failed on every attempt.
    #[error("{source}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Configured attempt limit.
        max_retries: u32,
        /// The failure from the last attempt.
        source: Box<Error>,
    },

    /// A nested chain finished with an error.
    ///
    /// `context` is the inner chain's failed context, so the enclosing chain
    /// keeps its partial results and `retryInfo`.
    #[error("{}", .record.message)]
    Recorded {
        /// The failure the inner chain recorded.
        record: ErrorRecord,
        /// The inner chain's final context, `error` included.
        context: Box<Context>,
    },

    /// A combinator or chain was configured incorrectly.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generic error with a message.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// The record name stored in [`ErrorRecord::name`] for this error.
    pub fn name(&self) -> &str {
        match self {
            Error::Link(_) | Error::Message(_) => "Error",
            Error::Validation(_) => "ValidationError",
            Error::RetryExhausted { .. } => "RetryError",
            Error::Recorded { record, .. } => &record.name,
            Error::Config(_) => "ConfigError",
            Error::Json(_) => "JsonError",
        }
    }

    /// Whether this is a programmer error that must not be carried as data.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Convert this error into the record stored on a failed context.
    pub fn to_record(&self) -> ErrorRecord {
        if let Error::Recorded { record, .. } = self {
            return record.clone();
        }

        let mut causes = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        ErrorRecord {
            message: self.to_string(),
            name: self.name().to_string(),
            stack: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\ncaused by: "))
            },
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message(msg.to_string())
    }
}

/// A specialized `Result` type for chain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure stored in a context's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Human-readable failure message.
    pub message: String,
    /// Error class, e.g. `Error` or `ValidationError`.
    pub name: String,
    /// Cause chain, when the error has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorRecord {
    /// Create a plain `Error` record with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: "Error".to_string(),
            stack: None,
        }
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl From<&Error> for ErrorRecord {
    fn from(err: &Error) -> Self {
        err.to_record()
    }
}
