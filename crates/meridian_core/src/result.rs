//! Execution results and data-level errors.

use meridian_stream::Sequence;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PipelineError;

// ─────────────────────────────────────────────────────────────────────────────
// OperationError
// ─────────────────────────────────────────────────────────────────────────────

/// An error reported as data: a parse failure, a validation finding, or an
/// entry in a result's `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct OperationError {
    /// Human-readable description.
    pub message: String,
    /// Path to the response field the error belongs to, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    /// Free-form extension data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl OperationError {
    /// Creates an error with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Sets the response path.
    #[must_use]
    pub fn with_path(mut self, path: Vec<Value>) -> Self {
        self.path = path;
        self
    }

    /// Adds an extension entry.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Looks up an extension entry.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.as_ref().and_then(|extensions| extensions.get(key))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExecutionResult
// ─────────────────────────────────────────────────────────────────────────────

/// One execution payload: data, errors, and extensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Result data. `None` when execution produced nothing.
    #[serde(default)]
    pub data: Option<Value>,
    /// Errors reported alongside (or instead of) data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OperationError>,
    /// Free-form extension data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResult {
    /// A successful result carrying `data`.
    #[must_use]
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// A result with no data and the given errors.
    #[must_use]
    pub fn from_errors(errors: Vec<OperationError>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    /// Appends an error.
    #[must_use]
    pub fn with_error(mut self, error: OperationError) -> Self {
        self.errors.push(error);
        self
    }

    /// Adds an extension entry.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Returns `true` if any error is attached.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExecutionOutput
// ─────────────────────────────────────────────────────────────────────────────

/// A long-lived sequence of execution results.
pub type ResultStream = Sequence<ExecutionResult, PipelineError>;

/// What execute and subscribe produce: one result, or a stream of them.
#[derive(Debug, Clone)]
pub enum ExecutionOutput {
    /// A single, complete result.
    Single(ExecutionResult),
    /// Incrementally delivered results (deferred, streamed or subscribed).
    Stream(ResultStream),
}

impl ExecutionOutput {
    /// Returns `true` for [`ExecutionOutput::Stream`].
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Borrows the single result, if this is one.
    #[must_use]
    pub fn as_single(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Single(result) => Some(result),
            Self::Stream(_) => None,
        }
    }

    /// Takes the single result, if this is one.
    #[must_use]
    pub fn into_single(self) -> Option<ExecutionResult> {
        match self {
            Self::Single(result) => Some(result),
            Self::Stream(_) => None,
        }
    }

    /// Takes the stream, if this is one.
    #[must_use]
    pub fn into_stream(self) -> Option<ResultStream> {
        match self {
            Self::Single(_) => None,
            Self::Stream(stream) => Some(stream),
        }
    }
}

impl From<ExecutionResult> for ExecutionOutput {
    fn from(result: ExecutionResult) -> Self {
        Self::Single(result)
    }
}

impl From<ResultStream> for ExecutionOutput {
    fn from(stream: ResultStream) -> Self {
        Self::Stream(stream)
    }
}
