//! Pipeline errors.
//!
//! [`PipelineError`] is what a phase *throws*. Data-level failures (a
//! validation error list, an `errors` array on an execution result) travel as
//! [`OperationError`] values inside normal results instead.

use core::future::Future;
use core::pin::Pin;

use crate::result::OperationError;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors thrown out of a pipeline phase.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Parsing finished with no document and no error.
    #[error("failed to parse document")]
    NoParseResult,

    /// The source could not be parsed.
    #[error("parse error: {0}")]
    Parse(OperationError),

    /// A context extension was not an object.
    #[error("invalid context extension: expected an object, got {0}")]
    InvalidContextExtension(String),

    /// An engine function was never supplied.
    #[error("engine function `{0}` is not configured")]
    EngineNotConfigured(&'static str),

    /// A plugin's init hook failed.
    #[error("plugin `{plugin}` failed to initialize: {message}")]
    PluginInit {
        /// Name of the failing plugin.
        plugin: String,
        /// Failure description.
        message: String,
    },

    /// Building the request context failed.
    #[error("context building failed: {0}")]
    ContextBuilding(String),

    /// The engine failed to execute or subscribe.
    #[error("execution failed: {0}")]
    Execution(String),

    /// A hook failed outside of any designated error channel.
    #[error("hook from plugin `{plugin}` failed: {message}")]
    Hook {
        /// Name of the plugin that owns the hook.
        plugin: String,
        /// Failure description.
        message: String,
    },

    /// An operation-level error raised as a failure.
    #[error(transparent)]
    Operation(#[from] OperationError),
}

impl PipelineError {
    /// Creates a [`PipelineError::Hook`].
    #[must_use]
    pub fn hook(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Creates a [`PipelineError::ContextBuilding`].
    #[must_use]
    pub fn context_building(message: impl Into<String>) -> Self {
        Self::ContextBuilding(message.into())
    }

    /// Creates a [`PipelineError::Execution`].
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub(crate) fn invalid_extension(value: &serde_json::Value) -> Self {
        let kind = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        };
        Self::InvalidContextExtension(format!("{value} ({kind})"))
    }
}
