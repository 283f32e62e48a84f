//! Error observation and masking plugins.
//!
//! Both plugins cover every place an error can surface after the orchestrator
//! is built:
//!
//! | Source | Reported as |
//! |--------|-------------|
//! | errors inside a single execute/subscribe result | [`ErrorPhase::Execution`] / [`ErrorPhase::Subscription`] |
//! | errors inside streamed result items | same, once per item |
//! | errors raised by a subscription stream | [`ErrorPhase::Subscription`] |
//! | context-building failures | [`ErrorPhase::Context`] |

use std::sync::Arc;

use meridian_core::{ExecutionArgs, ExecutionResult, OperationError, PipelineError, RequestContext};
use meridian_pipeline::Plugin;
use meridian_pipeline::hooks::SubscribeErrorEvent;
use serde_json::{Value, json};

use crate::results::{Operation, ResultMap, SubscribeErrorFn, per_result};

/// Converts a thrown error into its data-level form.
fn operation_error(error: &PipelineError) -> OperationError {
    match error {
        PipelineError::Operation(inner) | PipelineError::Parse(inner) => inner.clone(),
        other => OperationError::new(other.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ErrorHandlerPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Where an observed error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// An execute result.
    Execution,
    /// A subscribe result or subscription stream.
    Subscription,
    /// Context building.
    Context,
}

/// Errors handed to an [`ErrorHandlerPlugin`] callback.
#[derive(Debug)]
pub struct ErrorReport<'a> {
    /// Where the errors came from.
    pub phase: ErrorPhase,
    /// The errors. Never empty.
    pub errors: &'a [OperationError],
    /// The request context.
    pub context: &'a RequestContext,
}

type ErrorCallback = Arc<dyn Fn(&ErrorReport<'_>) + Send + Sync>;

/// Calls a function for every error a request produces.
///
/// The plugin only observes: results and errors reach the caller unchanged.
#[derive(Clone)]
pub struct ErrorHandlerPlugin {
    callback: ErrorCallback,
}

impl ErrorHandlerPlugin {
    /// Creates a plugin reporting to `callback`.
    #[must_use]
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ErrorReport<'_>) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl From<ErrorHandlerPlugin> for Plugin {
    fn from(plugin: ErrorHandlerPlugin) -> Self {
        let callback = plugin.callback;

        let on_result = Arc::clone(&callback);
        let observe: ResultMap = Arc::new(
            move |operation: Operation, args: &ExecutionArgs, result: ExecutionResult| {
                if result.has_errors() {
                    on_result(&ErrorReport {
                        phase: match operation {
                            Operation::Execute => ErrorPhase::Execution,
                            Operation::Subscribe => ErrorPhase::Subscription,
                        },
                        errors: &result.errors,
                        context: &args.context,
                    });
                }
                result
            },
        );

        let on_stream_error = Arc::clone(&callback);
        let stream_error: SubscribeErrorFn = Arc::new(
            move |context: &RequestContext, event: &mut SubscribeErrorEvent| {
                on_stream_error(&ErrorReport {
                    phase: ErrorPhase::Subscription,
                    errors: &[operation_error(event.error())],
                    context,
                });
            },
        );

        let init = Plugin::new("meridian::error_handler").on_init(move |event| {
            let callback = Arc::clone(&callback);
            event.register_context_error_handler(move |failure| {
                callback(&ErrorReport {
                    phase: ErrorPhase::Context,
                    errors: &[operation_error(failure.error())],
                    context: failure.context(),
                });
            });
            Ok(())
        });
        per_result(init, observe, Some(stream_error))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MaskedErrorsPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Message that replaces masked errors by default.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unexpected error.";

/// Extension key that marks an [`OperationError`] as safe to show clients.
pub const EXPOSE_EXTENSION: &str = "expose";

/// Extension key under which dev mode keeps the original message.
pub const ORIGINAL_MESSAGE_EXTENSION: &str = "originalMessage";

type ExposePredicate = Arc<dyn Fn(&OperationError) -> bool + Send + Sync>;

/// Replaces error messages that were not meant for clients.
///
/// An error is exposed when the predicate set with
/// [`with_is_exposed`](Self::with_is_exposed) says so; by default that is an
/// `"expose": true` extension. Parse errors are always exposed. Masked errors
/// keep their path and lose their extensions. With
/// [`with_dev_mode`](Self::with_dev_mode) the original message survives under
/// [`ORIGINAL_MESSAGE_EXTENSION`].
///
/// Thrown errors (subscription stream failures, context-building failures)
/// that are masked become [`PipelineError::Operation`] carrying the masked
/// error.
#[derive(Clone)]
pub struct MaskedErrorsPlugin {
    masker: Masker,
}

#[derive(Clone)]
struct Masker {
    message: Arc<str>,
    is_exposed: ExposePredicate,
    dev_mode: bool,
}

impl Default for MaskedErrorsPlugin {
    fn default() -> Self {
        Self {
            masker: Masker {
                message: Arc::from(DEFAULT_ERROR_MESSAGE),
                is_exposed: Arc::new(|error: &OperationError| {
                    error.extension(EXPOSE_EXTENSION) == Some(&Value::Bool(true))
                }),
                dev_mode: false,
            },
        }
    }
}

impl MaskedErrorsPlugin {
    /// Creates a plugin with the default message and predicate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replacement message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.masker.message = message.into();
        self
    }

    /// Sets the predicate deciding which errors pass through unmasked.
    #[must_use]
    pub fn with_is_exposed<F>(mut self, is_exposed: F) -> Self
    where
        F: Fn(&OperationError) -> bool + Send + Sync + 'static,
    {
        self.masker.is_exposed = Arc::new(is_exposed);
        self
    }

    /// Keeps the original message in an extension.
    #[must_use]
    pub fn with_dev_mode(mut self, enabled: bool) -> Self {
        self.masker.dev_mode = enabled;
        self
    }
}

impl Masker {
    fn mask(&self, error: OperationError) -> OperationError {
        if (self.is_exposed)(&error) {
            return error;
        }
        let masked = OperationError::new(&*self.message).with_path(error.path);
        if self.dev_mode {
            masked.with_extension(ORIGINAL_MESSAGE_EXTENSION, json!(error.message))
        } else {
            masked
        }
    }

    fn mask_result(&self, mut result: ExecutionResult) -> ExecutionResult {
        result.errors = result
            .errors
            .into_iter()
            .map(|error| self.mask(error))
            .collect();
        result
    }

    fn mask_thrown(&self, error: PipelineError) -> PipelineError {
        match error {
            PipelineError::Parse(_) => error,
            PipelineError::Operation(inner) => PipelineError::Operation(self.mask(inner)),
            other => PipelineError::Operation(self.mask(OperationError::new(other.to_string()))),
        }
    }
}

impl From<MaskedErrorsPlugin> for Plugin {
    fn from(plugin: MaskedErrorsPlugin) -> Self {
        let masker = plugin.masker;

        let results = masker.clone();
        let map: ResultMap = Arc::new(
            move |_operation: Operation, _args: &ExecutionArgs, result: ExecutionResult| {
                results.mask_result(result)
            },
        );

        let streams = masker.clone();
        let stream_error: SubscribeErrorFn = Arc::new(
            move |_context: &RequestContext, event: &mut SubscribeErrorEvent| {
                let masked = streams.mask_thrown(event.error().clone());
                event.set_error(masked);
            },
        );

        let init = Plugin::new("meridian::masked_errors").on_init(move |event| {
            let masker = masker.clone();
            event.register_context_error_handler(move |failure| {
                let masked = masker.mask_thrown(failure.error().clone());
                failure.set_error(masked);
            });
            Ok(())
        });
        per_result(init, map, Some(stream_error))
    }
}
