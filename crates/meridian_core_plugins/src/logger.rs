//! Operation logging plugin.

use std::sync::Arc;

use meridian_core::{ExecutionArgs, ExecutionOutput};
use meridian_pipeline::Plugin;
use meridian_pipeline::hooks::{OnExecuteDoneHook, StreamHandlers, SubscribeHooks};

/// An operation lifecycle point reported by [`LoggerPlugin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    /// An execute call is about to run.
    ExecuteStart,
    /// An execute call produced a result.
    ExecuteEnd,
    /// A subscribe call is about to run.
    SubscribeStart,
    /// A subscribe call produced a result.
    SubscribeEnd,
    /// A streamed result ended or was closed.
    StreamEnd,
}

impl LogEvent {
    /// The event name as it appears in log lines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecuteStart => "execute-start",
            Self::ExecuteEnd => "execute-end",
            Self::SubscribeStart => "subscribe-start",
            Self::SubscribeEnd => "subscribe-end",
            Self::StreamEnd => "stream-end",
        }
    }
}

/// What a [`LogFn`] receives.
#[derive(Debug)]
pub struct LogRecord<'a> {
    /// Lifecycle point.
    pub event: LogEvent,
    /// Arguments of the operation.
    pub args: &'a ExecutionArgs,
    /// The result, for `*End` events of single results.
    pub output: Option<&'a ExecutionOutput>,
}

/// Custom log sink.
pub type LogFn = Arc<dyn Fn(&LogRecord<'_>) + Send + Sync>;

/// Logs execute and subscribe calls.
///
/// By default every record goes to `tracing` at `info` level for start and end
/// events, with the result's error count attached. Streamed results also log
/// when the stream ends. Use [`with_log_fn`](Self::with_log_fn) to send the
/// records elsewhere.
#[derive(Clone, Default)]
pub struct LoggerPlugin {
    log_fn: Option<LogFn>,
    skip_subscriptions: bool,
}

impl LoggerPlugin {
    /// Creates a logger writing to `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends records to `log_fn` instead of `tracing`.
    #[must_use]
    pub fn with_log_fn<F>(mut self, log_fn: F) -> Self
    where
        F: Fn(&LogRecord<'_>) + Send + Sync + 'static,
    {
        self.log_fn = Some(Arc::new(log_fn));
        self
    }

    /// Leaves subscribe calls unlogged.
    #[must_use]
    pub fn skip_subscriptions(mut self, skip: bool) -> Self {
        self.skip_subscriptions = skip;
        self
    }
}

fn emit(log_fn: Option<&LogFn>, record: &LogRecord<'_>) {
    if let Some(log_fn) = log_fn {
        log_fn(record);
        return;
    }
    let operation = record.args.operation_name.as_deref().unwrap_or("anonymous");
    match record.output {
        Some(ExecutionOutput::Single(result)) => tracing::info!(
            event = record.event.as_str(),
            operation,
            errors = result.errors.len(),
            "operation finished"
        ),
        Some(ExecutionOutput::Stream(_)) => tracing::info!(
            event = record.event.as_str(),
            operation,
            "operation streaming"
        ),
        None => tracing::info!(event = record.event.as_str(), operation, "operation"),
    }
}

/// Stream handlers logging [`LogEvent::StreamEnd`].
fn stream_end(log_fn: Option<LogFn>, args: ExecutionArgs) -> StreamHandlers {
    StreamHandlers::new().on_end(move || {
        emit(
            log_fn.as_ref(),
            &LogRecord {
                event: LogEvent::StreamEnd,
                args: &args,
                output: None,
            },
        );
    })
}

impl From<LoggerPlugin> for Plugin {
    fn from(plugin: LoggerPlugin) -> Self {
        let LoggerPlugin {
            log_fn,
            skip_subscriptions,
        } = plugin;

        let execute_log = log_fn.clone();
        let mut logger = Plugin::new(crate::names::LOGGER).on_execute(move |event| {
            let log_fn = execute_log.clone();
            emit(
                log_fn.as_ref(),
                &LogRecord {
                    event: LogEvent::ExecuteStart,
                    args: event.args(),
                    output: None,
                },
            );
            async move {
                Ok(Some(OnExecuteDoneHook::new(move |done| async move {
                    let output = done.result();
                    emit(
                        log_fn.as_ref(),
                        &LogRecord {
                            event: LogEvent::ExecuteEnd,
                            args: done.args(),
                            output: Some(&output),
                        },
                    );
                    Ok(output
                        .is_stream()
                        .then(|| stream_end(log_fn, done.args().clone())))
                })))
            }
        });

        if !skip_subscriptions {
            logger = logger.on_subscribe(move |event| {
                let log_fn = log_fn.clone();
                emit(
                    log_fn.as_ref(),
                    &LogRecord {
                        event: LogEvent::SubscribeStart,
                        args: event.args(),
                        output: None,
                    },
                );
                async move {
                    let hooks = SubscribeHooks::new().on_subscribe_result(move |result| async move {
                        let output = result.result();
                        emit(
                            log_fn.as_ref(),
                            &LogRecord {
                                event: LogEvent::SubscribeEnd,
                                args: result.args(),
                                output: Some(&output),
                            },
                        );
                        Ok(output
                            .is_stream()
                            .then(|| stream_end(log_fn, result.args().clone())))
                    });
                    Ok(Some(hooks))
                }
            });
        }
        logger
    }
}
