use std::sync::Arc;

use meridian_core::{
    ExecuteFn, ExecutionArgs, ExecutionOutput, ExecutionResult, PipelineError, SubscribeFn,
};
use meridian_stream::{CompletionCallback, ErrorRewriter};
use parking_lot::Mutex;

use crate::hooks::{
    OnExecuteEvent, OnExecuteHook, OnNextEvent, OnNextHook, OnResultEvent, OnSubscribeErrorHook,
    OnSubscribeEvent, OnSubscribeHook, OperationState, Shared, StreamHandlers, SubscribeErrorEvent,
};
use crate::registry::Indexed;

/// Runs the execute phase.
///
/// Iteration stops at the first before-hook that sets a result. The
/// after-hooks returned so far, including the stopping hook's own, still
/// run against that result; later before-hooks are never invoked.
pub(crate) async fn execute(
    hooks: &[Indexed<OnExecuteHook>],
    execute_fn: ExecuteFn,
    args: ExecutionArgs,
) -> Result<ExecutionOutput, PipelineError> {
    let state = OperationState::shared(execute_fn);
    let mut done = Vec::new();

    for entry in hooks {
        let event = OnExecuteEvent::new(args.clone(), Arc::clone(&state));
        done.extend(entry.hook.call(event).await?);
        if stopped(&state, &entry.name) {
            break;
        }
    }

    let output = Arc::new(Mutex::new(settle(&state, &args).await?));
    let mut handlers = Vec::new();
    for hook in done {
        let event = OnResultEvent::new(args.clone(), Arc::clone(&output));
        handlers.extend(hook.call(event).await?);
    }

    let output = output.lock().clone();
    Ok(attach_stream_handlers(output, &args, handlers, Vec::new()))
}

/// Runs the subscribe phase.
///
/// Mirrors [`execute`]; additionally, error hooks returned by before-hooks
/// rewrite errors raised by the resulting stream.
pub(crate) async fn subscribe(
    hooks: &[Indexed<OnSubscribeHook>],
    subscribe_fn: SubscribeFn,
    args: ExecutionArgs,
) -> Result<ExecutionOutput, PipelineError> {
    let state = OperationState::shared(subscribe_fn);
    let mut on_result = Vec::new();
    let mut on_error = Vec::new();

    for entry in hooks {
        let event = OnSubscribeEvent::new(args.clone(), Arc::clone(&state));
        if let Some(returned) = entry.hook.call(event).await? {
            on_result.extend(returned.on_subscribe_result);
            on_error.extend(returned.on_subscribe_error);
        }
        if stopped(&state, &entry.name) {
            break;
        }
    }

    let output = Arc::new(Mutex::new(settle(&state, &args).await?));
    let mut handlers = Vec::new();
    for hook in on_result {
        let event = OnResultEvent::new(args.clone(), Arc::clone(&output));
        handlers.extend(hook.call(event).await?);
    }

    let rewriters = on_error.into_iter().map(error_rewriter).collect();
    let output = output.lock().clone();
    Ok(attach_stream_handlers(output, &args, handlers, rewriters))
}

fn stopped(state: &Shared<OperationState>, plugin: &str) -> bool {
    let stopped = state.lock().result.is_some();
    if stopped {
        tracing::debug!(plugin, "execution stopped early");
    }
    stopped
}

/// Returns the early result, or calls the engine function for one.
async fn settle(
    state: &Shared<OperationState>,
    args: &ExecutionArgs,
) -> Result<ExecutionOutput, PipelineError> {
    let engine = {
        let mut state = state.lock();
        match state.result.take() {
            Some(result) => return Ok(result),
            None => Arc::clone(&state.engine_fn),
        }
    };
    tracing::trace!("calling engine function");
    engine(args.clone()).await
}

fn error_rewriter(hook: OnSubscribeErrorHook) -> ErrorRewriter<PipelineError> {
    Arc::new(move |error| {
        let mut event = SubscribeErrorEvent::new(error);
        hook(&mut event);
        event.into_error()
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream wrapping
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps a streamed result with the collected observers.
///
/// Layers are stacked item mapper, then completion notifier, then error
/// rewriter. Single results are returned untouched.
fn attach_stream_handlers(
    output: ExecutionOutput,
    args: &ExecutionArgs,
    handlers: Vec<StreamHandlers>,
    rewriters: Vec<ErrorRewriter<PipelineError>>,
) -> ExecutionOutput {
    let ExecutionOutput::Stream(mut stream) = output else {
        return output;
    };

    let mut on_next: Vec<OnNextHook> = Vec::new();
    let mut on_end: Vec<CompletionCallback> = Vec::new();
    for handler in handlers {
        on_next.extend(handler.on_next);
        on_end.extend(handler.on_end);
    }
    tracing::trace!(
        on_next = on_next.len(),
        on_end = on_end.len(),
        rewriters = rewriters.len(),
        "wrapping result stream"
    );

    if !on_next.is_empty() {
        let hooks: Arc<[OnNextHook]> = Arc::from(on_next);
        let args = args.clone();
        stream = stream.map_items(move |item| run_on_next(Arc::clone(&hooks), args.clone(), item));
    }
    stream = stream.on_complete(on_end);
    if !rewriters.is_empty() {
        stream = stream.rewrite_errors(rewriters);
    }
    ExecutionOutput::Stream(stream)
}

async fn run_on_next(
    hooks: Arc<[OnNextHook]>,
    args: ExecutionArgs,
    item: ExecutionResult,
) -> Result<ExecutionResult, PipelineError> {
    let slot = Arc::new(Mutex::new(item));
    for hook in hooks.iter() {
        hook.call(OnNextEvent::new(args.clone(), Arc::clone(&slot)))
            .await?;
    }
    let item = slot.lock().clone();
    Ok(item)
}
