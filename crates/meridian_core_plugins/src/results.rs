//! Shared plumbing for plugins that touch every execution result.
//!
//! Execute and subscribe outputs are either a single result or a stream.
//! [`per_result`] installs one mapping function that covers both shapes in
//! both phases: single results are rewritten in the done hook, streamed
//! results item by item through an `on_next` handler.

use std::sync::Arc;

use meridian_core::{ExecutionArgs, ExecutionOutput, ExecutionResult, RequestContext};
use meridian_pipeline::Plugin;
use meridian_pipeline::hooks::{
    OnExecuteDoneHook, OnNextEvent, OnResultEvent, StreamHandlers, SubscribeErrorEvent,
    SubscribeHooks,
};

/// Which operation produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Execute,
    Subscribe,
}

pub(crate) type ResultMap =
    Arc<dyn Fn(Operation, &ExecutionArgs, ExecutionResult) -> ExecutionResult + Send + Sync>;

pub(crate) type SubscribeErrorFn =
    Arc<dyn Fn(&RequestContext, &mut SubscribeErrorEvent) + Send + Sync>;

/// Adds execute and subscribe hooks to `plugin` that pass every result
/// through `map`. `on_error` also sees errors raised by subscription streams.
pub(crate) fn per_result(
    plugin: Plugin,
    map: ResultMap,
    on_error: Option<SubscribeErrorFn>,
) -> Plugin {
    let execute_map = Arc::clone(&map);
    plugin
        .on_execute(move |_event| {
            let map = Arc::clone(&execute_map);
            async move {
                Ok(Some(OnExecuteDoneHook::new(move |done| async move {
                    Ok(apply(&done, Operation::Execute, map))
                })))
            }
        })
        .on_subscribe(move |event| {
            let map = Arc::clone(&map);
            let mut hooks = SubscribeHooks::new().on_subscribe_result(move |result| async move {
                Ok(apply(&result, Operation::Subscribe, map))
            });
            if let Some(on_error) = on_error.clone() {
                let context = event.context().clone();
                hooks = hooks.on_subscribe_error(move |error| on_error(&context, error));
            }
            async move { Ok(Some(hooks)) }
        })
}

fn apply(event: &OnResultEvent, operation: Operation, map: ResultMap) -> Option<StreamHandlers> {
    match event.result() {
        ExecutionOutput::Single(result) => {
            event.set_result(map(operation, event.args(), result));
            None
        }
        ExecutionOutput::Stream(_) => Some(StreamHandlers::new().on_next(
            move |item: OnNextEvent| {
                item.set_result(map(operation, item.args(), item.result()));
                async { Ok(()) }
            },
        )),
    }
}
