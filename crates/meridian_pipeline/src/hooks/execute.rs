use std::sync::Arc;

use meridian_core::{ExecuteFn, ExecutionArgs, ExecutionOutput, RequestContext};
use parking_lot::Mutex;
use serde_json::Value;

use super::stream::StreamHandlers;
use super::{AfterHook, Hook, HookResult, Shared};

/// Before-execute hook.
pub type OnExecuteHook = Hook<OnExecuteEvent, Option<OnExecuteDoneHook>>;

/// Hook run once execution has produced a result.
pub type OnExecuteDoneHook = AfterHook<OnExecuteDoneEvent, Option<StreamHandlers>>;

/// Event passed to [`OnExecuteDoneHook`]s.
pub type OnExecuteDoneEvent = OnResultEvent;

/// State of one execute or subscribe invocation.
pub(crate) struct OperationState {
    pub(crate) engine_fn: ExecuteFn,
    pub(crate) result: Option<ExecutionOutput>,
}

impl OperationState {
    pub(crate) fn shared(engine_fn: ExecuteFn) -> Shared<Self> {
        Arc::new(Mutex::new(Self {
            engine_fn,
            result: None,
        }))
    }
}

/// Event passed to before-execute hooks.
pub struct OnExecuteEvent {
    args: ExecutionArgs,
    state: Shared<OperationState>,
}

impl OnExecuteEvent {
    pub(crate) fn new(args: ExecutionArgs, state: Shared<OperationState>) -> Self {
        Self { args, state }
    }

    /// The execution arguments.
    #[must_use]
    pub fn args(&self) -> &ExecutionArgs {
        &self.args
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.args.context
    }

    /// Shallow-merges `extension` into the request context.
    ///
    /// # Errors
    ///
    /// Fails immediately if `extension` is not an object.
    pub fn extend_context(&self, extension: Value) -> HookResult {
        self.args.context.extend(extension)
    }

    /// The execute function that will run if no hook stops execution.
    #[must_use]
    pub fn execute_fn(&self) -> ExecuteFn {
        Arc::clone(&self.state.lock().engine_fn)
    }

    /// Replaces the execute function for this invocation.
    pub fn set_execute_fn(&self, execute_fn: ExecuteFn) {
        self.state.lock().engine_fn = execute_fn;
    }

    /// Supplies the result and stops execution.
    ///
    /// Before-hooks of later plugins are never invoked. After-hooks already
    /// returned by earlier plugins, and by this one, still run against
    /// `result`.
    pub fn set_result_and_stop_execution(&self, result: impl Into<ExecutionOutput>) {
        self.state.lock().result = Some(result.into());
    }
}

/// Event passed to hooks that observe an execute or subscribe result.
pub struct OnResultEvent {
    args: ExecutionArgs,
    result: Shared<ExecutionOutput>,
}

impl OnResultEvent {
    pub(crate) fn new(args: ExecutionArgs, result: Shared<ExecutionOutput>) -> Self {
        Self { args, result }
    }

    /// The execution arguments.
    #[must_use]
    pub fn args(&self) -> &ExecutionArgs {
        &self.args
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.args.context
    }

    /// The current result.
    #[must_use]
    pub fn result(&self) -> ExecutionOutput {
        self.result.lock().clone()
    }

    /// Replaces the result.
    pub fn set_result(&self, result: impl Into<ExecutionOutput>) {
        *self.result.lock() = result.into();
    }
}
