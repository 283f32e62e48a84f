use core::future::Future;
use std::sync::Arc;

use meridian_core::{ExecutionArgs, ExecutionOutput, PipelineError, RequestContext, SubscribeFn};
use serde_json::Value;

use super::execute::{OnResultEvent, OperationState};
use super::stream::StreamHandlers;
use super::{AfterHook, Hook, HookResult, Shared};

/// Before-subscribe hook.
pub type OnSubscribeHook = Hook<OnSubscribeEvent, Option<SubscribeHooks>>;

/// Hook run once the subscription has been set up.
pub type OnSubscribeResultHook = AfterHook<OnSubscribeResultEvent, Option<StreamHandlers>>;

/// Event passed to [`OnSubscribeResultHook`]s.
pub type OnSubscribeResultEvent = OnResultEvent;

/// Rewrites an error raised by the subscription's source stream.
pub type OnSubscribeErrorHook = Arc<dyn Fn(&mut SubscribeErrorEvent) + Send + Sync>;

/// Event passed to before-subscribe hooks.
pub struct OnSubscribeEvent {
    args: ExecutionArgs,
    state: Shared<OperationState>,
}

impl OnSubscribeEvent {
    pub(crate) fn new(args: ExecutionArgs, state: Shared<OperationState>) -> Self {
        Self { args, state }
    }

    /// The subscription arguments.
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

    /// The subscribe function that will run if no hook stops execution.
    #[must_use]
    pub fn subscribe_fn(&self) -> SubscribeFn {
        Arc::clone(&self.state.lock().engine_fn)
    }

    /// Replaces the subscribe function for this invocation.
    pub fn set_subscribe_fn(&self, subscribe_fn: SubscribeFn) {
        self.state.lock().engine_fn = subscribe_fn;
    }

    /// Supplies the result and stops the subscription from being set up.
    ///
    /// Later plugins' before-hooks are skipped; after-hooks already
    /// collected still run against `result`.
    pub fn set_result_and_stop_execution(&self, result: impl Into<ExecutionOutput>) {
        self.state.lock().result = Some(result.into());
    }
}

/// After-hooks a before-subscribe hook can return.
#[derive(Default)]
pub struct SubscribeHooks {
    pub(crate) on_subscribe_result: Option<OnSubscribeResultHook>,
    pub(crate) on_subscribe_error: Option<OnSubscribeErrorHook>,
}

impl SubscribeHooks {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` once the subscription result is known.
    #[must_use]
    pub fn on_subscribe_result<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce(OnSubscribeResultEvent) -> Fut + Send + 'static,
        Fut: Future<Output = HookResult<Option<StreamHandlers>>> + Send + 'static,
    {
        self.on_subscribe_result = Some(AfterHook::new(hook));
        self
    }

    /// Runs `hook` when the source stream raises an error.
    #[must_use]
    pub fn on_subscribe_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SubscribeErrorEvent) + Send + Sync + 'static,
    {
        self.on_subscribe_error = Some(Arc::new(hook));
        self
    }
}

/// Event passed to [`OnSubscribeErrorHook`]s.
pub struct SubscribeErrorEvent {
    error: PipelineError,
}

impl SubscribeErrorEvent {
    pub(crate) fn new(error: PipelineError) -> Self {
        Self { error }
    }

    /// The error about to reach the consumer.
    #[must_use]
    pub fn error(&self) -> &PipelineError {
        &self.error
    }

    /// Replaces the error.
    pub fn set_error(&mut self, error: PipelineError) {
        self.error = error;
    }

    pub(crate) fn into_error(self) -> PipelineError {
        self.error
    }
}
