use core::future::Future;

use meridian_core::{ExecutionArgs, ExecutionResult};
use meridian_stream::CompletionCallback;

use super::{Hook, HookResult, Shared};

/// Per-item hook for streamed results.
pub type OnNextHook = Hook<OnNextEvent, ()>;

/// Completion hook for streamed results.
pub type OnEndHook = CompletionCallback;

/// Observers attached to a streamed result.
///
/// Returned from `on_execute_done` or `on_subscribe_result` hooks. Ignored
/// when the result is a single value.
#[derive(Default)]
pub struct StreamHandlers {
    pub(crate) on_next: Option<OnNextHook>,
    pub(crate) on_end: Option<OnEndHook>,
}

impl StreamHandlers {
    /// Creates an empty set of handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` on every item before it reaches the consumer.
    #[must_use]
    pub fn on_next<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(OnNextEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.on_next = Some(Hook::new(hook));
        self
    }

    /// Runs `hook` once, when the stream ends or is closed.
    #[must_use]
    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_end = Some(Box::new(hook));
        self
    }
}

/// Event passed to [`OnNextHook`]s.
pub struct OnNextEvent {
    args: ExecutionArgs,
    result: Shared<ExecutionResult>,
}

impl OnNextEvent {
    pub(crate) fn new(args: ExecutionArgs, result: Shared<ExecutionResult>) -> Self {
        Self { args, result }
    }

    /// The execution arguments.
    #[must_use]
    pub fn args(&self) -> &ExecutionArgs {
        &self.args
    }

    /// The current item.
    #[must_use]
    pub fn result(&self) -> ExecutionResult {
        self.result.lock().clone()
    }

    /// Replaces the item delivered to the consumer.
    pub fn set_result(&self, result: ExecutionResult) {
        *self.result.lock() = result;
    }
}
