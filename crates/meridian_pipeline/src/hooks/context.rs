use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use meridian_core::{PipelineError, RequestContext};
use serde_json::Value;

use super::{AfterHook, Hook, HookResult};

/// Before-context-building hook.
pub type OnContextBuildingHook =
    Hook<OnContextBuildingEvent, Option<AfterContextBuildingHook>>;

/// After-context-building hook.
pub type AfterContextBuildingHook = AfterHook<AfterContextBuildingEvent>;

/// Handler invoked when context building fails.
pub type ContextErrorHandler = Arc<dyn Fn(&mut ContextErrorEvent<'_>) + Send + Sync>;

/// Set once a hook breaks context building.
#[derive(Clone, Default)]
pub(crate) struct BreakFlag(Arc<AtomicBool>);

impl BreakFlag {
    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Event passed to before-context-building hooks.
pub struct OnContextBuildingEvent {
    context: RequestContext,
    broken: BreakFlag,
}

impl OnContextBuildingEvent {
    pub(crate) fn new(context: RequestContext, broken: BreakFlag) -> Self {
        Self { context, broken }
    }

    /// The context being built.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Shallow-merges `extension` into the context being built.
    ///
    /// # Errors
    ///
    /// Fails if `extension` is not an object.
    pub fn extend_context(&self, extension: Value) -> HookResult {
        self.context.extend(extension)
    }

    /// Finishes context building after this hook.
    ///
    /// Later before-hooks are skipped, and no after-hook runs; the context as
    /// extended so far is the final context.
    pub fn break_context_building(&self) {
        self.broken.set();
    }
}

/// Event passed to after-context-building hooks.
pub struct AfterContextBuildingEvent {
    context: RequestContext,
}

impl AfterContextBuildingEvent {
    pub(crate) fn new(context: RequestContext) -> Self {
        Self { context }
    }

    /// The built context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Shallow-merges `extension` into the built context.
    ///
    /// # Errors
    ///
    /// Fails if `extension` is not an object.
    pub fn extend_context(&self, extension: Value) -> HookResult {
        self.context.extend(extension)
    }
}

/// Event passed to context-error handlers.
pub struct ContextErrorEvent<'a> {
    context: &'a RequestContext,
    error: PipelineError,
}

impl<'a> ContextErrorEvent<'a> {
    pub(crate) fn new(context: &'a RequestContext, error: PipelineError) -> Self {
        Self { context, error }
    }

    /// The context as it was when building failed.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        self.context
    }

    /// The error that will be thrown.
    #[must_use]
    pub fn error(&self) -> &PipelineError {
        &self.error
    }

    /// Replaces the error that will be thrown.
    pub fn set_error(&mut self, error: PipelineError) {
        self.error = error;
    }

    pub(crate) fn into_error(self) -> PipelineError {
        self.error
    }
}
