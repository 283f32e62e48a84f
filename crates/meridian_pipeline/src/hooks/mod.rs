//! Hook signatures and the events hooks receive.
//!
//! # Before and after hooks
//!
//! Asynchronous phase hooks come in pairs. A before-hook ([`Hook`]) runs
//! ahead of the engine call and may hand back an after-hook ([`AfterHook`])
//! that runs once the phase result has settled:
//!
//! ```ignore
//! Plugin::new("timing").on_parse(|event: OnParseEvent| async move {
//!     let started = Instant::now();
//!     Ok(Some(AfterParseHook::new(move |after: AfterParseEvent| async move {
//!         tracing::debug!(elapsed = ?started.elapsed(), ok = after.result().is_some(), "parsed");
//!         Ok(())
//!     })))
//! })
//! ```
//!
//! # Events
//!
//! Each hook receives an owned event. Events are cheap handles onto the
//! state of the current invocation: calling `set_parse_fn`, `set_result`,
//! `extend_context` and similar controls mutates that shared state, and the
//! orchestrator reads it back after the hook resolves. Events for the
//! synchronous hooks (plugin init, schema change, request init, error
//! handlers) are borrowed instead.
//!
//! | Phase | Before-hook | Event | After-hook |
//! |-------|-------------|-------|------------|
//! | parse | [`OnParseHook`] | [`OnParseEvent`] | [`AfterParseHook`] |
//! | validate | [`OnValidateHook`] | [`OnValidateEvent`] | [`AfterValidateHook`] |
//! | context | [`OnContextBuildingHook`] | [`OnContextBuildingEvent`] | [`AfterContextBuildingHook`] |
//! | execute | [`OnExecuteHook`] | [`OnExecuteEvent`] | [`OnExecuteDoneHook`] |
//! | subscribe | [`OnSubscribeHook`] | [`OnSubscribeEvent`] | [`SubscribeHooks`] |

mod context;
mod execute;
mod init;
mod parse;
mod stream;
mod subscribe;
mod validate;

use core::future::Future;
use std::sync::Arc;

use meridian_core::{BoxFuture, PipelineError};
use parking_lot::Mutex;

pub use context::{
    AfterContextBuildingEvent, AfterContextBuildingHook, ContextErrorEvent, ContextErrorHandler,
    OnContextBuildingEvent, OnContextBuildingHook,
};
pub use execute::{OnExecuteDoneEvent, OnExecuteDoneHook, OnExecuteEvent, OnExecuteHook, OnResultEvent};
pub use init::{
    PluginInitEvent, PluginInitHook, RequestInitEvent, RequestInitHook, SchemaChangeEvent,
    SchemaChangeHook,
};
pub use parse::{AfterParseEvent, AfterParseHook, OnParseEvent, OnParseHook};
pub use stream::{OnEndHook, OnNextEvent, OnNextHook, StreamHandlers};
pub use subscribe::{
    OnSubscribeErrorHook, OnSubscribeEvent, OnSubscribeHook, OnSubscribeResultEvent,
    OnSubscribeResultHook, SubscribeErrorEvent, SubscribeHooks,
};
pub use validate::{AfterValidateEvent, AfterValidateHook, OnValidateEvent, OnValidateHook};

pub(crate) use context::BreakFlag;
pub(crate) use execute::OperationState;
pub(crate) use parse::ParseState;
pub(crate) use validate::ValidateState;

/// Result type returned by every hook.
pub type HookResult<T = ()> = Result<T, PipelineError>;

/// Per-invocation state shared between a phase runner and its events.
pub(crate) type Shared<T> = Arc<Mutex<T>>;

// ─────────────────────────────────────────────────────────────────────────────
// Hook
// ─────────────────────────────────────────────────────────────────────────────

/// A reusable asynchronous hook receiving `E` and producing `R`.
pub struct Hook<E, R> {
    f: Arc<dyn Fn(E) -> BoxFuture<'static, HookResult<R>> + Send + Sync>,
}

impl<E, R> Clone for Hook<E, R> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<E: Send + 'static, R: Send + 'static> Hook<E, R> {
    /// Wraps an async closure.
    #[must_use]
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<R>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |event| -> BoxFuture<'static, HookResult<R>> {
                Box::pin(hook(event))
            }),
        }
    }

    /// Invokes the hook.
    pub fn call(&self, event: E) -> BoxFuture<'static, HookResult<R>> {
        (self.f)(event)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AfterHook
// ─────────────────────────────────────────────────────────────────────────────

/// A one-shot asynchronous hook returned by a before-hook.
pub struct AfterHook<E, R = ()> {
    f: Box<dyn FnOnce(E) -> BoxFuture<'static, HookResult<R>> + Send>,
}

impl<E: Send + 'static, R: Send + 'static> AfterHook<E, R> {
    /// Wraps an async closure.
    #[must_use]
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: FnOnce(E) -> Fut + Send + 'static,
        Fut: Future<Output = HookResult<R>> + Send + 'static,
    {
        Self {
            f: Box::new(move |event| -> BoxFuture<'static, HookResult<R>> {
                Box::pin(hook(event))
            }),
        }
    }

    /// Invokes the hook, consuming it.
    pub fn call(self, event: E) -> BoxFuture<'static, HookResult<R>> {
        (self.f)(event)
    }
}
