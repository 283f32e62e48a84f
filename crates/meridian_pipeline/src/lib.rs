//! # Meridian Pipeline
//!
//! The plugin-driven request lifecycle. An [`Orchestrator`] drives one
//! request through five phases:
//!
//! ```text
//! init ─▶ parse ─▶ validate ─▶ build_context ─▶ execute | subscribe
//! ```
//!
//! Every phase wraps a replaceable [`Engine`](meridian_core::Engine)
//! function with the hooks of an ordered list of [`Plugin`]s.
//!
//! # Ordering
//!
//! Hooks of one phase run sequentially, in plugin list order, regardless of
//! how long each one takes. The list is fixed once the orchestrator is built:
//! plugin init hooks may splice in further plugins, but nothing added later
//! reaches an existing orchestrator.
//!
//! # Early exit
//!
//! Parse and validate hooks can supply a result with `set_result`; the
//! engine call is skipped but every remaining before-hook still runs. Execute
//! and subscribe hooks stop iteration outright with
//! `set_result_and_stop_execution`: plugins after the stopping one are never
//! invoked, while plugins before it (and the stopping plugin itself) still
//! see the injected result in their after-hooks. Context-building hooks can
//! call `break_context_building` to finish the phase on the spot.
//!
//! # Streams
//!
//! Streamed execute and subscribe results are wrapped with the
//! `meridian_stream` adapters so that per-item hooks, completion hooks and
//! subscription error hooks run without ever delaying a consumer's `close`.
//!
//! # Schema
//!
//! The [`SchemaBroadcaster`] holds the schema. Replacing it notifies every
//! schema-change listener except the plugin that triggered the replacement.

mod documents;
pub mod hooks;
mod init;
pub mod instrumentation;
mod orchestrator;
mod phases;
pub mod plugin;
pub mod registry;
pub mod schema;

pub use hooks::HookResult;
pub use instrumentation::{ChainGuard, Instrumentation, InstrumentationChain, PhaseGuard, PhaseOutcome};
pub use orchestrator::{
    ContextFactoryFn, Enveloped, EnvelopedParseFn, EnvelopedValidateFn, Orchestrator,
    OrchestratorBuilder,
};
pub use plugin::{Plugin, PluginGroup, PluginGroupBuilder, Plugins};
pub use registry::{HookRegistry, Indexed, Phase};
pub use schema::SchemaBroadcaster;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::hooks::{
        AfterContextBuildingEvent, AfterContextBuildingHook, AfterParseEvent, AfterParseHook,
        AfterValidateEvent, AfterValidateHook, ContextErrorEvent, HookResult,
        OnContextBuildingEvent, OnExecuteDoneHook, OnExecuteEvent, OnNextEvent, OnParseEvent,
        OnResultEvent, OnSubscribeEvent, OnValidateEvent, PluginInitEvent, RequestInitEvent,
        SchemaChangeEvent, StreamHandlers, SubscribeErrorEvent, SubscribeHooks,
    };
    pub use crate::{
        Enveloped, Instrumentation, Orchestrator, OrchestratorBuilder, Phase, PhaseGuard,
        PhaseOutcome, Plugin, PluginGroup, PluginGroupBuilder, Plugins,
    };
}
