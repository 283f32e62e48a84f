//! The plugin value and plugin groups.
//!
//! A [`Plugin`] is an immutable bundle of optional hook slots. Every slot is
//! optional and an empty plugin is valid: it takes part in ordering but
//! contributes nothing.
//!
//! ```ignore
//! use meridian_pipeline::prelude::*;
//!
//! let audit = Plugin::new("audit")
//!     .on_init(|event| {
//!         event.register_context_error_handler(|err| {
//!             tracing::warn!(error = %err.error(), "context building failed");
//!         });
//!         Ok(())
//!     })
//!     .on_execute(|event| async move {
//!         event.extend_context(json!({ "audited": true }))?;
//!         Ok(None)
//!     });
//! ```
//!
//! Plugins are identified by name. Names are used by [`PluginGroupBuilder`]
//! for positioning and appear in logs and hook errors; they need not be
//! unique.

mod group;

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use crate::hooks::{
    AfterContextBuildingHook, AfterParseHook, AfterValidateHook, Hook, HookResult,
    OnContextBuildingEvent, OnContextBuildingHook, OnExecuteDoneHook, OnExecuteEvent,
    OnExecuteHook, OnParseEvent, OnParseHook, OnSubscribeEvent, OnSubscribeHook,
    OnValidateEvent, OnValidateHook, PluginInitEvent, PluginInitHook, RequestInitEvent,
    RequestInitHook, SchemaChangeEvent, SchemaChangeHook, SubscribeHooks,
};
use crate::instrumentation::Instrumentation;
use crate::registry::Phase;

pub use group::{PluginGroup, PluginGroupBuilder, Plugins};

const ANONYMOUS: &str = "anonymous";

/// An ordered participant in the request pipeline.
#[derive(Clone)]
pub struct Plugin {
    name: Arc<str>,
    pub(crate) on_init: Option<PluginInitHook>,
    pub(crate) on_schema_change: Option<SchemaChangeHook>,
    pub(crate) on_request_init: Option<RequestInitHook>,
    pub(crate) on_parse: Option<OnParseHook>,
    pub(crate) on_validate: Option<OnValidateHook>,
    pub(crate) on_context_building: Option<OnContextBuildingHook>,
    pub(crate) on_execute: Option<OnExecuteHook>,
    pub(crate) on_subscribe: Option<OnSubscribeHook>,
    pub(crate) instrumentation: Option<Arc<dyn Instrumentation>>,
}

impl Default for Plugin {
    fn default() -> Self {
        Self::new(ANONYMOUS)
    }
}

impl Plugin {
    /// Creates an empty plugin.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            on_init: None,
            on_schema_change: None,
            on_request_init: None,
            on_parse: None,
            on_validate: None,
            on_context_building: None,
            on_execute: None,
            on_subscribe: None,
            instrumentation: None,
        }
    }

    /// The plugin's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Synchronous hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets the one-time initialization hook.
    #[must_use]
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut PluginInitEvent<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on_init = Some(Arc::new(hook));
        self
    }

    /// Sets the schema-change listener.
    #[must_use]
    pub fn on_schema_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SchemaChangeEvent<'_>) + Send + Sync + 'static,
    {
        self.on_schema_change = Some(Arc::new(hook));
        self
    }

    /// Sets the per-request initialization hook.
    #[must_use]
    pub fn on_request_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestInitEvent<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on_request_init = Some(Arc::new(hook));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phase hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets the before-parse hook.
    #[must_use]
    pub fn on_parse<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(OnParseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<AfterParseHook>>> + Send + 'static,
    {
        self.on_parse = Some(Hook::new(hook));
        self
    }

    /// Sets the before-validate hook.
    #[must_use]
    pub fn on_validate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(OnValidateEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<AfterValidateHook>>> + Send + 'static,
    {
        self.on_validate = Some(Hook::new(hook));
        self
    }

    /// Sets the before-context-building hook.
    #[must_use]
    pub fn on_context_building<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(OnContextBuildingEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<AfterContextBuildingHook>>> + Send + 'static,
    {
        self.on_context_building = Some(Hook::new(hook));
        self
    }

    /// Sets the before-execute hook.
    #[must_use]
    pub fn on_execute<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(OnExecuteEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<OnExecuteDoneHook>>> + Send + 'static,
    {
        self.on_execute = Some(Hook::new(hook));
        self
    }

    /// Sets the before-subscribe hook.
    #[must_use]
    pub fn on_subscribe<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(OnSubscribeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<SubscribeHooks>>> + Send + 'static,
    {
        self.on_subscribe = Some(Hook::new(hook));
        self
    }

    /// Attaches phase instrumentation.
    #[must_use]
    pub fn with_instrumentation(mut self, instrumentation: impl Instrumentation) -> Self {
        self.instrumentation = Some(Arc::new(instrumentation));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns true if the plugin declares a hook for `phase`.
    ///
    /// [`Phase::Init`] counts the plugin init hook only.
    #[must_use]
    pub fn has_hook(&self, phase: Phase) -> bool {
        match phase {
            Phase::Init => self.on_init.is_some(),
            Phase::Parse => self.on_parse.is_some(),
            Phase::Validate => self.on_validate.is_some(),
            Phase::Context => self.on_context_building.is_some(),
            Phase::Execute => self.on_execute.is_some(),
            Phase::Subscribe => self.on_subscribe.is_some(),
        }
    }

    /// Returns true if the plugin fills no slot at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Phase::ALL.iter().all(|phase| !self.has_hook(*phase))
            && self.on_schema_change.is_none()
            && self.on_request_init.is_none()
            && self.instrumentation.is_none()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = Phase::ALL
            .iter()
            .filter(|phase| self.has_hook(**phase))
            .map(|phase| phase.as_str())
            .collect();
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("hooks", &hooks)
            .field("on_schema_change", &self.on_schema_change.is_some())
            .field("on_request_init", &self.on_request_init.is_some())
            .field("instrumentation", &self.instrumentation.is_some())
            .finish()
    }
}
