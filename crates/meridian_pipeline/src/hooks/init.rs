use std::sync::Arc;

use meridian_core::{RequestContext, Schema};
use serde_json::Value;

use super::HookResult;
use super::context::{ContextErrorEvent, ContextErrorHandler};
use crate::plugin::Plugin;
use crate::schema::SchemaBroadcaster;

/// One-time plugin initialization hook.
pub type PluginInitHook = Arc<dyn Fn(&mut PluginInitEvent<'_>) -> HookResult + Send + Sync>;

/// Schema-change listener.
pub type SchemaChangeHook = Arc<dyn Fn(&SchemaChangeEvent<'_>) + Send + Sync>;

/// Per-request initialization hook, run by `Orchestrator::init`.
pub type RequestInitHook = Arc<dyn Fn(&RequestInitEvent<'_>) -> HookResult + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// PluginInitEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Event passed to a plugin's init hook.
///
/// Plugins added here are spliced in directly after the initializing plugin
/// and are initialized later in the same pass.
pub struct PluginInitEvent<'a> {
    plugins: &'a [Plugin],
    index: usize,
    schema: &'a SchemaBroadcaster,
    context_error_handlers: &'a mut Vec<ContextErrorHandler>,
    added: Vec<Plugin>,
}

impl<'a> PluginInitEvent<'a> {
    pub(crate) fn new(
        plugins: &'a [Plugin],
        index: usize,
        schema: &'a SchemaBroadcaster,
        context_error_handlers: &'a mut Vec<ContextErrorHandler>,
    ) -> Self {
        Self {
            plugins,
            index,
            schema,
            context_error_handlers,
            added: Vec::new(),
        }
    }

    /// The full plugin list as it stands, including plugins spliced so far.
    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        self.plugins
    }

    /// Position of the plugin being initialized.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Queues `plugin` to be inserted after the current plugin.
    ///
    /// Plugins queued by one init hook keep the order they were added in.
    pub fn add_plugin(&mut self, plugin: impl Into<Plugin>) {
        self.added.push(plugin.into());
    }

    /// Replaces the schema, with this plugin as origin.
    pub fn set_schema(&self, schema: Schema) {
        self.schema.replace(schema, Some(self.index));
    }

    /// The schema set so far, if any.
    #[must_use]
    pub fn schema(&self) -> Option<Schema> {
        self.schema.current()
    }

    /// Registers a handler for context-building failures.
    pub fn register_context_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(&mut ContextErrorEvent<'_>) + Send + Sync + 'static,
    {
        self.context_error_handlers.push(Arc::new(handler));
    }

    pub(crate) fn into_added(self) -> Vec<Plugin> {
        self.added
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SchemaChangeEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Event passed to schema-change listeners.
pub struct SchemaChangeEvent<'a> {
    schema: Schema,
    index: usize,
    broadcaster: &'a SchemaBroadcaster,
}

impl<'a> SchemaChangeEvent<'a> {
    pub(crate) fn new(schema: Schema, index: usize, broadcaster: &'a SchemaBroadcaster) -> Self {
        Self {
            schema,
            index,
            broadcaster,
        }
    }

    /// The new schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Replaces the schema again, with the listening plugin as origin.
    ///
    /// Every other listener is notified of the replacement before this call
    /// returns.
    pub fn replace_schema(&self, schema: Schema) {
        self.broadcaster.replace(schema, Some(self.index));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RequestInitEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Event passed to per-request init hooks.
pub struct RequestInitEvent<'a> {
    context: &'a RequestContext,
    index: usize,
    broadcaster: &'a SchemaBroadcaster,
}

impl<'a> RequestInitEvent<'a> {
    pub(crate) fn new(
        context: &'a RequestContext,
        index: usize,
        broadcaster: &'a SchemaBroadcaster,
    ) -> Self {
        Self {
            context,
            index,
            broadcaster,
        }
    }

    /// The initial request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        self.context
    }

    /// Shallow-merges `extension` into the request context.
    ///
    /// # Errors
    ///
    /// Fails if `extension` is not an object.
    pub fn extend_context(&self, extension: Value) -> HookResult {
        self.context.extend(extension)
    }

    /// Replaces the schema, with this plugin as origin.
    pub fn set_schema(&self, schema: Schema) {
        self.broadcaster.replace(schema, Some(self.index));
    }

    /// The current schema, if any.
    #[must_use]
    pub fn schema(&self) -> Option<Schema> {
        self.broadcaster.current()
    }
}
