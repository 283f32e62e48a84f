//! Schema-providing plugins.

use std::sync::Arc;

use meridian_core::{RequestContext, Schema};
use meridian_pipeline::Plugin;

/// Sets a fixed schema when the orchestrator is built.
///
/// Placed first in the plugin list, every later plugin's init hook sees the
/// schema through `PluginInitEvent::schema`.
#[derive(Debug, Clone)]
pub struct SchemaPlugin {
    schema: Schema,
}

impl SchemaPlugin {
    /// Creates a plugin providing `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

impl From<SchemaPlugin> for Plugin {
    fn from(plugin: SchemaPlugin) -> Self {
        Plugin::new("meridian::schema").on_init(move |event| {
            event.set_schema(plugin.schema.clone());
            Ok(())
        })
    }
}

type SchemaResolver = Arc<dyn Fn(&RequestContext) -> Option<Schema> + Send + Sync>;

/// Picks the schema per request.
///
/// The resolver runs in the per-request init hook. Returning the schema
/// already in place is free; returning a different handle replaces it and
/// notifies schema listeners.
#[derive(Clone)]
pub struct LazySchemaPlugin {
    resolve: SchemaResolver,
}

impl LazySchemaPlugin {
    /// Creates a plugin that calls `resolve` for every request.
    #[must_use]
    pub fn new<F>(resolve: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<Schema> + Send + Sync + 'static,
    {
        Self {
            resolve: Arc::new(resolve),
        }
    }
}

impl From<LazySchemaPlugin> for Plugin {
    fn from(plugin: LazySchemaPlugin) -> Self {
        Plugin::new("meridian::lazy_schema").on_request_init(move |event| {
            if let Some(schema) = (plugin.resolve)(event.context()) {
                event.set_schema(schema);
            }
            Ok(())
        })
    }
}
