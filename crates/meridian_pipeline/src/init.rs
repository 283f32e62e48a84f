//! One-time plugin initialization.

use meridian_core::PipelineError;

use crate::hooks::{ContextErrorHandler, PluginInitEvent};
use crate::plugin::Plugin;
use crate::schema::SchemaBroadcaster;

/// Outcome of running every init hook.
pub(crate) struct Initialized {
    pub(crate) plugins: Vec<Plugin>,
    pub(crate) context_error_handlers: Vec<ContextErrorHandler>,
}

/// Runs init hooks in list order.
///
/// The list length is re-read on every iteration, so plugins spliced in by
/// an init hook are initialized later in the same pass.
pub(crate) fn initialize(
    mut plugins: Vec<Plugin>,
    schema: &SchemaBroadcaster,
) -> Result<Initialized, PipelineError> {
    let mut context_error_handlers = Vec::new();
    let mut index = 0;

    while index < plugins.len() {
        let Some(hook) = plugins[index].on_init.clone() else {
            index += 1;
            continue;
        };

        let added = {
            let mut event =
                PluginInitEvent::new(&plugins, index, schema, &mut context_error_handlers);
            hook(&mut event).map_err(|err| init_failure(&plugins[index], err))?;
            event.into_added()
        };

        if !added.is_empty() {
            tracing::debug!(
                plugin = plugins[index].name(),
                added = added.len(),
                "splicing plugins added during init"
            );
            let at = index + 1;
            plugins.splice(at..at, added);
        }
        tracing::trace!(plugin = plugins[index].name(), index, "plugin initialized");
        index += 1;
    }

    Ok(Initialized {
        plugins,
        context_error_handlers,
    })
}

fn init_failure(plugin: &Plugin, err: PipelineError) -> PipelineError {
    tracing::error!(plugin = plugin.name(), error = %err, "plugin init failed");
    match err {
        PipelineError::PluginInit { .. } => err,
        other => PipelineError::PluginInit {
            plugin: plugin.name().to_owned(),
            message: other.to_string(),
        },
    }
}
