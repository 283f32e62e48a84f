//! Context extension plugin.

use core::future::Future;
use std::sync::Arc;

use meridian_core::{BoxFuture, PipelineError, RequestContext};
use meridian_pipeline::Plugin;
use serde_json::Value;

type ContextFactory =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Value, PipelineError>> + Send + Sync>;

/// Computes a value from the current context and merges it in during
/// context building.
///
/// The factory must resolve to a JSON object. Anything else fails context
/// building with [`PipelineError::InvalidContextExtension`], which then goes
/// through the registered context-error handlers.
///
/// ```ignore
/// let user = ExtendContextPlugin::new(|ctx| async move {
///     let token = ctx.get("token");
///     Ok(json!({ "user": lookup(token).await? }))
/// });
/// ```
#[derive(Clone)]
pub struct ExtendContextPlugin {
    factory: ContextFactory,
}

impl ExtendContextPlugin {
    /// Creates a plugin from an async factory.
    #[must_use]
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, PipelineError>> + Send + 'static,
    {
        Self {
            factory: Arc::new(
                move |context| -> BoxFuture<'static, Result<Value, PipelineError>> {
                    Box::pin(factory(context))
                },
            ),
        }
    }
}

impl From<ExtendContextPlugin> for Plugin {
    fn from(plugin: ExtendContextPlugin) -> Self {
        Plugin::new("meridian::extend_context").on_context_building(move |event| {
            let pending = (plugin.factory)(event.context().clone());
            async move {
                let extension = pending.await?;
                event.extend_context(extension)?;
                Ok(None)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn factory_receives_the_current_context() {
        let plugin = ExtendContextPlugin::new(|context: RequestContext| async move {
            Ok(json!({ "seen": context.len() }))
        });
        let context = RequestContext::new();
        context.insert("token", json!("abc"));

        let value = tokio_test::block_on((plugin.factory)(context)).expect("factory should succeed");
        assert_eq!(value, json!({ "seen": 1 }));
    }
}
