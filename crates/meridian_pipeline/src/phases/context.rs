use meridian_core::{PipelineError, RequestContext};
use serde_json::Value;

use crate::hooks::{
    AfterContextBuildingEvent, BreakFlag, ContextErrorEvent, ContextErrorHandler, HookResult,
    OnContextBuildingEvent, OnContextBuildingHook,
};
use crate::registry::Indexed;

/// Builds the final context for one request.
///
/// `partial` is merged first. A non-object `partial` is a usage error and is
/// returned as is. Any failure after that goes through `handlers`.
pub(crate) async fn run(
    hooks: &[Indexed<OnContextBuildingHook>],
    handlers: &[ContextErrorHandler],
    context: &RequestContext,
    partial: Option<Value>,
) -> Result<RequestContext, PipelineError> {
    if let Some(partial) = partial {
        context.extend(partial)?;
    }

    match build(hooks, context).await {
        Ok(()) => Ok(context.clone()),
        Err(err) => Err(handle_error(handlers, context, err)),
    }
}

async fn build(hooks: &[Indexed<OnContextBuildingHook>], context: &RequestContext) -> HookResult {
    let broken = BreakFlag::default();
    let mut after = Vec::new();

    for entry in hooks {
        let event = OnContextBuildingEvent::new(context.clone(), broken.clone());
        let hook = entry.hook.call(event).await?;
        if broken.is_set() {
            tracing::debug!(plugin = %entry.name, "context building stopped early");
            return Ok(());
        }
        after.extend(hook);
    }

    for hook in after {
        hook.call(AfterContextBuildingEvent::new(context.clone()))
            .await?;
    }
    Ok(())
}

fn handle_error(
    handlers: &[ContextErrorHandler],
    context: &RequestContext,
    error: PipelineError,
) -> PipelineError {
    tracing::debug!(%error, handlers = handlers.len(), "context building failed");
    let mut event = ContextErrorEvent::new(context, error);
    for handler in handlers {
        handler(&mut event);
    }
    event.into_error()
}
