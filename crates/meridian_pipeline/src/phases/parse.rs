use std::sync::Arc;

use meridian_core::{Document, ParseFn, ParseOptions, PipelineError, RequestContext};

use crate::hooks::{AfterParseEvent, OnParseEvent, OnParseHook, ParseState};
use crate::registry::Indexed;

/// Runs the parse phase for one source string.
pub(crate) async fn run(
    hooks: &[Indexed<OnParseHook>],
    parse_fn: ParseFn,
    context: &RequestContext,
    source: Arc<str>,
    options: ParseOptions,
) -> Result<Document, PipelineError> {
    let state = ParseState::shared(parse_fn);
    let mut after = Vec::new();

    for entry in hooks {
        let event = OnParseEvent::new(
            context.clone(),
            Arc::clone(&source),
            options.clone(),
            Arc::clone(&state),
        );
        after.extend(entry.hook.call(event).await?);
    }

    let engine = {
        let state = state.lock();
        state.result.is_none().then(|| Arc::clone(&state.parse_fn))
    };
    match engine {
        Some(parse) => {
            let result = parse(&source, &options);
            state.lock().result = Some(result);
        }
        None => tracing::debug!("parse result supplied by hook"),
    }

    tracing::trace!(after_hooks = after.len(), "settling parse result");
    for hook in after {
        hook.call(AfterParseEvent::new(context.clone(), Arc::clone(&state)))
            .await?;
    }

    let result = state.lock().result.take();
    match result {
        Some(Ok(document)) => Ok(document),
        Some(Err(err)) => Err(PipelineError::Parse(err)),
        None => Err(PipelineError::NoParseResult),
    }
}
