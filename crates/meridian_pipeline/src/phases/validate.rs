use std::sync::Arc;

use meridian_core::{OperationError, PipelineError, RequestContext, ValidateFn, ValidateParams};

use crate::hooks::{AfterValidateEvent, OnValidateEvent, OnValidateHook, ValidateState};
use crate::registry::Indexed;

/// Runs the validate phase. An empty list means the document is valid.
///
/// Rules added by hooks are checked after the validate function and their
/// errors appended, leaving `params.rules` untouched.
pub(crate) async fn run(
    hooks: &[Indexed<OnValidateHook>],
    validate_fn: ValidateFn,
    context: &RequestContext,
    params: ValidateParams,
) -> Result<Vec<OperationError>, PipelineError> {
    let state = ValidateState::shared(validate_fn);
    let mut after = Vec::new();

    for entry in hooks {
        let event = OnValidateEvent::new(context.clone(), params.clone(), Arc::clone(&state));
        after.extend(entry.hook.call(event).await?);
    }

    let engine = {
        let state = state.lock();
        state
            .result
            .is_none()
            .then(|| (Arc::clone(&state.validate_fn), state.added_rules.clone()))
    };
    match engine {
        Some((validate, added_rules)) => {
            let mut errors = validate(&params);
            errors.extend(
                added_rules
                    .iter()
                    .flat_map(|rule| rule.check(&params.schema, &params.document)),
            );
            state.lock().result = Some(errors);
        }
        None => tracing::debug!("validation result supplied by hook"),
    }

    let valid = state.lock().result.as_ref().is_none_or(Vec::is_empty);
    tracing::trace!(valid, after_hooks = after.len(), "settling validation result");
    for hook in after {
        let event = AfterValidateEvent::new(context.clone(), valid, Arc::clone(&state));
        hook.call(event).await?;
    }

    Ok(state.lock().result.take().unwrap_or_default())
}
