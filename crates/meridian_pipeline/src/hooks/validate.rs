use std::sync::Arc;

use meridian_core::{
    OperationError, RequestContext, ValidateFn, ValidateParams, ValidationRule,
};
use parking_lot::Mutex;
use serde_json::Value;

use super::{AfterHook, Hook, HookResult, Shared};

/// Before-validate hook.
pub type OnValidateHook = Hook<OnValidateEvent, Option<AfterValidateHook>>;

/// After-validate hook.
pub type AfterValidateHook = AfterHook<AfterValidateEvent>;

pub(crate) struct ValidateState {
    pub(crate) validate_fn: ValidateFn,
    pub(crate) added_rules: Vec<ValidationRule>,
    pub(crate) result: Option<Vec<OperationError>>,
}

impl ValidateState {
    pub(crate) fn shared(validate_fn: ValidateFn) -> Shared<Self> {
        Arc::new(Mutex::new(Self {
            validate_fn,
            added_rules: Vec::new(),
            result: None,
        }))
    }
}

/// Event passed to before-validate hooks.
pub struct OnValidateEvent {
    context: RequestContext,
    params: ValidateParams,
    state: Shared<ValidateState>,
}

impl OnValidateEvent {
    pub(crate) fn new(
        context: RequestContext,
        params: ValidateParams,
        state: Shared<ValidateState>,
    ) -> Self {
        Self {
            context,
            params,
            state,
        }
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Shallow-merges `extension` into the request context.
    ///
    /// # Errors
    ///
    /// Fails if `extension` is not an object.
    pub fn extend_context(&self, extension: Value) -> HookResult {
        self.context.extend(extension)
    }

    /// The parameters the validate function will receive.
    ///
    /// Rules added by hooks are not part of them; see
    /// [`added_rules`](Self::added_rules).
    #[must_use]
    pub fn params(&self) -> &ValidateParams {
        &self.params
    }

    /// Rules added by hooks so far in this invocation.
    #[must_use]
    pub fn added_rules(&self) -> Vec<ValidationRule> {
        self.state.lock().added_rules.clone()
    }

    /// Adds a rule for this invocation.
    ///
    /// The rule is checked on top of whatever the validate function applies,
    /// so the caller's rules or the engine defaults stay in force.
    pub fn add_validation_rule(&self, rule: ValidationRule) {
        self.state.lock().added_rules.push(rule);
    }

    /// The validate function that will run if no hook sets a result.
    #[must_use]
    pub fn validate_fn(&self) -> ValidateFn {
        Arc::clone(&self.state.lock().validate_fn)
    }

    /// Replaces the validate function for this invocation.
    pub fn set_validate_fn(&self, validate_fn: ValidateFn) {
        self.state.lock().validate_fn = validate_fn;
    }

    /// Supplies the validation result, skipping the validate function.
    pub fn set_result(&self, errors: Vec<OperationError>) {
        self.state.lock().result = Some(errors);
    }
}

/// Event passed to after-validate hooks.
pub struct AfterValidateEvent {
    context: RequestContext,
    valid: bool,
    state: Shared<ValidateState>,
}

impl AfterValidateEvent {
    pub(crate) fn new(context: RequestContext, valid: bool, state: Shared<ValidateState>) -> Self {
        Self {
            context,
            valid,
            state,
        }
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Shallow-merges `extension` into the request context.
    ///
    /// # Errors
    ///
    /// Fails if `extension` is not an object.
    pub fn extend_context(&self, extension: Value) -> HookResult {
        self.context.extend(extension)
    }

    /// Whether the document was valid before any after-hook ran.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// The current error list.
    #[must_use]
    pub fn result(&self) -> Vec<OperationError> {
        self.state.lock().result.clone().unwrap_or_default()
    }

    /// Replaces the error list.
    pub fn set_result(&self, errors: Vec<OperationError>) {
        self.state.lock().result = Some(errors);
    }
}
