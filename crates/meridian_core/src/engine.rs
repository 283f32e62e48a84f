//! The engine capability: four replaceable phase functions.
//!
//! An [`Engine`] is supplied once when the orchestrator is built. Hooks may
//! swap any of its functions for a single invocation (`set_parse_fn` and
//! friends), so the functions are stored as shared trait objects:
//!
//! | Phase | Function type | Shape |
//! |-------|---------------|-------|
//! | parse | [`ParseFn`] | `(&str, &ParseOptions) -> Result<Document, OperationError>` |
//! | validate | [`ValidateFn`] | `(&ValidateParams) -> Vec<OperationError>` |
//! | execute | [`ExecuteFn`] | `(ExecutionArgs) -> Future<Result<ExecutionOutput, PipelineError>>` |
//! | subscribe | [`SubscribeFn`] | same as execute |
//!
//! # Example
//!
//! ```ignore
//! let engine = Engine::new()
//!     .with_parse(|source, _options| Ok(Document::new(source.to_owned())))
//!     .with_validate(|params| {
//!         let rules = params.rules.as_deref().unwrap_or_default();
//!         rules.iter().flat_map(|rule| rule.check(&params.schema, &params.document)).collect()
//!     })
//!     .with_execute(|args| async move {
//!         Ok(ExecutionResult::from_data(json!({ "ok": true })).into())
//!     });
//! ```

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::error::{BoxFuture, PipelineError};
use crate::handle::{Document, Resolver, Schema, TypeInfo};
use crate::result::{ExecutionOutput, OperationError};

// ─────────────────────────────────────────────────────────────────────────────
// Phase inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Options forwarded to the parse function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Skip recording source locations.
    pub no_location: bool,
    /// Upper bound on tokens the parser may consume.
    pub max_tokens: Option<usize>,
}

/// Options forwarded to the validate function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Stop after this many errors.
    pub max_errors: Option<usize>,
}

/// A named validation rule.
///
/// Rules in [`ValidateParams::rules`] are applied by the engine's validate
/// function. Rules added by validate hooks are checked by the pipeline on top
/// of that, so they never displace the engine defaults.
#[derive(Clone)]
pub struct ValidationRule {
    name: Arc<str>,
    check: Arc<dyn Fn(&Schema, &Document) -> Vec<OperationError> + Send + Sync>,
}

impl ValidationRule {
    /// Creates a rule from a check function.
    #[must_use]
    pub fn new<F>(name: impl Into<Arc<str>>, check: F) -> Self
    where
        F: Fn(&Schema, &Document) -> Vec<OperationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// The rule's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the rule against a document.
    #[must_use]
    pub fn check(&self, schema: &Schema, document: &Document) -> Vec<OperationError> {
        (self.check)(schema, document)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValidationRule").field(&self.name).finish()
    }
}

/// Inputs to the validate phase.
#[derive(Debug, Clone)]
pub struct ValidateParams {
    /// Schema to validate against.
    pub schema: Schema,
    /// Document under validation.
    pub document: Document,
    /// Rules to apply. `None` lets the engine use its defaults.
    pub rules: Option<Vec<ValidationRule>>,
    /// Optional engine type information.
    pub type_info: Option<TypeInfo>,
    /// Validation options.
    pub options: ValidateOptions,
}

impl ValidateParams {
    /// Creates parameters with engine-default rules.
    #[must_use]
    pub fn new(schema: Schema, document: Document) -> Self {
        Self {
            schema,
            document,
            rules: None,
            type_info: None,
            options: ValidateOptions::default(),
        }
    }

    /// Sets explicit rules.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Sets type information.
    #[must_use]
    pub fn with_type_info(mut self, type_info: TypeInfo) -> Self {
        self.type_info = Some(type_info);
        self
    }

    /// Sets validation options.
    #[must_use]
    pub fn with_options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }
}

/// Inputs to the execute and subscribe phases.
#[derive(Debug, Clone)]
pub struct ExecutionArgs {
    /// Schema to execute against.
    pub schema: Schema,
    /// The parsed, validated document.
    pub document: Document,
    /// Root value handed to top-level resolvers.
    pub root_value: Option<Value>,
    /// The request context. Hooks extend this record in place.
    pub context: RequestContext,
    /// Operation variables.
    pub variables: Map<String, Value>,
    /// Operation to run when the document holds several.
    pub operation_name: Option<String>,
    /// Default field resolver override.
    pub field_resolver: Option<Resolver>,
    /// Abstract type resolver override.
    pub type_resolver: Option<Resolver>,
}

impl ExecutionArgs {
    /// Creates arguments with no variables, root value or resolvers.
    #[must_use]
    pub fn new(schema: Schema, document: Document, context: RequestContext) -> Self {
        Self {
            schema,
            document,
            root_value: None,
            context,
            variables: Map::new(),
            operation_name: None,
            field_resolver: None,
            type_resolver: None,
        }
    }

    /// Sets the root value.
    #[must_use]
    pub fn with_root_value(mut self, root_value: Value) -> Self {
        self.root_value = Some(root_value);
        self
    }

    /// Sets the variables.
    #[must_use]
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    /// Sets the field resolver.
    #[must_use]
    pub fn with_field_resolver(mut self, resolver: Resolver) -> Self {
        self.field_resolver = Some(resolver);
        self
    }

    /// Sets the type resolver.
    #[must_use]
    pub fn with_type_resolver(mut self, resolver: Resolver) -> Self {
        self.type_resolver = Some(resolver);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine functions
// ─────────────────────────────────────────────────────────────────────────────

/// Parses source text into a [`Document`].
pub type ParseFn =
    Arc<dyn Fn(&str, &ParseOptions) -> Result<Document, OperationError> + Send + Sync>;

/// Validates a document, returning every finding. Empty means valid.
pub type ValidateFn = Arc<dyn Fn(&ValidateParams) -> Vec<OperationError> + Send + Sync>;

/// Executes an operation.
pub type ExecuteFn = Arc<
    dyn Fn(ExecutionArgs) -> BoxFuture<'static, Result<ExecutionOutput, PipelineError>>
        + Send
        + Sync,
>;

/// Sets up a subscription. Same shape as [`ExecuteFn`].
pub type SubscribeFn = ExecuteFn;

/// Boxes a closure as a [`ParseFn`].
pub fn parse_fn<F>(parse: F) -> ParseFn
where
    F: Fn(&str, &ParseOptions) -> Result<Document, OperationError> + Send + Sync + 'static,
{
    Arc::new(parse)
}

/// Boxes a closure as a [`ValidateFn`].
pub fn validate_fn<F>(validate: F) -> ValidateFn
where
    F: Fn(&ValidateParams) -> Vec<OperationError> + Send + Sync + 'static,
{
    Arc::new(validate)
}

/// Boxes an async closure as an [`ExecuteFn`].
pub fn execute_fn<F, Fut>(execute: F) -> ExecuteFn
where
    F: Fn(ExecutionArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ExecutionOutput, PipelineError>> + Send + 'static,
{
    Arc::new(
        move |args| -> BoxFuture<'static, Result<ExecutionOutput, PipelineError>> {
            Box::pin(execute(args))
        },
    )
}

/// Boxes an async closure as a [`SubscribeFn`].
pub fn subscribe_fn<F, Fut>(subscribe: F) -> SubscribeFn
where
    F: Fn(ExecutionArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ExecutionOutput, PipelineError>> + Send + 'static,
{
    execute_fn(subscribe)
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// The four phase functions an orchestrator drives.
///
/// Any function left unset fails when called: parse and validate report an
/// [`OperationError`], execute and subscribe fail with
/// [`PipelineError::EngineNotConfigured`]. Plugins can still supply the
/// function per invocation through the `set_*_fn` hook controls.
#[derive(Clone)]
pub struct Engine {
    parse: ParseFn,
    validate: ValidateFn,
    execute: ExecuteFn,
    subscribe: SubscribeFn,
}

fn not_configured(phase: &'static str) -> OperationError {
    OperationError::new(PipelineError::EngineNotConfigured(phase).to_string())
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            parse: parse_fn(|_, _| Err(not_configured("parse"))),
            validate: validate_fn(|_| vec![not_configured("validate")]),
            execute: execute_fn(|_| async { Err(PipelineError::EngineNotConfigured("execute")) }),
            subscribe: subscribe_fn(|_| async {
                Err(PipelineError::EngineNotConfigured("subscribe"))
            }),
        }
    }
}

impl Engine {
    /// Creates an engine with every function unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parse function.
    #[must_use]
    pub fn with_parse<F>(mut self, parse: F) -> Self
    where
        F: Fn(&str, &ParseOptions) -> Result<Document, OperationError> + Send + Sync + 'static,
    {
        self.parse = parse_fn(parse);
        self
    }

    /// Sets the validate function.
    #[must_use]
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&ValidateParams) -> Vec<OperationError> + Send + Sync + 'static,
    {
        self.validate = validate_fn(validate);
        self
    }

    /// Sets the execute function.
    #[must_use]
    pub fn with_execute<F, Fut>(mut self, execute: F) -> Self
    where
        F: Fn(ExecutionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ExecutionOutput, PipelineError>> + Send + 'static,
    {
        self.execute = execute_fn(execute);
        self
    }

    /// Sets the subscribe function.
    #[must_use]
    pub fn with_subscribe<F, Fut>(mut self, subscribe: F) -> Self
    where
        F: Fn(ExecutionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ExecutionOutput, PipelineError>> + Send + 'static,
    {
        self.subscribe = subscribe_fn(subscribe);
        self
    }

    /// The parse function.
    #[must_use]
    pub fn parse(&self) -> &ParseFn {
        &self.parse
    }

    /// The validate function.
    #[must_use]
    pub fn validate(&self) -> &ValidateFn {
        &self.validate
    }

    /// The execute function.
    #[must_use]
    pub fn execute(&self) -> &ExecuteFn {
        &self.execute
    }

    /// The subscribe function.
    #[must_use]
    pub fn subscribe(&self) -> &SubscribeFn {
        &self.subscribe
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
