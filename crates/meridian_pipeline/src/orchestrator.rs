//! The lifecycle facade.
//!
//! An [`Orchestrator`] is built once from an [`Engine`] and an ordered plugin
//! list. Building runs every plugin init hook, derives the
//! [`HookRegistry`] and delivers the initial schema broadcast; from then on
//! the plugin list and registry are frozen.
//!
//! Each request goes through `init`, `parse`, `validate`, `build_context`
//! and then `execute` or `subscribe`. The phase functions are bound to the
//! request's [`RequestContext`], and every hook of that request sees the same
//! context record.
//!
//! ```ignore
//! let orchestrator = Orchestrator::builder()
//!     .with_engine(engine)
//!     .add_plugins(DefaultPlugins.build())
//!     .add_plugin(SchemaPlugin::new(schema))
//!     .build()?;
//!
//! let ctx = RequestContext::new();
//! orchestrator.init(&ctx)?;
//! let document = orchestrator.parse(&ctx)("{ hello }", ParseOptions::default()).await?;
//! let schema = orchestrator.current_schema().ok_or(...)?;
//! let errors = orchestrator.validate(&ctx)(ValidateParams::new(schema.clone(), document.clone())).await?;
//! let ctx = orchestrator.build_context(&ctx)(None).await?;
//! let output = orchestrator.execute(ExecutionArgs::new(schema, document, ctx)).await?;
//! ```

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use meridian_core::{
    BoxFuture, Document, Engine, ExecuteFn, ExecutionArgs, ExecutionOutput, OperationError,
    ParseOptions, PipelineError, RequestContext, Schema, SubscribeFn, ValidateParams,
};
use serde_json::Value;
use tracing::Instrument;

use crate::documents::DocumentSources;
use crate::hooks::RequestInitEvent;
use crate::init::{Initialized, initialize};
use crate::instrumentation::PhaseOutcome;
use crate::phases;
use crate::plugin::{Plugin, Plugins};
use crate::registry::{HookRegistry, Phase};
use crate::schema::SchemaBroadcaster;

/// Parse function bound to one request context.
pub type EnvelopedParseFn = Arc<
    dyn Fn(&str, ParseOptions) -> BoxFuture<'static, Result<Document, PipelineError>>
        + Send
        + Sync,
>;

/// Validate function bound to one request context.
pub type EnvelopedValidateFn = Arc<
    dyn Fn(ValidateParams) -> BoxFuture<'static, Result<Vec<OperationError>, PipelineError>>
        + Send
        + Sync,
>;

/// Context factory bound to one request context.
///
/// The optional argument is shallow-merged into the context before any
/// context-building hook runs.
pub type ContextFactoryFn = Arc<
    dyn Fn(Option<Value>) -> BoxFuture<'static, Result<RequestContext, PipelineError>>
        + Send
        + Sync,
>;

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    engine: Engine,
    plugins: Vec<Plugin>,
    schema: Option<Schema>,
}

impl OrchestratorBuilder {
    /// Creates a builder with an unconfigured engine and no plugins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine functions.
    #[must_use]
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Appends one plugin.
    #[must_use]
    pub fn add_plugin(mut self, plugin: impl Into<Plugin>) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    /// Appends a plugin, a plugin group or a list of plugins.
    #[must_use]
    pub fn add_plugins(mut self, plugins: impl Plugins) -> Self {
        plugins.add_to(&mut self.plugins);
        self
    }

    /// Seeds the schema before any init hook runs.
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Initializes every plugin and freezes the hook registry.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PluginInit`] if an init hook fails. No
    /// orchestrator is produced in that case.
    pub fn build(self) -> Result<Orchestrator, PipelineError> {
        let schema = SchemaBroadcaster::new(self.schema);
        let Initialized {
            plugins,
            context_error_handlers,
        } = initialize(self.plugins, &schema)?;

        let registry = HookRegistry::from_plugins(&plugins, context_error_handlers);
        schema.finish_init(registry.schema_listeners());
        tracing::debug!(plugins = plugins.len(), ?registry, "orchestrator built");

        Ok(Orchestrator {
            inner: Arc::new(Inner {
                engine: self.engine,
                plugins,
                registry,
                schema,
                documents: DocumentSources::default(),
            }),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    engine: Engine,
    plugins: Vec<Plugin>,
    registry: HookRegistry,
    schema: SchemaBroadcaster,
    documents: DocumentSources,
}

/// The lifecycle facade. Cheap to clone; clones share one pipeline.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Runs every per-request init hook against `context`, in plugin order.
    ///
    /// # Errors
    ///
    /// Propagates the first hook error; later hooks do not run.
    pub fn init(&self, context: &RequestContext) -> Result<(), PipelineError> {
        let _span = tracing::debug_span!("meridian.init").entered();
        let inner = &self.inner;
        let guard = inner.registry.instrumentation.enter_all(Phase::Init, context);
        let result = inner.registry.request_init.iter().try_for_each(|entry| {
            (entry.hook)(&RequestInitEvent::new(context, entry.plugin, &inner.schema))
        });
        guard.finish(PhaseOutcome::from_result(&result));
        result
    }

    /// Returns the parse function for `context`.
    #[must_use]
    pub fn parse(&self, context: &RequestContext) -> EnvelopedParseFn {
        let inner = Arc::clone(&self.inner);
        let context = context.clone();
        Arc::new(
            move |source: &str,
                  options: ParseOptions|
                  -> BoxFuture<'static, Result<Document, PipelineError>> {
                let inner = Arc::clone(&inner);
                let context = context.clone();
                let source: Arc<str> = Arc::from(source);
                Box::pin(
                    async move { inner.parse(&context, source, options).await }
                        .instrument(tracing::debug_span!("meridian.parse")),
                )
            },
        )
    }

    /// Returns the validate function for `context`.
    #[must_use]
    pub fn validate(&self, context: &RequestContext) -> EnvelopedValidateFn {
        let inner = Arc::clone(&self.inner);
        let context = context.clone();
        Arc::new(
            move |params: ValidateParams| -> BoxFuture<'static, Result<Vec<OperationError>, PipelineError>> {
                let inner = Arc::clone(&inner);
                let context = context.clone();
                Box::pin(
                    async move { inner.validate(&context, params).await }
                        .instrument(tracing::debug_span!("meridian.validate")),
                )
            },
        )
    }

    /// Returns the context factory for `context`.
    #[must_use]
    pub fn build_context(&self, context: &RequestContext) -> ContextFactoryFn {
        let inner = Arc::clone(&self.inner);
        let context = context.clone();
        Arc::new(
            move |partial: Option<Value>| -> BoxFuture<'static, Result<RequestContext, PipelineError>> {
                let inner = Arc::clone(&inner);
                let context = context.clone();
                Box::pin(
                    async move { inner.build_context(&context, partial).await }
                        .instrument(tracing::debug_span!("meridian.context")),
                )
            },
        )
    }

    /// Runs the execute phase.
    ///
    /// # Errors
    ///
    /// Propagates hook errors and errors returned by the execute function.
    pub async fn execute(&self, args: ExecutionArgs) -> Result<ExecutionOutput, PipelineError> {
        self.inner
            .execute(args)
            .instrument(tracing::debug_span!("meridian.execute"))
            .await
    }

    /// Runs the subscribe phase.
    ///
    /// # Errors
    ///
    /// Propagates hook errors and errors returned by the subscribe function.
    /// Errors raised later by a returned stream are delivered through the
    /// stream.
    pub async fn subscribe(&self, args: ExecutionArgs) -> Result<ExecutionOutput, PipelineError> {
        self.inner
            .subscribe(args)
            .instrument(tracing::debug_span!("meridian.subscribe"))
            .await
    }

    /// The execute phase as a standalone function.
    #[must_use]
    pub fn execute_fn(&self) -> ExecuteFn {
        let this = self.clone();
        Arc::new(
            move |args: ExecutionArgs| -> BoxFuture<'static, Result<ExecutionOutput, PipelineError>> {
                let this = this.clone();
                Box::pin(async move { this.execute(args).await })
            },
        )
    }

    /// The subscribe phase as a standalone function.
    #[must_use]
    pub fn subscribe_fn(&self) -> SubscribeFn {
        let this = self.clone();
        Arc::new(
            move |args: ExecutionArgs| -> BoxFuture<'static, Result<ExecutionOutput, PipelineError>> {
                let this = this.clone();
                Box::pin(async move { this.subscribe(args).await })
            },
        )
    }

    /// The current schema, if any plugin or the builder set one.
    #[must_use]
    pub fn current_schema(&self) -> Option<Schema> {
        self.inner.schema.current()
    }

    /// The source text `document` was parsed from, while the document lives.
    #[must_use]
    pub fn document_source(&self, document: &Document) -> Option<Arc<str>> {
        self.inner.documents.get(document)
    }

    /// The initialized plugin list, including plugins added during init.
    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        &self.inner.plugins
    }

    /// The frozen hook registry.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        &self.inner.registry
    }

    /// Creates a request context from `initial`, runs `init` and returns the
    /// phase functions bound to it.
    ///
    /// # Errors
    ///
    /// Fails if `initial` is not an object or a per-request init hook fails.
    pub fn enveloped(&self, initial: Option<Value>) -> Result<Enveloped, PipelineError> {
        let context = match initial {
            Some(value) => RequestContext::from_value(value)?,
            None => RequestContext::new(),
        };
        self.init(&context)?;
        Ok(Enveloped {
            orchestrator: self.clone(),
            context,
        })
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("engine", &self.inner.engine)
            .field("plugins", &self.inner.plugins)
            .field("registry", &self.inner.registry)
            .field("schema", &self.inner.schema.current())
            .finish()
    }
}

impl Inner {
    async fn instrumented<T, Fut>(
        &self,
        phase: Phase,
        context: &RequestContext,
        phase_future: Fut,
    ) -> Result<T, PipelineError>
    where
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let guard = self.registry.instrumentation.enter_all(phase, context);
        let result = phase_future.await;
        guard.finish(PhaseOutcome::from_result(&result));
        result
    }

    async fn parse(
        &self,
        context: &RequestContext,
        source: Arc<str>,
        options: ParseOptions,
    ) -> Result<Document, PipelineError> {
        let run = async {
            let document = phases::parse::run(
                &self.registry.parse,
                Arc::clone(self.engine.parse()),
                context,
                Arc::clone(&source),
                options,
            )
            .await?;
            self.documents.record(&document, source);
            Ok(document)
        };
        self.instrumented(Phase::Parse, context, run).await
    }

    async fn validate(
        &self,
        context: &RequestContext,
        params: ValidateParams,
    ) -> Result<Vec<OperationError>, PipelineError> {
        let run = phases::validate::run(
            &self.registry.validate,
            Arc::clone(self.engine.validate()),
            context,
            params,
        );
        self.instrumented(Phase::Validate, context, run).await
    }

    async fn build_context(
        &self,
        context: &RequestContext,
        partial: Option<Value>,
    ) -> Result<RequestContext, PipelineError> {
        let run = phases::context::run(
            &self.registry.context,
            &self.registry.context_error_handlers,
            context,
            partial,
        );
        self.instrumented(Phase::Context, context, run).await
    }

    async fn execute(&self, args: ExecutionArgs) -> Result<ExecutionOutput, PipelineError> {
        let context = args.context.clone();
        let run = phases::execute::execute(
            &self.registry.execute,
            Arc::clone(self.engine.execute()),
            args,
        );
        self.instrumented(Phase::Execute, &context, run).await
    }

    async fn subscribe(&self, args: ExecutionArgs) -> Result<ExecutionOutput, PipelineError> {
        let context = args.context.clone();
        let run = phases::execute::subscribe(
            &self.registry.subscribe,
            Arc::clone(self.engine.subscribe()),
            args,
        );
        self.instrumented(Phase::Subscribe, &context, run).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Enveloped
// ─────────────────────────────────────────────────────────────────────────────

/// The phase functions of one request, bound to its context.
#[derive(Clone, Debug)]
pub struct Enveloped {
    orchestrator: Orchestrator,
    context: RequestContext,
}

impl Enveloped {
    /// The request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// The schema current at the time of the call.
    #[must_use]
    pub fn schema(&self) -> Option<Schema> {
        self.orchestrator.current_schema()
    }

    /// Parses `source` with default options.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::parse`].
    pub async fn parse(&self, source: &str) -> Result<Document, PipelineError> {
        (self.orchestrator.parse(&self.context))(source, ParseOptions::default()).await
    }

    /// Validates `params`.
    ///
    /// # Errors
    ///
    /// Propagates hook errors.
    pub async fn validate(
        &self,
        params: ValidateParams,
    ) -> Result<Vec<OperationError>, PipelineError> {
        (self.orchestrator.validate(&self.context))(params).await
    }

    /// Builds the final context.
    ///
    /// # Errors
    ///
    /// Returns the error left by the context-error handlers.
    pub async fn build_context(
        &self,
        partial: Option<Value>,
    ) -> Result<RequestContext, PipelineError> {
        (self.orchestrator.build_context(&self.context))(partial).await
    }

    /// Execution arguments for `document` against the current schema.
    #[must_use]
    pub fn execution_args(&self, document: Document) -> Option<ExecutionArgs> {
        let schema = self.schema()?;
        Some(ExecutionArgs::new(schema, document, self.context.clone()))
    }

    /// Runs the execute phase.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::execute`].
    pub async fn execute(&self, args: ExecutionArgs) -> Result<ExecutionOutput, PipelineError> {
        self.orchestrator.execute(args).await
    }

    /// Runs the subscribe phase.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::subscribe`].
    pub async fn subscribe(&self, args: ExecutionArgs) -> Result<ExecutionOutput, PipelineError> {
        self.orchestrator.subscribe(args).await
    }
}
