use std::sync::Arc;

use meridian_core::{Document, OperationError, ParseFn, ParseOptions, RequestContext};
use parking_lot::Mutex;
use serde_json::Value;

use super::{AfterHook, Hook, HookResult, Shared};

/// Before-parse hook.
pub type OnParseHook = Hook<OnParseEvent, Option<AfterParseHook>>;

/// After-parse hook.
pub type AfterParseHook = AfterHook<AfterParseEvent>;

pub(crate) struct ParseState {
    pub(crate) parse_fn: ParseFn,
    pub(crate) result: Option<Result<Document, OperationError>>,
}

impl ParseState {
    pub(crate) fn shared(parse_fn: ParseFn) -> Shared<Self> {
        Arc::new(Mutex::new(Self {
            parse_fn,
            result: None,
        }))
    }
}

/// Event passed to before-parse hooks.
pub struct OnParseEvent {
    context: RequestContext,
    source: Arc<str>,
    options: ParseOptions,
    state: Shared<ParseState>,
}

impl OnParseEvent {
    pub(crate) fn new(
        context: RequestContext,
        source: Arc<str>,
        options: ParseOptions,
        state: Shared<ParseState>,
    ) -> Self {
        Self {
            context,
            source,
            options,
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

    /// The source text being parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parse options.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The parse function that will run if no hook sets a result.
    #[must_use]
    pub fn parse_fn(&self) -> ParseFn {
        Arc::clone(&self.state.lock().parse_fn)
    }

    /// Replaces the parse function for this invocation.
    pub fn set_parse_fn(&self, parse_fn: ParseFn) {
        self.state.lock().parse_fn = parse_fn;
    }

    /// Supplies the parse result, skipping the parse function.
    pub fn set_result(&self, result: Result<Document, OperationError>) {
        self.state.lock().result = Some(result);
    }

    /// Supplies a parsed document, skipping the parse function.
    pub fn set_parsed_document(&self, document: Document) {
        self.set_result(Ok(document));
    }
}

/// Event passed to after-parse hooks.
pub struct AfterParseEvent {
    context: RequestContext,
    state: Shared<ParseState>,
}

impl AfterParseEvent {
    pub(crate) fn new(context: RequestContext, state: Shared<ParseState>) -> Self {
        Self { context, state }
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

    /// The current parse result. `None` if nothing produced one.
    #[must_use]
    pub fn result(&self) -> Option<Result<Document, OperationError>> {
        self.state.lock().result.clone()
    }

    /// Replaces the parse result.
    pub fn replace_parse_result(&self, result: Result<Document, OperationError>) {
        self.state.lock().result = Some(result);
    }

    /// Discards the parse result.
    ///
    /// Unless a later after-hook supplies a new one, the parse call fails
    /// with [`PipelineError::NoParseResult`](meridian_core::PipelineError::NoParseResult).
    pub fn clear_result(&self) {
        self.state.lock().result = None;
    }
}
