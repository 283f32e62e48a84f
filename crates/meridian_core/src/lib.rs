//! # Meridian Core
//!
//! The data model every Meridian layer speaks:
//!
//! - [`RequestContext`]: the per-request key/value record hooks extend in place
//! - [`Schema`], [`Document`], [`TypeInfo`], [`Resolver`]: opaque engine values
//!   compared by identity
//! - [`Engine`]: the four replaceable phase functions (parse, validate,
//!   execute, subscribe)
//! - [`ExecutionResult`] and [`ExecutionOutput`]: single results or long-lived
//!   [`ResultStream`]s
//! - [`PipelineError`] and [`OperationError`]: thrown failures versus
//!   data-level errors
//!
//! Nothing here knows about plugins or hooks; see `meridian_pipeline` for the
//! orchestrator built on top of these types.

pub mod context;
pub mod engine;
pub mod error;
pub mod handle;
pub mod result;

pub use context::RequestContext;
pub use engine::{
    Engine, ExecuteFn, ExecutionArgs, ParseFn, ParseOptions, SubscribeFn, ValidateFn,
    ValidateOptions, ValidateParams, ValidationRule,
};
pub use error::{BoxFuture, PipelineError};
pub use handle::{Document, Resolver, Schema, TypeInfo};
pub use result::{ExecutionOutput, ExecutionResult, OperationError, ResultStream};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::engine::{execute_fn, parse_fn, subscribe_fn, validate_fn};
    pub use crate::{
        BoxFuture, Document, Engine, ExecutionArgs, ExecutionOutput, ExecutionResult,
        OperationError, ParseOptions, PipelineError, RequestContext, ResultStream, Schema,
        ValidateParams, ValidationRule,
    };
}
