//! Ready-made plugins for the Meridian pipeline.
//!
//! Every plugin here is a small configuration value that converts into a
//! [`Plugin`](meridian_pipeline::Plugin) with `From`, so it can be handed straight to
//! `OrchestratorBuilder::add_plugin`:
//!
//! | Plugin | Hooks | Purpose |
//! |--------|-------|---------|
//! | [`TracingPlugin`] | init | Installs a `tracing-subscriber` registry |
//! | [`LoggerPlugin`] | execute, subscribe | Logs operation start, end and stream end |
//! | [`SchemaPlugin`] | init | Provides a fixed schema |
//! | [`LazySchemaPlugin`] | request init | Picks a schema per request |
//! | [`EnginePlugin`] | parse, validate, execute, subscribe | Swaps engine functions |
//! | [`ExtendContextPlugin`] | context | Merges a computed value into the context |
//! | [`ErrorHandlerPlugin`] | init, execute, subscribe | Observes every error |
//! | [`PayloadFormatterPlugin`] | execute, subscribe | Rewrites results |
//! | [`MaskedErrorsPlugin`] | init, execute, subscribe | Hides internal error messages |
//!
//! # Example
//!
//! ```ignore
//! use meridian_core_plugins::{DefaultPlugins, MaskedErrorsPlugin, SchemaPlugin};
//! use meridian_pipeline::{Orchestrator, PluginGroup};
//!
//! let orchestrator = Orchestrator::builder()
//!     .with_engine(engine)
//!     .add_plugins(DefaultPlugins.build())
//!     .add_plugin(SchemaPlugin::new(schema))
//!     .add_plugin(MaskedErrorsPlugin::new())
//!     .build()?;
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 3 and uses only the public surface of
//! `meridian_pipeline`:
//!
//! - **Layer 0** (`meridian_stream`): cancellation-safe sequences
//! - **Layer 1** (`meridian_core`): request data model
//! - **Layer 2** (`meridian_pipeline`): plugins, hooks and the orchestrator
//! - **Layer 3** (`meridian_core_plugins`): concrete plugins

mod context;
mod engine;
mod errors;
mod formatter;
mod logger;
mod results;
mod schema;
mod tracing_plugin;

pub use context::ExtendContextPlugin;
pub use engine::EnginePlugin;
pub use errors::{
    DEFAULT_ERROR_MESSAGE, EXPOSE_EXTENSION, ErrorHandlerPlugin, ErrorPhase, ErrorReport,
    MaskedErrorsPlugin, ORIGINAL_MESSAGE_EXTENSION,
};
pub use formatter::PayloadFormatterPlugin;
pub use logger::{LogEvent, LogFn, LogRecord, LoggerPlugin};
pub use schema::{LazySchemaPlugin, SchemaPlugin};
pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};

use meridian_pipeline::{PluginGroup, PluginGroupBuilder};

/// Default plugins for most orchestrators.
///
/// Includes:
/// - [`TracingPlugin`] - Subscriber installation
/// - [`LoggerPlugin`] - Operation logging
///
/// # Customization
///
/// ```ignore
/// Orchestrator::builder()
///     .add_plugins(DefaultPlugins.build().disable("meridian::tracing"))
/// ```
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(TracingPlugin::default())
            .add(LoggerPlugin::default())
    }
}

/// Plugin names used by this crate, for `PluginGroupBuilder::disable` and
/// `add_before`/`add_after`.
pub mod names {
    /// [`TracingPlugin`](crate::TracingPlugin).
    pub const TRACING: &str = "meridian::tracing";
    /// [`LoggerPlugin`](crate::LoggerPlugin).
    pub const LOGGER: &str = "meridian::logger";
}

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{
        DefaultPlugins, EnginePlugin, ErrorHandlerPlugin, ErrorPhase, ErrorReport,
        ExtendContextPlugin, LazySchemaPlugin, LoggerPlugin, MaskedErrorsPlugin,
        PayloadFormatterPlugin, SchemaPlugin, TracingFormat, TracingPlugin,
    };
}
