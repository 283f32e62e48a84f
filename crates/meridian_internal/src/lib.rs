//! # Meridian Internal Library
//!
//! Re-exports the core Meridian crates for convenience.

/// Layer 0: cancellation-safe async sequences.
pub use meridian_stream;

/// Layer 1: request data model and engine capability.
pub use meridian_core;

/// Layer 2: plugins, hooks and the orchestrator.
pub use meridian_pipeline;

/// Layer 3: ready-made plugins.
pub use meridian_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use meridian_core::prelude::*;
    pub use meridian_core_plugins::prelude::*;
    pub use meridian_pipeline::prelude::*;
    pub use meridian_stream::prelude::*;
}
