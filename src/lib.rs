//! A plugin-driven request pipeline for schema-based query engines.
//!

pub use meridian_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use meridian_internal::prelude::*;
}
