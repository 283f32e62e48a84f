//! Per-invocation phase runners.
//!
//! Each runner follows the same shape: run every before-hook in registry
//! order and collect the after-hooks they return, call the engine function
//! unless a hook already produced the result, then settle the result through
//! the collected after-hooks in collection order.

pub(crate) mod context;
pub(crate) mod execute;
pub(crate) mod parse;
pub(crate) mod validate;
