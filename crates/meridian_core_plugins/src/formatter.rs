//! Result payload formatting plugin.

use std::sync::Arc;

use meridian_core::{ExecutionArgs, ExecutionResult};
use meridian_pipeline::Plugin;

use crate::results::{Operation, ResultMap, per_result};

/// Rewrites every execution result before it reaches the caller.
///
/// Applies to execute and subscribe, to single results and to each item of
/// a streamed result. Returning `None` keeps the result as it is.
///
/// ```ignore
/// let stamp = PayloadFormatterPlugin::new(|result, _args| {
///     Some(result.clone().with_extension("servedBy", json!("edge-1")))
/// });
/// ```
#[derive(Clone)]
pub struct PayloadFormatterPlugin {
    format: Arc<dyn Fn(&ExecutionResult, &ExecutionArgs) -> Option<ExecutionResult> + Send + Sync>,
}

impl PayloadFormatterPlugin {
    /// Creates a plugin from a formatting function.
    #[must_use]
    pub fn new<F>(format: F) -> Self
    where
        F: Fn(&ExecutionResult, &ExecutionArgs) -> Option<ExecutionResult> + Send + Sync + 'static,
    {
        Self {
            format: Arc::new(format),
        }
    }
}

impl From<PayloadFormatterPlugin> for Plugin {
    fn from(plugin: PayloadFormatterPlugin) -> Self {
        let format = plugin.format;
        let map: ResultMap = Arc::new(
            move |_operation: Operation, args: &ExecutionArgs, result: ExecutionResult| {
                format(&result, args).unwrap_or(result)
            },
        );
        per_result(Plugin::new("meridian::payload_formatter"), map, None)
    }
}
