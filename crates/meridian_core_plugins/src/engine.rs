//! Engine override plugin.

use meridian_core::{ExecuteFn, ParseFn, SubscribeFn, ValidateFn};
use meridian_pipeline::Plugin;

/// Replaces any subset of the engine functions.
///
/// Each configured function is installed through the matching `set_*_fn`
/// control of its phase, so plugins later in the list still see, and may
/// wrap, the replacement.
///
/// ```ignore
/// let plugin = EnginePlugin::new()
///     .with_parse(parse_fn(|source, _| my_parser::parse(source)))
///     .with_execute(execute_fn(|args| my_executor::run(args)));
/// ```
#[derive(Clone, Default)]
pub struct EnginePlugin {
    parse: Option<ParseFn>,
    validate: Option<ValidateFn>,
    execute: Option<ExecuteFn>,
    subscribe: Option<SubscribeFn>,
}

impl EnginePlugin {
    /// Creates a plugin overriding nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the parse function.
    #[must_use]
    pub fn with_parse(mut self, parse: ParseFn) -> Self {
        self.parse = Some(parse);
        self
    }

    /// Overrides the validate function.
    #[must_use]
    pub fn with_validate(mut self, validate: ValidateFn) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Overrides the execute function.
    #[must_use]
    pub fn with_execute(mut self, execute: ExecuteFn) -> Self {
        self.execute = Some(execute);
        self
    }

    /// Overrides the subscribe function.
    #[must_use]
    pub fn with_subscribe(mut self, subscribe: SubscribeFn) -> Self {
        self.subscribe = Some(subscribe);
        self
    }
}

impl From<EnginePlugin> for Plugin {
    fn from(plugin: EnginePlugin) -> Self {
        let mut engine = Plugin::new("meridian::engine");
        if let Some(parse) = plugin.parse {
            engine = engine.on_parse(move |event| {
                event.set_parse_fn(parse.clone());
                async { Ok(None) }
            });
        }
        if let Some(validate) = plugin.validate {
            engine = engine.on_validate(move |event| {
                event.set_validate_fn(validate.clone());
                async { Ok(None) }
            });
        }
        if let Some(execute) = plugin.execute {
            engine = engine.on_execute(move |event| {
                event.set_execute_fn(execute.clone());
                async { Ok(None) }
            });
        }
        if let Some(subscribe) = plugin.subscribe {
            engine = engine.on_subscribe(move |event| {
                event.set_subscribe_fn(subscribe.clone());
                async { Ok(None) }
            });
        }
        engine
    }
}

#[cfg(test)]
mod tests {
    use meridian_core::engine::{parse_fn, validate_fn};
    use meridian_pipeline::Phase;

    use super::*;

    #[test]
    fn only_configured_slots_are_filled() {
        let plugin = Plugin::from(
            EnginePlugin::new()
                .with_parse(parse_fn(|_source, _options| {
                    Err(meridian_core::OperationError::new("unused"))
                }))
                .with_validate(validate_fn(|_params| Vec::new())),
        );

        assert!(plugin.has_hook(Phase::Parse));
        assert!(plugin.has_hook(Phase::Validate));
        assert!(!plugin.has_hook(Phase::Execute));
        assert!(!plugin.has_hook(Phase::Subscribe));
    }

    #[test]
    fn empty_override_is_an_empty_plugin() {
        assert!(Plugin::from(EnginePlugin::new()).is_empty());
    }
}
