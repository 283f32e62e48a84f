//! Per-phase hook sequences derived from the initialized plugin list.
//!
//! The registry is built exactly once, after every init hook has run. Plugins
//! added to a plugin list afterwards never reach an orchestrator that was
//! already built.

use core::fmt;
use std::sync::Arc;

use crate::hooks::{
    ContextErrorHandler, OnContextBuildingHook, OnExecuteHook, OnParseHook, OnSubscribeHook,
    OnValidateHook, RequestInitHook, SchemaChangeHook,
};
use crate::instrumentation::InstrumentationChain;
use crate::plugin::Plugin;

/// A stage of the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Plugin and per-request initialization.
    Init,
    /// Parsing the source text.
    Parse,
    /// Validating a document against the schema.
    Validate,
    /// Building the request context.
    Context,
    /// Executing an operation.
    Execute,
    /// Setting up a subscription.
    Subscribe,
}

impl Phase {
    /// Every phase, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Init,
        Self::Parse,
        Self::Validate,
        Self::Context,
        Self::Execute,
        Self::Subscribe,
    ];

    /// Lowercase phase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Parse => "parse",
            Self::Validate => "validate",
            Self::Context => "context",
            Self::Execute => "execute",
            Self::Subscribe => "subscribe",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook tagged with the plugin that declared it.
#[derive(Clone)]
pub struct Indexed<H> {
    /// Position of the declaring plugin in the initialized list.
    pub plugin: usize,
    /// Name of the declaring plugin.
    pub name: Arc<str>,
    /// The hook itself.
    pub hook: H,
}

/// Ordered hook sequences, one per phase.
#[derive(Clone, Default)]
pub struct HookRegistry {
    /// Plugins whose init hook ran. Init hooks are spent by the time the
    /// registry exists, so only their positions are kept.
    init_owners: Vec<usize>,
    pub(crate) request_init: Vec<Indexed<RequestInitHook>>,
    pub(crate) parse: Vec<Indexed<OnParseHook>>,
    pub(crate) validate: Vec<Indexed<OnValidateHook>>,
    pub(crate) context: Vec<Indexed<OnContextBuildingHook>>,
    pub(crate) execute: Vec<Indexed<OnExecuteHook>>,
    pub(crate) subscribe: Vec<Indexed<OnSubscribeHook>>,
    pub(crate) schema_change: Vec<Indexed<SchemaChangeHook>>,
    pub(crate) context_error_handlers: Vec<ContextErrorHandler>,
    pub(crate) instrumentation: InstrumentationChain,
}

fn collect<H: Clone>(
    plugins: &[Plugin],
    slot: impl Fn(&Plugin) -> Option<&H>,
) -> Vec<Indexed<H>> {
    plugins
        .iter()
        .enumerate()
        .filter_map(|(index, plugin)| {
            slot(plugin).map(|hook| Indexed {
                plugin: index,
                name: plugin.shared_name(),
                hook: hook.clone(),
            })
        })
        .collect()
}

impl HookRegistry {
    /// Partitions the hooks of `plugins` by phase, preserving list order.
    #[must_use]
    pub fn from_plugins(
        plugins: &[Plugin],
        context_error_handlers: Vec<ContextErrorHandler>,
    ) -> Self {
        let mut instrumentation = InstrumentationChain::new();
        for link in plugins.iter().filter_map(|p| p.instrumentation.as_ref()) {
            instrumentation.push(Arc::clone(link));
        }

        Self {
            init_owners: plugins
                .iter()
                .enumerate()
                .filter(|(_, plugin)| plugin.has_hook(Phase::Init))
                .map(|(index, _)| index)
                .collect(),
            request_init: collect(plugins, |p| p.on_request_init.as_ref()),
            parse: collect(plugins, |p| p.on_parse.as_ref()),
            validate: collect(plugins, |p| p.on_validate.as_ref()),
            context: collect(plugins, |p| p.on_context_building.as_ref()),
            execute: collect(plugins, |p| p.on_execute.as_ref()),
            subscribe: collect(plugins, |p| p.on_subscribe.as_ref()),
            schema_change: collect(plugins, |p| p.on_schema_change.as_ref()),
            context_error_handlers,
            instrumentation,
        }
    }

    /// Plugin indices owning a hook for `phase`, in execution order.
    #[must_use]
    pub fn owners(&self, phase: Phase) -> Vec<usize> {
        fn indices<H>(hooks: &[Indexed<H>]) -> Vec<usize> {
            hooks.iter().map(|entry| entry.plugin).collect()
        }
        match phase {
            Phase::Init => self.init_owners.clone(),
            Phase::Parse => indices(&self.parse),
            Phase::Validate => indices(&self.validate),
            Phase::Context => indices(&self.context),
            Phase::Execute => indices(&self.execute),
            Phase::Subscribe => indices(&self.subscribe),
        }
    }

    /// Number of hooks registered for `phase`.
    #[must_use]
    pub fn hook_count(&self, phase: Phase) -> usize {
        match phase {
            Phase::Init => self.init_owners.len(),
            Phase::Parse => self.parse.len(),
            Phase::Validate => self.validate.len(),
            Phase::Context => self.context.len(),
            Phase::Execute => self.execute.len(),
            Phase::Subscribe => self.subscribe.len(),
        }
    }

    /// Indices of plugins with a per-request init hook.
    #[must_use]
    pub fn request_init_owners(&self) -> Vec<usize> {
        self.request_init.iter().map(|entry| entry.plugin).collect()
    }

    /// Schema-change listeners, in plugin order.
    #[must_use]
    pub fn schema_listeners(&self) -> &[Indexed<SchemaChangeHook>] {
        &self.schema_change
    }

    /// Number of registered context-error handlers.
    #[must_use]
    pub fn context_error_handler_count(&self) -> usize {
        self.context_error_handlers.len()
    }

    /// The merged instrumentation of every plugin.
    #[must_use]
    pub fn instrumentation(&self) -> &InstrumentationChain {
        &self.instrumentation
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for phase in Phase::ALL {
            map.entry(&phase.as_str(), &self.owners(phase));
        }
        map.entry(&"schema_change", &self.schema_change.len())
            .entry(&"context_error_handlers", &self.context_error_handlers.len())
            .entry(&"instrumentation", &self.instrumentation.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use meridian_core::RequestContext;

    use super::*;
    use crate::instrumentation::PhaseGuard;

    fn sample() -> Vec<Plugin> {
        vec![
            Plugin::new("parse-only").on_parse(|_e| async { Ok(None) }),
            Plugin::default(),
            Plugin::new("both")
                .on_parse(|_e| async { Ok(None) })
                .on_execute(|_e| async { Ok(None) }),
            Plugin::new("listener").on_schema_change(|_e| {}),
        ]
    }

    #[test]
    fn preserves_plugin_order_per_phase() {
        let registry = HookRegistry::from_plugins(&sample(), Vec::new());
        assert_eq!(registry.owners(Phase::Parse), [0, 2]);
        assert_eq!(registry.owners(Phase::Execute), [2]);
        assert!(registry.owners(Phase::Validate).is_empty());
        assert_eq!(registry.schema_listeners().len(), 1);
        assert_eq!(registry.schema_listeners()[0].plugin, 3);
        assert_eq!(&*registry.parse[1].name, "both");
    }

    #[test]
    fn empty_plugins_do_not_shift_indices() {
        let mut plugins = sample();
        plugins.insert(0, Plugin::default());
        let registry = HookRegistry::from_plugins(&plugins, Vec::new());
        assert_eq!(registry.owners(Phase::Parse), [1, 3]);
        assert_eq!(registry.hook_count(Phase::Parse), 2);
    }

    #[test]
    fn init_owners_follow_plugin_positions() {
        let mut plugins = sample();
        plugins.push(Plugin::new("late").on_init(|_event| Ok(())));
        plugins.insert(1, Plugin::new("early").on_init(|_event| Ok(())));
        let registry = HookRegistry::from_plugins(&plugins, Vec::new());
        assert_eq!(registry.owners(Phase::Init), [1, 5]);
        assert_eq!(registry.hook_count(Phase::Init), 2);
        assert!(registry.request_init_owners().is_empty());
    }

    #[test]
    fn instrumentation_is_merged_in_order() {
        let plugins = vec![
            Plugin::new("a").with_instrumentation(|_: Phase, _: &RequestContext| -> Option<PhaseGuard> { None }),
            Plugin::new("b"),
            Plugin::new("c").with_instrumentation(|_: Phase, _: &RequestContext| -> Option<PhaseGuard> { None }),
        ];
        let registry = HookRegistry::from_plugins(&plugins, Vec::new());
        assert_eq!(registry.instrumentation().len(), 2);
    }

    #[test]
    fn phase_names() {
        let names: Vec<String> = Phase::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            ["init", "parse", "validate", "context", "execute", "subscribe"]
        );
    }
}
