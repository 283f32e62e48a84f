use super::Plugin;

// ─────────────────────────────────────────────────────────────────────────────
// Plugins Trait (for add_plugins polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be appended to an orchestrator's plugin list.
///
/// Implemented for a single [`Plugin`], a [`PluginGroupBuilder`] and a `Vec`
/// of anything convertible into a plugin. Users typically don't implement
/// this trait directly.
pub trait Plugins {
    /// Appends these plugins to `list`, preserving their order.
    fn add_to(self, list: &mut Vec<Plugin>);
}

impl Plugins for Plugin {
    fn add_to(self, list: &mut Vec<Plugin>) {
        list.push(self);
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to(self, list: &mut Vec<Plugin>) {
        list.extend(self.plugins);
    }
}

impl<P: Into<Plugin>> Plugins for Vec<P> {
    fn add_to(self, list: &mut Vec<Plugin>) {
        list.extend(self.into_iter().map(Into::into));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A named bundle of plugins that can be added together.
///
/// # Example
///
/// ```ignore
/// pub struct ObservabilityPlugins;
///
/// impl PluginGroup for ObservabilityPlugins {
///     fn build(self) -> PluginGroupBuilder {
///         PluginGroupBuilder::new()
///             .add(TracingPlugin::default())
///             .add(LoggerPlugin::default())
///     }
/// }
///
/// Orchestrator::builder()
///     .add_plugins(ObservabilityPlugins.build().disable("logger"))
/// ```
pub trait PluginGroup {
    /// Returns the plugins in this group.
    fn build(self) -> PluginGroupBuilder;
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroupBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for customizing plugin groups.
///
/// Plugins are positioned by name. When several plugins share a name the
/// first one is the target.
#[derive(Default, Debug, Clone)]
pub struct PluginGroupBuilder {
    plugins: Vec<Plugin>,
}

impl PluginGroupBuilder {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin to the end of the group.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add(mut self, plugin: impl Into<Plugin>) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    /// Adds a plugin before the plugin named `target`.
    ///
    /// If `target` is not found, the plugin is added at the beginning.
    #[must_use]
    pub fn add_before(mut self, target: &str, plugin: impl Into<Plugin>) -> Self {
        let position = self.position(target).unwrap_or(0);
        self.plugins.insert(position, plugin.into());
        self
    }

    /// Adds a plugin after the plugin named `target`.
    ///
    /// If `target` is not found, the plugin is added at the end.
    #[must_use]
    pub fn add_after(mut self, target: &str, plugin: impl Into<Plugin>) -> Self {
        let position = self
            .position(target)
            .map_or(self.plugins.len(), |index| index + 1);
        self.plugins.insert(position, plugin.into());
        self
    }

    /// Removes every plugin named `name`. No-op if none matches.
    #[must_use]
    pub fn disable(mut self, name: &str) -> Self {
        self.plugins.retain(|plugin| plugin.name() != name);
        self
    }

    /// Names of the plugins in the group, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(Plugin::name).collect()
    }

    /// Returns the number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the group contains no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|plugin| plugin.name() == name)
    }
}
