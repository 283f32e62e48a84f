//! Subscriber installation plugin.
//!
//! [`TracingPlugin`] installs a `tracing-subscriber` registry when the
//! orchestrator is built. Installation happens in the plugin's init hook, so
//! a plugin list can carry several tracing plugins and only the first one to
//! initialize takes effect.
//!
//! # Example
//!
//! ```ignore
//! use meridian_core_plugins::{TracingFormat, TracingPlugin};
//! use tracing::Level;
//!
//! let orchestrator = Orchestrator::builder()
//!     .with_engine(engine)
//!     .add_plugin(
//!         TracingPlugin::default()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Compact),
//!     )
//!     .build()?;
//! ```

use meridian_pipeline::Plugin;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The settings a [`TracingPlugin`] installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Maximum log level, used when no filter is set or the filter is invalid.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Directive string such as `meridian_pipeline=trace,hyper=warn`.
    pub env_filter: Option<String>,
    /// Emit span enter/exit events. Each facade phase runs in a
    /// `meridian.<phase>` span, so this traces the request lifecycle.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }

    /// Installs the global subscriber. Returns `false` if one was already set.
    fn install(&self) -> bool {
        let registry = tracing_subscriber::registry().with(self.filter());
        let span_events = self.span_events();
        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init(),
        };
        installed.is_ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Installs a `tracing` subscriber during plugin initialization.
///
/// | Option | Default |
/// |--------|---------|
/// | [`with_level`](Self::with_level) | `INFO` |
/// | [`with_format`](Self::with_format) | [`TracingFormat::Pretty`] |
/// | [`with_env_filter`](Self::with_env_filter) | none |
/// | [`with_span_events`](Self::with_span_events) | `false` |
///
/// An invalid filter string falls back to the configured level. If a global
/// subscriber is already installed the plugin leaves it in place.
#[derive(Debug, Clone, Default)]
pub struct TracingPlugin {
    config: TracingConfig,
}

impl TracingPlugin {
    /// Creates a plugin with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.config.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Sets target-specific directives, `target=level,target=level,...`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.config.span_events = enabled;
        self
    }

    /// The settings this plugin installs.
    #[must_use]
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }
}

impl From<TracingPlugin> for Plugin {
    fn from(plugin: TracingPlugin) -> Self {
        let config = plugin.config;
        Plugin::new(crate::names::TRACING).on_init(move |_event| {
            if config.install() {
                tracing::info!(
                    level = %config.level,
                    format = ?config.format,
                    "tracing subscriber installed"
                );
            } else {
                tracing::debug!("global subscriber already set, keeping it");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use meridian_pipeline::Phase;

    use super::*;

    #[test]
    fn tracing_format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn builder_options_are_recorded() {
        let plugin = TracingPlugin::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("meridian_pipeline=trace")
            .with_span_events(true);

        let config = plugin.config();
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.env_filter.as_deref(), Some("meridian_pipeline=trace"));
        assert!(config.span_events);
    }

    #[test]
    fn invalid_filter_falls_back_to_level() {
        let config = TracingConfig {
            level: Level::WARN,
            env_filter: Some("meridian=notalevel".to_owned()),
            ..TracingConfig::default()
        };
        assert_eq!(config.filter().to_string(), "warn");
    }

    #[test]
    fn span_events_toggle() {
        let mut config = TracingConfig::default();
        assert_eq!(config.span_events(), FmtSpan::NONE);
        config.span_events = true;
        assert_eq!(config.span_events(), FmtSpan::ENTER | FmtSpan::EXIT);
    }

    #[test]
    fn converts_to_an_init_only_plugin() {
        let plugin = Plugin::from(TracingPlugin::default());
        assert_eq!(plugin.name(), "meridian::tracing");
        assert!(plugin.has_hook(Phase::Init));
        assert!(!plugin.has_hook(Phase::Execute));
    }
}
