//! Subscriber setup for binaries embedding the engine.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! caller's choice. [`init_tracing`] wires a formatter to stderr so that
//! stdout stays free for JSON results.

use tracing::Level;
use tracing_subscriber::util::TryInitError;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level for events from this crate.
    pub level: Level,
    /// Level for everything else.
    pub default_level: Level,
    /// Emit one JSON object per event.
    pub json_format: bool,
    /// Full filter directive, replacing the two levels above.
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            default_level: Level::WARN,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose settings for local debugging.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            default_level: Level::INFO,
            ..Self::default()
        }
    }

    /// Sets the level for this crate's events.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Switches JSON output on or off.
    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    /// Overrides the filter directive.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the filter directive string.
    ///
    /// ```
    /// use u_compare::logging::LogConfig;
    /// use tracing::Level;
    ///
    /// let config = LogConfig::default().with_level(Level::DEBUG);
    /// assert_eq!(config.env_filter(), "warn,u_compare=debug");
    /// ```
    pub fn env_filter(&self) -> String {
        match &self.env_filter {
            Some(filter) => filter.clone(),
            None => format!(
                "{},u_compare={}",
                self.default_level.as_str().to_lowercase(),
                self.level.as_str().to_lowercase()
            ),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
///
/// Fails if a global subscriber is already set.
///
/// ```no_run
/// use u_compare::logging::{init_tracing, LogConfig};
///
/// init_tracing(&LogConfig::default().with_json_format(true)).unwrap();
/// ```
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter() {
        assert_eq!(LogConfig::default().env_filter(), "warn,u_compare=info");
    }

    #[test]
    fn development_is_verbose() {
        assert_eq!(LogConfig::development().env_filter(), "info,u_compare=debug");
    }

    #[test]
    fn explicit_filter_wins() {
        let config = LogConfig::default().with_env_filter("trace");
        assert_eq!(config.env_filter(), "trace");
    }
}
