//! Structured logging setup.
//!
//! The pipeline logs through `tracing`; this module installs a
//! `tracing-subscriber` formatter on stderr. `RUST_LOG` wins over the
//! configured level when it is set.

use serde::Deserialize;
use std::fmt as stdfmt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Disable logging entirely
    Off,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl stdfmt::Display for LogLevel {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        f.write_str(self.as_directive())
    }
}

/// The `[logging]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for this crate's own events.
    pub level: LogLevel,
    /// Level for everything else (HTTP clients, the chat gateway...).
    pub dependency_level: LogLevel,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include the target (module path)
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            dependency_level: LogLevel::Warn,
            with_timestamps: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_dependency_level(mut self, level: LogLevel) -> Self {
        self.dependency_level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.with_timestamps = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Filter directive such as `warn,november=debug`.
    pub fn filter_directive(&self) -> String {
        format!(
            "{},{}={}",
            self.dependency_level,
            env!("CARGO_CRATE_NAME"),
            self.level
        )
    }
}

/// Installs the global subscriber.
///
/// Returns an error if a global subscriber is already set, which happens
/// when this is called twice or from several tests.
///
/// # Examples
///
/// ```no_run
/// use november::logging::{init_logging, LogLevel, LoggingConfig};
///
/// init_logging(&LoggingConfig::new().with_level(LogLevel::Debug))
///     .expect("logging already initialized");
/// ```
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(config.filter_directive())?
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    if config.with_timestamps {
        subscriber.try_init()
    } else {
        subscriber.without_time().try_init()
    }
}
