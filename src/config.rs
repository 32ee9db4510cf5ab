//! Pipeline configuration.
//!
//! Settings come from a TOML file with `NOVEMBER__<SECTION>__<KEY>`
//! environment overrides layered on top. Every field has a default, so an
//! empty file yields a working configuration.
//!
//! ```toml
//! [orchestrator]
//! deadline_secs = 20
//! backoff_ms = 500
//!
//! [chunker]
//! chunk_limit = 1900
//! max_chars = 6000
//!
//! [progress]
//! interval_secs = 10
//!
//! [prompt]
//! base = "You are November, a friendly assistant."
//!
//! [prompt.modes]
//! technical = "Answer precisely and skip the small talk."
//!
//! [logging]
//! level = "debug"
//! ```

use config::{Config, ConfigError as SourceError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::chunker::{ChunkerConfig, MIN_CHUNK_LIMIT};
use crate::logging::LoggingConfig;
use crate::prompt::PromptTemplate;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "NOVEMBER";


/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration file path is not valid UTF-8.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),

    /// The configuration could not be read or deserialized.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] SourceError),

    /// A value was read but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Orchestrator timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Overall budget for one request, in seconds.
    pub deadline_secs: u64,
    /// Pause before retrying the primary tier, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 20,
            backoff_ms: 500,
        }
    }
}

/// Progress indicator timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Seconds of silence before the "still working" notice is posted.
    pub interval_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub orchestrator: OrchestratorConfig,
    pub chunker: ChunkerConfig,
    pub progress: ProgressConfig,
    pub prompt: PromptTemplate,
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Loads configuration from a TOML file plus environment overrides.
    ///
    /// Overrides use `NOVEMBER__<SECTION>__<KEY>`, for example
    /// `NOVEMBER__ORCHESTRATOR__DEADLINE_SECS=30`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed, or holds
    /// values rejected by [`validate`](Self::validate).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use november::config::PipelineConfig;
    ///
    /// let config = PipelineConfig::load("november.toml")?;
    /// # Ok::<(), november::config::ConfigError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::with_name(path_str).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let pipeline: PipelineConfig = config.try_deserialize()?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Parses configuration from TOML text, without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        let pipeline: PipelineConfig = config.try_deserialize()?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Checks that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator.deadline_secs must be greater than 0".to_string(),
            ));
        }
        if self.chunker.chunk_limit < MIN_CHUNK_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "chunker.chunk_limit must be at least {} (got {})",
                MIN_CHUNK_LIMIT, self.chunker.chunk_limit
            )));
        }
        if self.chunker.max_chars == 0 {
            return Err(ConfigError::Invalid(
                "chunker.max_chars must be greater than 0".to_string(),
            ));
        }
        if self.chunker.empty_placeholder.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "chunker.empty_placeholder must not be blank".to_string(),
            ));
        }
        if self.chunker.empty_placeholder.chars().count() > self.chunker.chunk_limit {
            return Err(ConfigError::Invalid(
                "chunker.empty_placeholder is longer than chunker.chunk_limit".to_string(),
            ));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.orchestrator.deadline_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.orchestrator.backoff_ms)
    }

    /// Zero disables the progress notice.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress.interval_secs)
    }
}
