//! Configuration for a harvest run.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `FRED_API_KEY` | Yes | FRED API key |
//! | `S3_BUCKET_NAME` | Yes | Bucket that receives checkpoints, batches, and the index |
//! | `S3_PREFIX` | Yes | Key prefix for everything this harvest writes |
//!
//! An unset or empty variable is a [`ConfigError::MissingEnv`]. Nothing is
//! fetched or written until all three are present.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fred_metadata_filter::ImportanceCriteria;
use fred_metadata_source::fred::MAX_PAGE_LIMIT;

use crate::budget::TimeBox;

/// Safety margin kept before the host's own deadline.
pub const DEFAULT_TIMEOUT_BUFFER: Duration = Duration::from_secs(30);

/// Longest an invocation runs before checkpointing on its own.
pub const DEFAULT_MAX_RUNTIME: Duration = Duration::from_secs(13 * 60);

/// Number of page fetches between rate-limit pauses.
pub const DEFAULT_CALLS_PER_PAUSE: u64 = 10;

/// Length of each rate-limit pause.
pub const DEFAULT_RATE_LIMIT_PAUSE: Duration = Duration::from_secs(5);

/// Errors in the externally supplied configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("Environment variable {name} is required")]
    MissingEnv {
        /// Name of the variable.
        name: String,
    },

    /// A tunable is outside its allowed range.
    #[error("Invalid setting {name}: {message}")]
    InvalidSetting {
        /// Name of the setting.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The importance criteria file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The importance criteria file is not valid TOML for the criteria.
    #[error("Invalid importance criteria in {}: {message}", path.display())]
    InvalidCriteria {
        /// File that was being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Required external inputs of a harvest.
#[derive(Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// FRED API key.
    pub api_key: String,
    /// Storage bucket.
    pub bucket: String,
    /// Storage key prefix.
    pub prefix: String,
}

impl HarvestConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] for the first required variable
    /// that is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] for the first required variable
    /// that `lookup` does not provide or provides empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    log::error!("Environment variable {name} not set.");
                    ConfigError::MissingEnv {
                        name: name.to_string(),
                    }
                })
        };

        Ok(Self {
            api_key: require("FRED_API_KEY")?,
            bucket: require("S3_BUCKET_NAME")?,
            prefix: require("S3_PREFIX")?,
        })
    }
}

impl std::fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("api_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Tunables of the harvest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSettings {
    /// Records requested per page. Also the amount the offset advances by.
    pub page_limit: u64,
    /// Pause when the host reports less than this much time left.
    pub timeout_buffer: Duration,
    /// Pause when the invocation has run longer than this.
    pub max_runtime: Duration,
    /// Pause for [`rate_limit_pause`](Self::rate_limit_pause) after every
    /// this many fetches. `0` disables the pause.
    pub calls_per_pause: u64,
    /// Length of the rate-limit pause.
    pub rate_limit_pause: Duration,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            page_limit: MAX_PAGE_LIMIT,
            timeout_buffer: DEFAULT_TIMEOUT_BUFFER,
            max_runtime: DEFAULT_MAX_RUNTIME,
            calls_per_pause: DEFAULT_CALLS_PER_PAUSE,
            rate_limit_pause: DEFAULT_RATE_LIMIT_PAUSE,
        }
    }
}

impl HarvestSettings {
    /// Checks the settings against what the remote source accepts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] if `page_limit` is zero or
    /// larger than the endpoint allows.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::InvalidSetting {
                name: "page_limit",
                message: format!("must be between 1 and {MAX_PAGE_LIMIT}, got {}", self.page_limit),
            });
        }
        Ok(())
    }

    /// The pause rule these settings describe.
    #[must_use]
    pub const fn time_box(&self) -> TimeBox {
        TimeBox {
            safety_buffer: self.timeout_buffer,
            max_runtime: self.max_runtime,
        }
    }
}

/// Loads importance criteria overrides from a TOML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::InvalidCriteria`] if it does not parse.
pub fn load_criteria(path: &Path) -> Result<ImportanceCriteria, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&text).map_err(|e| ConfigError::InvalidCriteria {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
