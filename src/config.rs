//! Execution configuration
//!
//! Loaded from a JSON file; every field has a default. Individual settings
//! can also be changed by their dotted key (`udtf.arrow.enabled`, ...).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::EncodingMode;
use crate::observability::{Event, Logger};

/// Selects columnar output when true
pub const ARROW_ENABLED_KEY: &str = "udtf.arrow.enabled";
/// Upper bound on rows per columnar block
pub const ARROW_BATCH_SIZE_KEY: &str = "udtf.arrow.maxRecordsPerBatch";
/// Capacity of each partition's output channel, in frames
pub const OUTPUT_BUFFER_KEY: &str = "udtf.output.bufferFrames";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("{0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Columnar output (default: false)
    #[serde(default)]
    pub arrow_enabled: bool,

    /// Rows per columnar block (default: 10000)
    #[serde(default = "default_arrow_batch_size")]
    pub arrow_batch_size: usize,

    /// Frames buffered per partition before the producer blocks (default: 64)
    #[serde(default = "default_output_buffer_frames")]
    pub output_buffer_frames: usize,
}

fn default_arrow_batch_size() -> usize {
    10_000
}

fn default_output_buffer_frames() -> usize {
    64
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            arrow_enabled: false,
            arrow_batch_size: default_arrow_batch_size(),
            output_buffer_frames: default_output_buffer_frames(),
        }
    }
}

impl ExecutionConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;

        let path_str = path.display().to_string();
        let mode = config.encoding_mode();
        Logger::info(
            Event::ConfigLoaded.as_str(),
            &[("encoding", mode.as_str()), ("path", path_str.as_str())],
        );
        Ok(config)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: ExecutionConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.arrow_batch_size == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be > 0",
                ARROW_BATCH_SIZE_KEY
            )));
        }
        if self.output_buffer_frames == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be > 0",
                OUTPUT_BUFFER_KEY
            )));
        }
        Ok(())
    }

    /// Encoding used for every partition of the query
    pub fn encoding_mode(&self) -> EncodingMode {
        if self.arrow_enabled {
            EncodingMode::Arrow
        } else {
            EncodingMode::Row
        }
    }

    /// Returns the current value of a key
    pub fn get(&self, key: &str) -> ConfigResult<String> {
        match key {
            ARROW_ENABLED_KEY => Ok(self.arrow_enabled.to_string()),
            ARROW_BATCH_SIZE_KEY => Ok(self.arrow_batch_size.to_string()),
            OUTPUT_BUFFER_KEY => Ok(self.output_buffer_frames.to_string()),
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    /// Sets a key. The value must parse and keep the config valid.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let mut next = self.clone();
        match key {
            ARROW_ENABLED_KEY => {
                next.arrow_enabled = value.trim().to_ascii_lowercase().parse().map_err(|_| invalid())?
            }
            ARROW_BATCH_SIZE_KEY => {
                next.arrow_batch_size = value.trim().parse().map_err(|_| invalid())?
            }
            OUTPUT_BUFFER_KEY => {
                next.output_buffer_frames = value.trim().parse().map_err(|_| invalid())?
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        next.validate().map_err(|_| invalid())?;
        *self = next;
        Ok(())
    }

    /// Restores a key to its default
    pub fn unset(&mut self, key: &str) -> ConfigResult<()> {
        let defaults = Self::default();
        match key {
            ARROW_ENABLED_KEY => self.arrow_enabled = defaults.arrow_enabled,
            ARROW_BATCH_SIZE_KEY => self.arrow_batch_size = defaults.arrow_batch_size,
            OUTPUT_BUFFER_KEY => self.output_buffer_frames = defaults.output_buffer_frames,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutionConfig::default();
        assert!(!config.arrow_enabled);
        assert_eq!(config.arrow_batch_size, 10_000);
        assert_eq!(config.output_buffer_frames, 64);
        assert_eq!(config.encoding_mode(), EncodingMode::Row);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ExecutionConfig::from_json_str(r#"{"arrow_enabled": true}"#).unwrap();
        assert_eq!(config.encoding_mode(), EncodingMode::Arrow);
        assert_eq!(config.arrow_batch_size, 10_000);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = ExecutionConfig::from_json_str(r#"{"arrow_batch_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_set_and_unset() {
        let mut config = ExecutionConfig::default();
        config.set(ARROW_ENABLED_KEY, "TRUE").unwrap();
        config.set(ARROW_BATCH_SIZE_KEY, "3").unwrap();
        assert_eq!(config.get(ARROW_BATCH_SIZE_KEY).unwrap(), "3");
        assert_eq!(config.encoding_mode(), EncodingMode::Arrow);

        config.unset(ARROW_BATCH_SIZE_KEY).unwrap();
        assert_eq!(config.arrow_batch_size, 10_000);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = ExecutionConfig::default();
        assert!(matches!(
            config.set(ARROW_BATCH_SIZE_KEY, "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set(ARROW_ENABLED_KEY, "yes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("udtf.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert_eq!(config, ExecutionConfig::default());
    }
}
