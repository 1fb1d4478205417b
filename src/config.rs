//! Controller configuration.
//!
//! Values come from an optional TOML file named by `IMAGEPILOT_CONFIG`,
//! then environment overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default capacity of the event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

pub const CONFIG_PATH_ENV: &str = "IMAGEPILOT_CONFIG";
pub const QUEUE_CAPACITY_ENV: &str = "IMAGEPILOT_QUEUE_CAPACITY";
pub const LOG_FORMAT_ENV: &str = "IMAGEPILOT_LOG_FORMAT";
pub const CLUSTER_MANIFEST_ENV: &str = "IMAGEPILOT_CLUSTER_MANIFEST";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("queue_capacity must be greater than zero")]
    ZeroCapacity,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                key: LOG_FORMAT_ENV.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Bounded event queue size; submitters wait when it is full.
    pub queue_capacity: usize,
    pub log_format: LogFormat,
    /// JSON manifest seeding the in-memory cluster used by `serve`.
    pub cluster_manifest: Option<PathBuf>,
    /// Stamp an update-time annotation when a force update keeps the same tag.
    pub update_annotations: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            log_format: LogFormat::default(),
            cluster_manifest: None,
            update_annotations: true,
        }
    }
}

impl ControllerConfig {
    /// # Errors
    /// Returns `ConfigError::ZeroCapacity` for an empty queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = env(QUEUE_CAPACITY_ENV) {
            self.queue_capacity = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: QUEUE_CAPACITY_ENV.to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = env(LOG_FORMAT_ENV) {
            self.log_format = raw.parse()?;
        }
        if let Some(raw) = env(CLUSTER_MANIFEST_ENV) {
            if !raw.is_empty() {
                self.cluster_manifest = Some(PathBuf::from(raw));
            }
        }
        Ok(())
    }
}

/// Load configuration from the process environment.
pub fn load() -> Result<ControllerConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    load_from(path.as_deref(), |key| std::env::var(key).ok())
}

/// Load configuration from an optional file plus an environment lookup.
pub fn load_from<F>(path: Option<&Path>, env: F) -> Result<ControllerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            ControllerConfig::from_toml(&raw)?
        }
        None => ControllerConfig::default(),
    };

    config.apply_env(env)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
