// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Configuration file types and parsing for logdispatch.
//!
//! JSON5 configuration format supporting:
//! - Queue capacity, worker count and drain behavior of the shared pool
//! - Registry-wide defaults for new loggers
//! - Per-logger level, overflow policy and flush-on level
//! - Comments and trailing commas

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::logging::{
    DrainPolicy, DuplicatePolicy, Level, LoggerSettings, OverflowPolicy, PoolConfig, Registry,
    RegistryConfig, DEFAULT_CAPACITY, DEFAULT_LEVEL, DEFAULT_POLL_INTERVAL, DEFAULT_WORKERS,
};

/// Logging configuration (JSON5 file format)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub pool: PoolSection,

    /// What to do when a logger name is registered twice
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Level given to loggers without their own setting
    #[serde(default = "default_level")]
    pub default_level: Level,

    #[serde(default)]
    pub default_overflow: OverflowPolicy,

    /// Per-logger overrides, keyed by logger name
    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolSection {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub drain_policy: DrainPolicy,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Logger override as stored in config file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow: Option<OverflowPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_on: Option<Level>,
}

fn default_level() -> Level {
    DEFAULT_LEVEL
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            workers: default_workers(),
            drain_policy: DrainPolicy::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            pool: PoolSection::default(),
            duplicate_policy: DuplicatePolicy::default(),
            default_level: default_level(),
            default_overflow: OverflowPolicy::default(),
            loggers: BTreeMap::new(),
        }
    }
}

impl From<LoggerSection> for LoggerSettings {
    fn from(section: LoggerSection) -> Self {
        LoggerSettings {
            level: section.level,
            overflow: section.overflow,
            flush_on: section.flush_on,
        }
    }
}

impl LoggingConfig {
    /// Load configuration from a JSON5 file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to JSON5 string (with pretty formatting)
    pub fn to_json5(&self) -> String {
        // json5 has no pretty printer; JSON is valid JSON5
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json5()).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.pool.capacity));
        }
        if self.pool.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.pool.workers));
        }
        if self.pool.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        for name in self.loggers.keys() {
            validate_logger_name(name)?;
        }
        Ok(())
    }

    /// Validate and convert to the registry's runtime configuration
    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        self.validate()?;
        Ok(RegistryConfig {
            pool: PoolConfig {
                capacity: self.pool.capacity,
                workers: self.pool.workers,
                drain_policy: self.pool.drain_policy,
                poll_interval: Duration::from_millis(self.pool.poll_interval_ms),
            },
            duplicate_policy: self.duplicate_policy,
            default_level: self.default_level,
            default_overflow: self.default_overflow,
            loggers: self
                .loggers
                .iter()
                .map(|(name, section)| (name.clone(), LoggerSettings::from(*section)))
                .collect(),
        })
    }

    /// Build a registry from this configuration
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        Ok(Registry::new(self.registry_config()?))
    }
}

fn validate_logger_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::InvalidLoggerName {
            name: name.to_string(),
            reason: "logger name cannot be empty".to_string(),
        });
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::InvalidLoggerName {
            name: name.to_string(),
            reason: "logger name contains whitespace or control characters".to_string(),
        });
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid queue capacity {0}: must be at least 1")]
    InvalidCapacity(usize),

    #[error("invalid worker count {0}: must be at least 1")]
    InvalidWorkerCount(usize),

    #[error("invalid poll interval: must be at least 1 ms")]
    InvalidPollInterval,

    #[error("invalid logger name '{name}': {reason}")]
    InvalidLoggerName { name: String, reason: String },
}
