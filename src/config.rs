//! Folio Configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::VersionType;
use crate::observability::{log_event_with_fields, Event};

/// Result type for configuration handling
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("Config I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// File is not valid configuration JSON
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Parsed values are out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How current-changing batches handle concurrent writers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsistencyPolicy {
    /// A stale read re-runs the operation; the writer finishing last wins
    #[default]
    LastWriterWins,
    /// A stale read fails with `Conflict`; autosaves are pinned as well
    Optimistic,
}

/// Subscription settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Snapshots buffered per subscription before the forwarder waits
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub consistency: ConsistencyPolicy,

    /// Type given to versions created by "save as new version"
    #[serde(default = "default_save_as_new_type")]
    pub save_as_new_type: VersionType,

    #[serde(default)]
    pub notifier: NotifierConfig,
}

fn default_save_as_new_type() -> VersionType {
    VersionType::Edited
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            consistency: ConsistencyPolicy::default(),
            save_as_new_type: default_save_as_new_type(),
            notifier: NotifierConfig::default(),
        }
    }
}

impl FolioConfig {
    /// Configuration using optimistic concurrency
    pub fn optimistic() -> Self {
        Self {
            consistency: ConsistencyPolicy::Optimistic,
            ..Self::default()
        }
    }

    /// Parse and validate configuration JSON
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: FolioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json(&content)?;

        let path_str = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", path_str.as_str()),
                ("consistency", config.consistency_name()),
            ],
        );
        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Reject values the runtime cannot honour
    pub fn validate(&self) -> ConfigResult<()> {
        if self.notifier.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notifier.channel_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn consistency_name(&self) -> &'static str {
        match self.consistency {
            ConsistencyPolicy::LastWriterWins => "last-writer-wins",
            ConsistencyPolicy::Optimistic => "optimistic",
        }
    }
}
