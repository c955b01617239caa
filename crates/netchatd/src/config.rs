//! Server configuration.
//!
//! Values are resolved in this order, later sources winning:
//! 1. Built-in defaults
//! 2. TOML file (`~/.config/netchat/netchatd.toml` unless overridden)
//! 3. `NETCHAT_ADDR` environment variable
//! 4. Command line flags (applied by the binary)
//!
//! The admission ceiling is not read from any of these; it can only be set
//! programmatically through [`ServerConfig::with_max_connections`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::registry::MAX_CONNECTIONS;

/// Default listen address.
pub const DEFAULT_ADDRESS: &str = "localhost:8080";

/// Default capacity of each session's outbound queue, in messages.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Environment variable overriding the listen address.
pub const ADDRESS_ENV: &str = "NETCHAT_ADDR";

/// Effective server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on (`host:port`)
    pub address: String,

    /// Admission ceiling
    pub max_connections: usize,

    /// Messages buffered per session before broadcasts to it are dropped
    pub outbound_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_connections: MAX_CONNECTIONS,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    address: Option<String>,
    outbound_queue_capacity: Option<usize>,
}

impl ServerConfig {
    /// Creates the default configuration listening on `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the admission ceiling.
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the per-session outbound queue capacity.
    #[must_use]
    pub fn with_outbound_queue(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity;
        self
    }

    /// Loads defaults, then the config file, then the environment.
    ///
    /// With `path = None` the default location is tried and silently skipped
    /// when absent. An explicit path must exist.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Read` if an explicit file cannot be read
    /// - `ConfigError::Parse` if the file is not valid TOML for this schema
    /// - `ConfigError::Invalid` if a value is out of range
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match path {
            Some(path) => config.merge_file(path)?,
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    config.merge_file(&path)?;
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlays values from a TOML file.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        self.merge_toml(&contents).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(())
    }

    fn merge_toml(&mut self, contents: &str) -> Result<(), String> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| e.to_string())?;

        if let Some(address) = file.address {
            self.address = address;
        }
        if let Some(capacity) = file.outbound_queue_capacity {
            self.outbound_queue_capacity = capacity;
        }
        Ok(())
    }

    /// Overlays environment variables using `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ADDRESS_ENV).filter(|a| !a.trim().is_empty()) {
            debug!(address = %address, "Listen address taken from {ADDRESS_ENV}");
            self.address = address;
        }
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid("address must not be empty".to_string()));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "outbound_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default config file location, if a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("netchat").join("netchatd.toml"))
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {error}", .path.display())]
    Read { path: PathBuf, error: String },

    #[error("Invalid config file {}: {error}", .path.display())]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
