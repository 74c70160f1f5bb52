//! # Node Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TRACE_*`)
//! 2. Config file (`node.toml`, path from the first CLI argument or the
//!    platform config directory)
//! 3. Defaults (this file)
//!
//! Configuration is read-only after startup.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use trace_db::DbConfig;

const CONFIG_FILE_NAME: &str = "node.toml";
const DATABASE_FILE_NAME: &str = "ledger.db";
const DEFAULT_LOG_FILTER: &str = "info,trace_core=debug,sqlx=warn";

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// SQLite transaction log.
    /// Default: `<platform data dir>/ledger.db`, else `./ledger.db`
    pub database_path: PathBuf,

    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Upper bound of the SQLite pool.
    pub max_connections: u32,

    /// Compute and log the rolling log checksum at startup.
    pub verify_checksum: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            database_path: project_dirs()
                .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME)),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            max_connections: 4,
            verify_checksum: true,
        }
    }
}

impl NodeConfig {
    /// Loads defaults, then the config file, then the environment, then
    /// validates.
    ///
    /// An explicit `path` must exist; the platform default is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => NodeConfig::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses TOML; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `TRACE_*` overrides from `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup("TRACE_DB_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup("TRACE_LOG_FILTER") {
            self.log_filter = filter;
        }
        if let Some(max) = lookup("TRACE_MAX_CONNECTIONS") {
            self.max_connections = max
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TRACE_MAX_CONNECTIONS".to_string()))?;
        }
        if let Some(verify) = lookup("TRACE_VERIFY_CHECKSUM") {
            self.verify_checksum = verify
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TRACE_VERIFY_CHECKSUM".to_string()))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::MissingRequired("log_filter".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        Ok(())
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "trace", "trace-node")
}

/// `<platform config dir>/node.toml`
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
