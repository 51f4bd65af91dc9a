use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, StorageBackend};

/// Directory holding project configuration files.
pub const CONFIG_DIR: &str = ".piecewise";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "PIECEWISE_";

const MAX_CACHE_SHARDS: usize = 1024;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Key prefix cannot be empty")]
    EmptyKeyPrefix,

    #[error("Invalid key prefix: {0:?}. Must not contain whitespace")]
    InvalidKeyPrefix(String),

    #[error("Invalid cache_shards: {0}. Must be between 1 and 1024")]
    InvalidCacheShards(usize),

    #[error("Database path cannot be empty for the sqlite backend")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .piecewise/config.yaml
    /// 3. .piecewise/local.yaml (optional local overrides)
    /// 4. Environment variables (PIECEWISE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`] with the config directory given.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let prefix = &config.engine.key_prefix;
        if prefix.is_empty() {
            return Err(ConfigError::EmptyKeyPrefix);
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidKeyPrefix(prefix.clone()));
        }

        if !(1..=MAX_CACHE_SHARDS).contains(&config.engine.cache_shards) {
            return Err(ConfigError::InvalidCacheShards(config.engine.cache_shards));
        }

        if config.storage.backend == StorageBackend::Sqlite {
            if config.storage.database_path.is_empty() {
                return Err(ConfigError::EmptyDatabasePath);
            }
            if config.storage.max_connections == 0 {
                return Err(ConfigError::InvalidMaxConnections(
                    config.storage.max_connections,
                ));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
