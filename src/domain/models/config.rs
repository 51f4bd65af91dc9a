use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::namespace::DEFAULT_KEY_PREFIX;

/// Main configuration structure for piecewise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Selection engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Scored store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Selection engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Prefix of every storage key written by the engine
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Number of independently locked piece cache shards (1-1024)
    #[serde(default = "default_cache_shards")]
    pub cache_shards: usize,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

const fn default_cache_shards() -> usize {
    16
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            cache_shards: default_cache_shards(),
        }
    }
}

/// Scored store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Scored store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Backend holding scored sets and used-records
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to `SQLite` database file (sqlite backend only)
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seed for the in-memory store's random member selection
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_database_path() -> String {
    ".piecewise/piecewise.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            random_seed: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Rotation of file log output
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// File rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}
