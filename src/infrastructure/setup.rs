//! Piecewise setup and initialization infrastructure
//!
//! Handles:
//! - Project configuration directory and default config file creation
//! - Construction of the configured scored store (with migrations)
//! - Building and booting a [`SelectionEngine`] from a [`Config`]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::adapters::memory::InMemoryScoredStore;
use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteScoredStore};
use crate::domain::models::config::{Config, StorageBackend, StorageConfig};
use crate::domain::ports::ScoredStore;
use crate::infrastructure::config::{ConfigLoader, CONFIG_DIR};
use crate::services::SelectionEngine;

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Piecewise Configuration
# Override settings by editing this file, adding a local.yaml next to it,
# or setting environment variables with the PIECEWISE_ prefix
#
# Example environment variables:
#   export PIECEWISE_ENGINE__KEY_PREFIX=app:selection
#   export PIECEWISE_STORAGE__BACKEND=sqlite
#   export PIECEWISE_LOGGING__LEVEL=debug

engine:
  # Prefix of every storage key
  key_prefix: "service:configuration:namespace"

  # Number of independently locked piece cache shards (1-1024)
  cache_shards: 16

storage:
  # Backend: memory, sqlite
  backend: "memory"

  # Path to SQLite database file (sqlite backend only)
  database_path: ".piecewise/piecewise.db"

  # Maximum number of database connections in pool
  max_connections: 5

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"

  # Log format: json, pretty
  format: "json"
"#;

/// Paths used during project setup
#[derive(Debug, Clone)]
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl SetupPaths {
    /// Paths relative to the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::in_root(current_dir))
    }

    /// Paths relative to `root`
    pub fn in_root(root: impl AsRef<Path>) -> Self {
        let config_dir = root.as_ref().join(CONFIG_DIR);
        Self {
            config_file: config_dir.join("config.yaml"),
            config_dir,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

/// Create the config directory and the default config file
///
/// Existing files are left untouched unless `force` is set.
pub fn initialize_project(paths: &SetupPaths, force: bool) -> Result<()> {
    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")?;

    if paths.config_file.exists() && !force {
        return Ok(());
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE)
        .context("Failed to write config file")?;

    info!(path = %paths.config_file.display(), "wrote default configuration");
    Ok(())
}

/// Construct the scored store selected by `storage`
///
/// The sqlite backend creates the database file if needed and applies all
/// embedded migrations.
pub async fn build_store(storage: &StorageConfig) -> Result<Arc<dyn ScoredStore>> {
    match storage.backend {
        StorageBackend::Memory => {
            let store = match storage.random_seed {
                Some(seed) => InMemoryScoredStore::with_seed(seed),
                None => InMemoryScoredStore::new(),
            };
            Ok(Arc::new(store))
        }
        StorageBackend::Sqlite => {
            let database_url = format!("sqlite:{}", storage.database_path);
            let pool = initialize_database(&database_url, Some(PoolConfig::from(storage)))
                .await
                .with_context(|| {
                    format!("Failed to initialize database at {}", storage.database_path)
                })?;
            Ok(Arc::new(SqliteScoredStore::new(pool)))
        }
    }
}

/// Build and boot a selection engine from `config`
///
/// The configuration is validated first, so values that never passed
/// through [`ConfigLoader`] are held to the same rules.
pub async fn build_engine(config: &Config) -> Result<SelectionEngine> {
    ConfigLoader::validate(config).context("Invalid configuration")?;

    let store = build_store(&config.storage).await?;

    let engine = SelectionEngine::builder()
        .store(store)
        .config(config.engine.clone())
        .build()
        .context("Failed to build selection engine")?;
    engine.boot().await.context("Failed to boot selection engine")?;

    info!(
        backend = ?config.storage.backend,
        key_prefix = %config.engine.key_prefix,
        "selection engine ready"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Stage;
    use crate::infrastructure::config::ConfigError;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_project_writes_loadable_config() {
        let root = TempDir::new().unwrap();
        let paths = SetupPaths::in_root(root.path());
        assert!(!paths.is_initialized());

        initialize_project(&paths, false).unwrap();
        assert!(paths.is_initialized());

        let config = ConfigLoader::load_from_file(&paths.config_file).unwrap();
        let defaults = Config::default();
        assert_eq!(config.engine.key_prefix, defaults.engine.key_prefix);
        assert_eq!(config.engine.cache_shards, defaults.engine.cache_shards);
        assert_eq!(config.storage.backend, defaults.storage.backend);
        assert_eq!(config.storage.database_path, defaults.storage.database_path);
        assert_eq!(config.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_initialize_project_keeps_existing_file() {
        let root = TempDir::new().unwrap();
        let paths = SetupPaths::in_root(root.path());
        fs::create_dir_all(&paths.config_dir).unwrap();
        fs::write(&paths.config_file, "engine:\n  cache_shards: 2\n").unwrap();

        initialize_project(&paths, false).unwrap();
        let content = fs::read_to_string(&paths.config_file).unwrap();
        assert!(content.contains("cache_shards: 2"));

        initialize_project(&paths, true).unwrap();
        let content = fs::read_to_string(&paths.config_file).unwrap();
        assert!(content.contains("Piecewise Configuration"));
    }

    #[tokio::test]
    async fn test_build_engine_memory_backend() {
        let mut config = Config::default();
        config.storage.random_seed = Some(3);

        let engine = build_engine(&config).await.unwrap();
        assert!(engine.is_running().await);

        engine
            .create(Stage::Trial, &["a"], "p1", vec![json!(1)])
            .await
            .unwrap();
        let selection = engine.execute(Stage::Trial, &["a"]).await.unwrap();
        assert_eq!(selection.piece_id, "p1");
    }

    #[tokio::test]
    async fn test_build_engine_sqlite_backend() {
        let root = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.database_path = root
            .path()
            .join("nested/selection.db")
            .to_string_lossy()
            .into_owned();

        let engine = build_engine(&config).await.unwrap();
        engine
            .create(Stage::Trial, &["a"], "p1", vec![])
            .await
            .unwrap();

        assert!(root.path().join("nested/selection.db").exists());
    }

    #[tokio::test]
    async fn test_build_engine_rejects_empty_prefix() {
        let mut config = Config::default();
        config.engine.key_prefix = String::new();
        assert!(build_engine(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_build_engine_validates_programmatic_config() {
        let mut config = Config::default();
        config.engine.key_prefix = "has space".to_string();
        let err = build_engine(&config).await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidKeyPrefix(prefix)) if prefix == "has space"
        ));

        let mut config = Config::default();
        config.engine.cache_shards = 100_000;
        let err = build_engine(&config).await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidCacheShards(100_000))
        ));

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        let err = build_engine(&config).await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidLogLevel(_))
        ));
    }
}
