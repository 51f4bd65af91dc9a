//! SQLite database adapters for the piecewise scored store.

pub mod connection;
pub mod migrations;
pub mod scored_store;

pub use connection::{create_pool, create_test_pool, ping, ConnectionError, DatabaseLocation, PoolConfig};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use scored_store::SqliteScoredStore;

use sqlx::SqlitePool;

use crate::domain::errors::StoreResult;

/// Open (creating if needed) the database at `database_url` and apply all
/// migrations.
pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> StoreResult<SqlitePool> {
    let pool = create_pool(database_url, config).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> StoreResult<SqlitePool> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}
