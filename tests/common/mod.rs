//! Common test utilities for integration tests
//!
//! Provides engine fixtures over both scored store backends.

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use piecewise::adapters::sqlite::{create_migrated_test_pool, initialize_database};
use piecewise::{InMemoryScoredStore, ScoredStore, SelectionEngine, SqliteScoredStore};

/// Labels of the reference scenario; namespace `featureX-stageA`.
#[allow(dead_code)]
pub const LABELS: [&str; 2] = ["stageA", "featureX"];

/// Create a temporary test database
///
/// Returns the path to a SQLite database file in a temporary directory.
#[allow(dead_code)]
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    (dir, db_path)
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Seeded in-memory store.
#[allow(dead_code)]
pub fn memory_store() -> Arc<InMemoryScoredStore> {
    Arc::new(InMemoryScoredStore::with_seed(42))
}

/// SQLite store over an in-memory database with migrations applied.
#[allow(dead_code)]
pub async fn sqlite_store() -> Arc<SqliteScoredStore> {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test pool");
    Arc::new(SqliteScoredStore::new(pool))
}

/// SQLite store backed by a file at `path`.
#[allow(dead_code)]
pub async fn file_store(path: &std::path::Path) -> Arc<SqliteScoredStore> {
    let url = format!("sqlite:{}", path.display());
    let pool = initialize_database(&url, None)
        .await
        .expect("Failed to initialize database");
    Arc::new(SqliteScoredStore::new(pool))
}

/// Build and boot an engine over `store`.
#[allow(dead_code)]
pub async fn booted_engine(store: Arc<dyn ScoredStore>) -> SelectionEngine {
    let engine = SelectionEngine::builder()
        .store(store)
        .build()
        .expect("Failed to build engine");
    engine.boot().await.expect("Failed to boot engine");
    engine
}
