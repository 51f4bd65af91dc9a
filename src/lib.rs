//! Piecewise - Adaptive Configuration Selection
//!
//! Piecewise keeps, per namespace, a scored set of candidate configuration
//! "pieces" and a scored set of selection strategies ("rulers"). A trial
//! execution picks a ruler, lets it pick a piece and records both; reported
//! success reinforces the recorded pair, reported failure wipes the
//! namespace. A replay execution reuses the recorded ruler.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the `ScoredStore` port
//! - **Adapter Layer** (`adapters`): In-memory and SQLite scored stores
//! - **Service Layer** (`services`): Ruler strategies, piece cache, selection engine
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging and setup
//!
//! # Example
//!
//! ```no_run
//! use piecewise::{Config, Stage};
//! use piecewise::infrastructure::setup::build_engine;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = build_engine(&Config::default()).await?;
//!
//!     let labels = ["stageA", "featureX"];
//!     engine.create(Stage::Trial, &labels, "fast", vec![json!({"workers": 8})]).await?;
//!     engine.create(Stage::Trial, &labels, "safe", vec![json!({"workers": 1})]).await?;
//!
//!     let selection = engine.execute(Stage::Trial, &labels).await?;
//!     println!("{} chose {}", selection.ruler, selection.piece_id);
//!
//!     engine.success(&labels).await?;
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{InMemoryScoredStore, SqliteScoredStore};
pub use domain::errors::{EngineError, EngineResult, StoreError, StoreResult};
pub use domain::models::{
    BuiltinRuler, Config, EngineConfig, KeySpace, LoggingConfig, Namespace, NamespaceKeys,
    PieceKey, PieceResults, Selection, Stage, StorageBackend, StorageConfig,
};
pub use domain::ports::ScoredStore;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::LoggerImpl;
pub use services::{
    PieceCache, RulerContext, RulerRegistry, RulerStrategy, SelectionEngine,
    SelectionEngineBuilder,
};
