//! Domain errors for the piecewise selection engine.

use thiserror::Error;

/// Errors raised by a scored-store collaborator.
///
/// The engine wraps these without interpreting them. The only exception is
/// [`StoreError::EmptySet`], which rulers translate into
/// [`EngineError::NotFound`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Scored set is empty: {0}")]
    EmptySet(String),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the selection engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Engine has not been booted")]
    NotInitialized,

    #[error("Engine has been shut down")]
    ShutDown,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
