//! Domain layer for the piecewise selection engine
//!
//! This module contains core domain models, errors and the storage port.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{EngineError, EngineResult, StoreError, StoreResult};
