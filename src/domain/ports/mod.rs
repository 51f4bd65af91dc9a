//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interfaces that infrastructure adapters
//! must implement:
//! - ScoredStore: sorted-set and scalar storage used by the selection engine
//!
//! These traits define the contracts that allow the engine to be independent
//! of specific storage implementations.

pub mod scored_store;

pub use scored_store::ScoredStore;
