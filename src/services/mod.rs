//! Service layer: ruler strategies, the piece cache and the selection engine.

pub mod piece_cache;
pub mod ruler_registry;
pub mod selection_engine;

pub use piece_cache::PieceCache;
pub use ruler_registry::{RulerContext, RulerRegistry, RulerStrategy};
pub use selection_engine::{SelectionEngine, SelectionEngineBuilder};
