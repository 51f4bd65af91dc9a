//! Domain models for the selection engine.

pub mod config;
pub mod namespace;
pub mod ruler;
pub mod selection;
pub mod stage;

pub use config::{
    Config, EngineConfig, LogFormat, LoggingConfig, RotationPolicy, StorageBackend, StorageConfig,
};
pub use namespace::{
    KeySpace, Namespace, NamespaceKeys, PieceKey, DEFAULT_KEY_PREFIX, NAMESPACE_SEPARATOR,
};
pub use ruler::{BuiltinRuler, DEFAULT_RULER};
pub use selection::{PieceResults, Selection};
pub use stage::Stage;
