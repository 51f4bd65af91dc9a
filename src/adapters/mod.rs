//! Scored store adapters.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryScoredStore;
pub use sqlite::SqliteScoredStore;
