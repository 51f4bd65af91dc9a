use async_trait::async_trait;

use crate::domain::errors::StoreResult;

/// Storage contract for scored sets and scalar values.
///
/// Every call is expected to be atomic on its own. The engine never groups
/// calls into transactions.
#[async_trait]
pub trait ScoredStore: Send + Sync {
    /// Whether `key` holds a scored set or a scalar.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Whether `member` belongs to the scored set at `key`.
    async fn exists_in_scored_set(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Insert `member` or overwrite its score.
    async fn set_element_by_score(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// Atomically add `delta` to the score of `member`, creating it at `delta`
    /// when absent.
    ///
    /// # Returns
    /// The new score
    async fn increment_scored_element(&self, key: &str, member: &str, delta: f64)
        -> StoreResult<f64>;

    /// Up to `n` members ordered by descending score.
    ///
    /// Ties must be broken deterministically for a given store state. A missing
    /// key yields an empty list.
    async fn get_highest_scored_elements(&self, key: &str, n: usize) -> StoreResult<Vec<String>>;

    /// A uniformly random member of the scored set at `key`.
    ///
    /// # Errors
    /// `StoreError::EmptySet` when the set is empty or missing
    async fn get_random_from_scored_set(&self, key: &str) -> StoreResult<String>;

    /// Read a scalar.
    ///
    /// # Errors
    /// `StoreError::KeyNotFound` when no scalar is stored at `key`
    async fn get(&self, key: &str) -> StoreResult<String>;

    /// Write a scalar, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete whatever is stored at `key`. Missing keys are not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
