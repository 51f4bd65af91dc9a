//! In-process scored store.
//!
//! Holds scored sets and scalars in maps behind a `tokio` read/write lock.
//! Useful for tests and for single-process deployments where selection
//! statistics need not survive a restart.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;

use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::ports::ScoredStore;

#[derive(Debug, Default)]
struct Tables {
    scored: HashMap<String, HashMap<String, f64>>,
    scalars: HashMap<String, String>,
}

/// Scored store kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryScoredStore {
    tables: RwLock<Tables>,
    rng: Mutex<StdRng>,
}

impl InMemoryScoredStore {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a store whose random member selection is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            rng: Mutex::new(rng),
        }
    }

    /// Score of `member` in the set at `key`, if present.
    pub async fn score(&self, key: &str, member: &str) -> Option<f64> {
        let tables = self.tables.read().await;
        tables.scored.get(key).and_then(|set| set.get(member).copied())
    }

    /// Number of members in the set at `key`.
    pub async fn cardinality(&self, key: &str) -> usize {
        let tables = self.tables.read().await;
        tables.scored.get(key).map_or(0, HashMap::len)
    }
}

impl Default for InMemoryScoredStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoredStore for InMemoryScoredStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.scored.contains_key(key) || tables.scalars.contains_key(key))
    }

    async fn exists_in_scored_set(&self, key: &str, member: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .scored
            .get(key)
            .is_some_and(|set| set.contains_key(member)))
    }

    async fn set_element_by_score(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .scored
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn increment_scored_element(
        &self,
        key: &str,
        member: &str,
        delta: f64,
    ) -> StoreResult<f64> {
        let mut tables = self.tables.write().await;
        let score = tables
            .scored
            .entry(key.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn get_highest_scored_elements(&self, key: &str, n: usize) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        let Some(set) = tables.scored.get(key) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<(&String, f64)> = set.iter().map(|(m, s)| (m, *s)).collect();
        members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(a.0)));

        Ok(members
            .into_iter()
            .take(n)
            .map(|(member, _)| member.clone())
            .collect())
    }

    async fn get_random_from_scored_set(&self, key: &str) -> StoreResult<String> {
        let tables = self.tables.read().await;
        let set = tables
            .scored
            .get(key)
            .filter(|set| !set.is_empty())
            .ok_or_else(|| StoreError::EmptySet(key.to_string()))?;

        // HashMap iteration order is arbitrary; sort so a seeded rng is reproducible.
        let mut members: Vec<&String> = set.keys().collect();
        members.sort_unstable();

        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..members.len());
        Ok(members[index].clone())
    }

    async fn get(&self, key: &str) -> StoreResult<String> {
        let tables = self.tables.read().await;
        tables
            .scalars
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.scalars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.scored.remove(key);
        tables.scalars.remove(key);
        Ok(())
    }
}
