//! Process-local cache of piece results.
//!
//! Entries are keyed by [`PieceKey`] and spread over independently locked
//! shards. The shard is chosen from the piece-list key alone, so every entry
//! of a namespace lives in one shard and dropping a namespace locks only that
//! shard. Critical sections are plain map operations; callers never hold a
//! shard lock across storage I/O.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::models::{PieceKey, PieceResults};

type Shard = HashMap<PieceKey, PieceResults>;

#[derive(Debug)]
pub struct PieceCache {
    shards: Box<[Mutex<Shard>]>,
    hasher: RandomState,
}

impl PieceCache {
    /// Create a cache with `shards` shards (at least one).
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| Mutex::new(Shard::new())).collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn shard_for(&self, list_key: &str) -> MutexGuard<'_, Shard> {
        let index = self.hasher.hash_one(list_key) % self.shards.len() as u64;
        // A poisoned shard still holds a consistent map: every critical
        // section is a single map call.
        self.shards[index as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store results for a piece, replacing earlier ones.
    pub fn put(&self, key: PieceKey, results: PieceResults) -> Option<PieceResults> {
        self.shard_for(&key.list_key).insert(key, results)
    }

    pub fn get(&self, key: &PieceKey) -> Option<PieceResults> {
        self.shard_for(&key.list_key).get(key).cloned()
    }

    /// Drop every entry owned by the piece list at `list_key`.
    ///
    /// # Returns
    /// The number of entries removed
    pub fn delete_namespace(&self, list_key: &str) -> usize {
        let mut shard = self.shard_for(list_key);
        let before = shard.len();
        shard.retain(|key, _| !key.belongs_to(list_key));
        before - shard.len()
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PieceCache {
    fn default() -> Self {
        Self::new(16)
    }
}
