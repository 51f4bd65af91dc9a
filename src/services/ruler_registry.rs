//! Ruler strategies and their registry.
//!
//! A ruler picks one piece identifier out of a namespace's piece scored set.
//! The engine ships [`BuiltinRuler::Random`] and [`BuiltinRuler::Highest`];
//! further strategies implement [`RulerStrategy`] and are handed to the
//! engine builder. The registry is assembled once when the engine boots and
//! is read-only afterwards.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::{EngineError, EngineResult, StoreError};
use crate::domain::models::{BuiltinRuler, NamespaceKeys};
use crate::domain::ports::ScoredStore;

/// Everything a ruler may look at while choosing a piece.
pub struct RulerContext<'a> {
    pub store: &'a dyn ScoredStore,
    pub keys: &'a NamespaceKeys,
    pub labels: &'a [String],
}

/// A named piece selection strategy.
#[async_trait]
pub trait RulerStrategy: Send + Sync {
    /// Name persisted in the namespace's ruler scored set.
    fn name(&self) -> &str;

    /// Choose a piece for a trial.
    async fn select(&self, ctx: &RulerContext<'_>) -> EngineResult<String>;

    /// Choose a piece for a replay.
    ///
    /// Deterministic strategies reproduce their trial choice by selecting
    /// again, which is the default.
    async fn replay(&self, ctx: &RulerContext<'_>) -> EngineResult<String> {
        self.select(ctx).await
    }
}

#[async_trait]
impl RulerStrategy for BuiltinRuler {
    fn name(&self) -> &str {
        self.as_str()
    }

    async fn select(&self, ctx: &RulerContext<'_>) -> EngineResult<String> {
        match self {
            Self::Random => select_random(ctx).await,
            Self::Highest => select_highest(ctx).await,
        }
    }

    async fn replay(&self, ctx: &RulerContext<'_>) -> EngineResult<String> {
        match self {
            Self::Random => replay_random(ctx).await,
            Self::Highest => select_highest(ctx).await,
        }
    }
}

async fn select_random(ctx: &RulerContext<'_>) -> EngineResult<String> {
    match ctx.store.get_random_from_scored_set(&ctx.keys.piece_list).await {
        Ok(piece_id) => Ok(piece_id),
        Err(StoreError::EmptySet(_)) => Err(EngineError::NotFound(format!(
            "no pieces registered for namespace '{}'",
            ctx.keys.namespace
        ))),
        Err(err) => Err(err.into()),
    }
}

/// A random draw cannot be repeated, so replay returns the piece recorded by
/// the latest execution while it is still registered.
async fn replay_random(ctx: &RulerContext<'_>) -> EngineResult<String> {
    let recorded = match ctx.store.get(&ctx.keys.piece_used).await {
        Ok(piece_id) => Some(piece_id),
        Err(StoreError::KeyNotFound(_)) => None,
        Err(err) => return Err(err.into()),
    };

    if let Some(piece_id) = recorded {
        if ctx
            .store
            .exists_in_scored_set(&ctx.keys.piece_list, &piece_id)
            .await?
        {
            return Ok(piece_id);
        }
    }

    select_random(ctx).await
}

async fn select_highest(ctx: &RulerContext<'_>) -> EngineResult<String> {
    let mut elements = ctx
        .store
        .get_highest_scored_elements(&ctx.keys.piece_list, 1)
        .await?;

    // Exactly one element was requested; anything else means there is no
    // usable element.
    if elements.len() != 1 {
        return Err(EngineError::NotFound(format!(
            "expected one highest scored piece for namespace '{}', got {}",
            ctx.keys.namespace,
            elements.len()
        )));
    }

    Ok(elements.remove(0))
}

/// Immutable name to strategy mapping, ordered by name.
#[derive(Clone, Default)]
pub struct RulerRegistry {
    rulers: BTreeMap<String, Arc<dyn RulerStrategy>>,
}

impl RulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every [`BuiltinRuler`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for ruler in BuiltinRuler::ALL {
            registry
                .rulers
                .insert(ruler.as_str().to_string(), Arc::new(ruler));
        }
        registry
    }

    /// Add a strategy. Names must be unique.
    pub fn register(&mut self, ruler: Arc<dyn RulerStrategy>) -> EngineResult<()> {
        let name = ruler.name().to_string();
        if name.is_empty() {
            return Err(EngineError::InvalidConfig(
                "ruler name must not be empty".to_string(),
            ));
        }
        if self.rulers.contains_key(&name) {
            return Err(EngineError::InvalidConfig(format!(
                "ruler '{name}' is already registered"
            )));
        }
        self.rulers.insert(name, ruler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn RulerStrategy>> {
        self.rulers.get(name)
    }

    /// Look up a strategy, failing with `NotFound` for unknown names.
    pub fn resolve(&self, name: &str) -> EngineResult<Arc<dyn RulerStrategy>> {
        self.rulers
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("no ruler for key: {name}")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rulers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rulers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rulers.is_empty()
    }
}

impl fmt::Debug for RulerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rulers.keys()).finish()
    }
}
