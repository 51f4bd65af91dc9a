//! Selection engine: trial/replay protocol and statistics.
//!
//! Per namespace the engine moves through
//! `empty -> seeded -> populated -> used -> scored`, and `delete`/`failure`
//! collapse any state back to `empty`. Nothing enforces that order beyond the
//! storage existence checks; `execute` on an empty namespace fails with
//! `NotFound`.

use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument, warn, Span};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    EngineConfig, KeySpace, PieceResults, Selection, Stage, DEFAULT_RULER,
};
use crate::domain::ports::ScoredStore;
use crate::services::piece_cache::PieceCache;
use crate::services::ruler_registry::{RulerContext, RulerRegistry, RulerStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Booted,
    ShutDown,
}

#[derive(Debug)]
struct EngineState {
    phase: Phase,
    registry: Option<Arc<RulerRegistry>>,
}

/// Builder for [`SelectionEngine`].
#[derive(Default)]
pub struct SelectionEngineBuilder {
    store: Option<Arc<dyn ScoredStore>>,
    config: EngineConfig,
    rulers: Vec<Arc<dyn RulerStrategy>>,
}

impl SelectionEngineBuilder {
    pub fn store(mut self, store: Arc<dyn ScoredStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an additional strategy next to the built-in ones.
    pub fn ruler(mut self, ruler: Arc<dyn RulerStrategy>) -> Self {
        self.rulers.push(ruler);
        self
    }

    pub fn build(self) -> EngineResult<SelectionEngine> {
        let store = self.store.ok_or_else(|| {
            EngineError::InvalidConfig("scored store must not be empty".to_string())
        })?;
        if self.config.key_prefix.is_empty() {
            return Err(EngineError::InvalidConfig(
                "key prefix must not be empty".to_string(),
            ));
        }
        if self.config.cache_shards == 0 {
            return Err(EngineError::InvalidConfig(
                "cache shards must be at least 1".to_string(),
            ));
        }

        let (shutdown_tx, _) = watch::channel(false);

        Ok(SelectionEngine {
            store,
            keys: KeySpace::new(self.config.key_prefix),
            cache: PieceCache::new(self.config.cache_shards),
            custom_rulers: self.rulers,
            state: RwLock::new(EngineState {
                phase: Phase::Created,
                registry: None,
            }),
            shutdown_tx,
        })
    }
}

/// Adaptive configuration selection engine.
///
/// Must be booted before use. All operations run on the caller's task and
/// issue one to three storage calls each.
pub struct SelectionEngine {
    store: Arc<dyn ScoredStore>,
    keys: KeySpace,
    cache: PieceCache,
    custom_rulers: Vec<Arc<dyn RulerStrategy>>,
    state: RwLock<EngineState>,
    shutdown_tx: watch::Sender<bool>,
}

impl SelectionEngine {
    pub fn builder() -> SelectionEngineBuilder {
        SelectionEngineBuilder::default()
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    pub fn cache(&self) -> &PieceCache {
        &self.cache
    }

    /// Register the ruler strategies. Repeated calls are no-ops.
    pub async fn boot(&self) -> EngineResult<()> {
        let mut state = self.state.write().await;
        match state.phase {
            Phase::Booted => return Ok(()),
            Phase::ShutDown => return Err(EngineError::ShutDown),
            Phase::Created => {}
        }

        let mut registry = RulerRegistry::with_builtins();
        for ruler in &self.custom_rulers {
            registry.register(Arc::clone(ruler))?;
        }

        info!(rulers = ?registry, "selection engine booted");
        state.registry = Some(Arc::new(registry));
        state.phase = Phase::Booted;
        Ok(())
    }

    /// Mark the engine non-operational. Repeated calls are no-ops.
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        if state.phase == Phase::ShutDown {
            return;
        }

        state.phase = Phase::ShutDown;
        state.registry = None;
        self.shutdown_tx.send_replace(true);
        info!("selection engine shut down");
    }

    /// Receiver that flips to `true` once the engine shuts down.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.phase == Phase::Booted
    }

    async fn registry(&self) -> EngineResult<Arc<RulerRegistry>> {
        let state = self.state.read().await;
        match (state.phase, &state.registry) {
            (Phase::Booted, Some(registry)) => Ok(Arc::clone(registry)),
            (Phase::ShutDown, _) => Err(EngineError::ShutDown),
            _ => Err(EngineError::NotInitialized),
        }
    }

    /// Register a piece and its results under the namespace of `labels`.
    ///
    /// During a trial the namespace's ruler set is seeded with every
    /// registered ruler at score 0 unless it already exists. A new piece
    /// enters the piece set at score 0; an existing piece keeps its score.
    /// The cached results are always replaced.
    #[instrument(
        skip(self, labels, results),
        fields(stage = stage.as_str(), namespace = tracing::field::Empty)
    )]
    pub async fn create<L: AsRef<str>>(
        &self,
        stage: Stage,
        labels: &[L],
        piece_id: &str,
        results: PieceResults,
    ) -> EngineResult<()> {
        let registry = self.registry().await?;
        let keys = self.keys.keys_for(labels);
        Span::current().record("namespace", keys.namespace.as_str());

        if stage.is_trial() && !self.store.exists(&keys.ruler_list).await? {
            for name in registry.names() {
                self.store
                    .set_element_by_score(&keys.ruler_list, name, 0.0)
                    .await?;
            }
            debug!(rulers = registry.len(), "seeded ruler set");
        }

        if !self
            .store
            .exists_in_scored_set(&keys.piece_list, piece_id)
            .await?
        {
            self.store
                .set_element_by_score(&keys.piece_list, piece_id, 0.0)
                .await?;
            debug!("registered new piece");
        }

        self.cache.put(keys.piece_key(piece_id), results);
        Ok(())
    }

    /// Select a piece for the namespace of `labels`.
    ///
    /// A trial picks the best scoring ruler (falling back to `random`) and
    /// records it; a replay reuses the ruler recorded by the latest trial.
    /// The chosen piece is recorded in both cases.
    #[instrument(
        skip(self, labels),
        fields(stage = stage.as_str(), namespace = tracing::field::Empty)
    )]
    pub async fn execute<L: AsRef<str>>(&self, stage: Stage, labels: &[L]) -> EngineResult<Selection> {
        if !stage.is_trial() && !stage.is_replay() {
            return Err(EngineError::InvalidContext(
                "execute requires a trial or replay stage".to_string(),
            ));
        }

        let registry = self.registry().await?;
        let keys = self.keys.keys_for(labels);
        Span::current().record("namespace", keys.namespace.as_str());

        let ruler_name = if stage.is_trial() {
            let best = self
                .store
                .get_highest_scored_elements(&keys.ruler_list, 1)
                .await?
                .into_iter()
                .next()
                .unwrap_or_else(|| DEFAULT_RULER.as_str().to_string());
            self.store.set(&keys.ruler_used, &best).await?;
            best
        } else {
            self.store.get(&keys.ruler_used).await?
        };

        let ruler = registry.resolve(&ruler_name)?;
        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        let ctx = RulerContext {
            store: self.store.as_ref(),
            keys: &keys,
            labels: &labels,
        };
        let piece_id = if stage.is_trial() {
            ruler.select(&ctx).await?
        } else {
            ruler.replay(&ctx).await?
        };

        self.store.set(&keys.piece_used, &piece_id).await?;

        let results = self
            .cache
            .get(&keys.piece_key(piece_id.as_str()))
            .unwrap_or_else(|| {
                debug!(piece_id = %piece_id, "no cached results for piece");
                Vec::new()
            });

        debug!(ruler = %ruler_name, piece_id = %piece_id, "selected piece");
        Ok(Selection {
            piece_id,
            ruler: ruler_name,
            results,
        })
    }

    /// Credit the ruler and piece used by the latest execution with one
    /// success each.
    #[instrument(skip(self, labels), fields(namespace = tracing::field::Empty))]
    pub async fn success<L: AsRef<str>>(&self, labels: &[L]) -> EngineResult<()> {
        self.registry().await?;
        let keys = self.keys.keys_for(labels);
        Span::current().record("namespace", keys.namespace.as_str());

        let ruler = self.store.get(&keys.ruler_used).await?;
        let ruler_score = self
            .store
            .increment_scored_element(&keys.ruler_list, &ruler, 1.0)
            .await?;

        let piece_id = self.store.get(&keys.piece_used).await?;
        let piece_score = self
            .store
            .increment_scored_element(&keys.piece_list, &piece_id, 1.0)
            .await?;

        debug!(
            ruler = %ruler,
            ruler_score,
            piece_id = %piece_id,
            piece_score,
            "recorded success"
        );
        Ok(())
    }

    /// Discard the namespace after an unsuccessful run.
    #[instrument(skip(self, labels), fields(namespace = tracing::field::Empty))]
    pub async fn failure<L: AsRef<str>>(&self, labels: &[L]) -> EngineResult<()> {
        self.registry().await?;
        let keys = self.keys.keys_for(labels);
        Span::current().record("namespace", keys.namespace.as_str());

        warn!("configuration run failed, purging namespace");
        self.delete(labels).await
    }

    /// Remove the ruler and piece sets of the namespace and its cached
    /// results. Deleting an empty namespace succeeds.
    #[instrument(skip(self, labels), fields(namespace = tracing::field::Empty))]
    pub async fn delete<L: AsRef<str>>(&self, labels: &[L]) -> EngineResult<()> {
        self.registry().await?;
        let keys = self.keys.keys_for(labels);
        Span::current().record("namespace", keys.namespace.as_str());

        self.store.remove(&keys.ruler_list).await?;
        self.store.remove(&keys.piece_list).await?;
        let evicted = self.cache.delete_namespace(&keys.piece_list);

        debug!(evicted, "deleted namespace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryScoredStore;
    use crate::domain::errors::StoreError;
    use serde_json::json;

    const LABELS: [&str; 2] = ["stageA", "featureX"];

    async fn setup_engine() -> (Arc<InMemoryScoredStore>, SelectionEngine) {
        let store = Arc::new(InMemoryScoredStore::with_seed(42));
        let engine = SelectionEngine::builder()
            .store(store.clone())
            .build()
            .unwrap();
        engine.boot().await.unwrap();
        (store, engine)
    }

    #[test]
    fn test_build_requires_store() {
        let err = SelectionEngine::builder().build().err().unwrap();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_build_rejects_empty_prefix() {
        let config = EngineConfig {
            key_prefix: String::new(),
            ..EngineConfig::default()
        };
        let err = SelectionEngine::builder()
            .store(Arc::new(InMemoryScoredStore::new()))
            .config(config)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_operations_require_boot() {
        let engine = SelectionEngine::builder()
            .store(Arc::new(InMemoryScoredStore::new()))
            .build()
            .unwrap();

        let err = engine.create(Stage::Trial, &LABELS, "p1", vec![]).await.unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
        let err = engine.execute(Stage::Trial, &LABELS).await.unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
        assert!(!engine.is_running().await);

        engine.boot().await.unwrap();
        engine.boot().await.unwrap();
        assert!(engine.is_running().await);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (_, engine) = setup_engine().await;
        let mut signal = engine.shutdown_signal();
        assert!(!*signal.borrow());

        engine.shutdown().await;
        engine.shutdown().await;

        signal.changed().await.unwrap();
        assert!(*signal.borrow());
        assert!(matches!(
            engine.success(&LABELS).await.unwrap_err(),
            EngineError::ShutDown
        ));
        assert!(matches!(engine.boot().await.unwrap_err(), EngineError::ShutDown));
    }

    #[tokio::test]
    async fn test_failure_follows_lifecycle() {
        let store = Arc::new(InMemoryScoredStore::with_seed(42));
        let engine = SelectionEngine::builder()
            .store(store.clone())
            .build()
            .unwrap();
        let keys = engine.key_space().keys_for(&LABELS);
        store.set_element_by_score(&keys.piece_list, "p1", 0.0).await.unwrap();

        let err = engine.failure(&LABELS).await.unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
        assert!(store.exists(&keys.piece_list).await.unwrap());

        engine.boot().await.unwrap();
        engine.failure(&LABELS).await.unwrap();
        assert!(!store.exists(&keys.piece_list).await.unwrap());

        engine.shutdown().await;
        let err = engine.failure(&LABELS).await.unwrap_err();
        assert!(matches!(err, EngineError::ShutDown));
    }

    #[tokio::test]
    async fn test_trial_create_seeds_rulers_once() {
        let (store, engine) = setup_engine().await;
        let keys = engine.key_space().keys_for(&LABELS);

        engine.create(Stage::Trial, &LABELS, "p1", vec![json!("val1")]).await.unwrap();
        engine.create(Stage::Trial, &LABELS, "p2", vec![json!("val2")]).await.unwrap();

        assert_eq!(store.score(&keys.ruler_list, "random").await, Some(0.0));
        assert_eq!(store.score(&keys.ruler_list, "highest").await, Some(0.0));
        assert_eq!(store.score(&keys.piece_list, "p1").await, Some(0.0));
        assert_eq!(store.score(&keys.piece_list, "p2").await, Some(0.0));

        store.increment_scored_element(&keys.ruler_list, "highest", 3.0).await.unwrap();
        engine.create(Stage::Trial, &LABELS, "p3", vec![]).await.unwrap();
        assert_eq!(store.score(&keys.ruler_list, "highest").await, Some(3.0));
    }

    #[tokio::test]
    async fn test_non_trial_create_does_not_seed_rulers() {
        let (store, engine) = setup_engine().await;
        let keys = engine.key_space().keys_for(&LABELS);

        engine.create(Stage::Neither, &LABELS, "p1", vec![]).await.unwrap();
        engine.create(Stage::Replay, &LABELS, "p2", vec![]).await.unwrap();

        assert_eq!(store.cardinality(&keys.ruler_list).await, 0);
        assert_eq!(store.cardinality(&keys.piece_list).await, 2);
    }

    #[tokio::test]
    async fn test_repeat_create_keeps_score_and_replaces_results() {
        let (store, engine) = setup_engine().await;
        let keys = engine.key_space().keys_for(&LABELS);

        engine.create(Stage::Trial, &LABELS, "p1", vec![json!("old")]).await.unwrap();
        engine.execute(Stage::Trial, &LABELS).await.unwrap();
        engine.success(&LABELS).await.unwrap();

        engine.create(Stage::Trial, &LABELS, "p1", vec![json!("new")]).await.unwrap();
        assert_eq!(store.score(&keys.piece_list, "p1").await, Some(1.0));

        let selection = engine.execute(Stage::Trial, &LABELS).await.unwrap();
        assert_eq!(selection.results, vec![json!("new")]);
    }

    #[tokio::test]
    async fn test_execute_rejects_neither_stage() {
        let (_, engine) = setup_engine().await;
        engine.create(Stage::Trial, &LABELS, "p1", vec![]).await.unwrap();

        let err = engine.execute(Stage::Neither, &LABELS).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidContext(_)));
    }

    #[tokio::test]
    async fn test_execute_without_create_is_not_found() {
        let (_, engine) = setup_engine().await;
        let err = engine.execute(Stage::Trial, &LABELS).await.unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[tokio::test]
    async fn test_replay_without_trial_propagates_store_error() {
        let (_, engine) = setup_engine().await;
        engine.create(Stage::Trial, &LABELS, "p1", vec![]).await.unwrap();

        let err = engine.execute(Stage::Replay, &LABELS).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::KeyNotFound(_))));
    }

    #[tokio::test]
    async fn test_trial_records_ruler_before_selecting() {
        let (store, engine) = setup_engine().await;
        let keys = engine.key_space().keys_for(&LABELS);

        // No pieces: the ruler fails, but the record is already written.
        engine.create(Stage::Trial, &LABELS, "p1", vec![]).await.unwrap();
        store.remove(&keys.piece_list).await.unwrap();

        assert!(engine.execute(Stage::Trial, &LABELS).await.is_err());
        assert_eq!(store.get(&keys.ruler_used).await.unwrap(), "random");
    }

    #[tokio::test]
    async fn test_unregistered_ruler_is_not_found() {
        let (store, engine) = setup_engine().await;
        let keys = engine.key_space().keys_for(&LABELS);
        engine.create(Stage::Trial, &LABELS, "p1", vec![]).await.unwrap();
        store.increment_scored_element(&keys.ruler_list, "retired", 10.0).await.unwrap();

        let err = engine.execute(Stage::Trial, &LABELS).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get(&keys.ruler_used).await.unwrap(), "retired");
    }

    #[tokio::test]
    async fn test_empty_results_are_valid() {
        let (_, engine) = setup_engine().await;
        engine.create(Stage::Trial, &LABELS, "bare", vec![]).await.unwrap();

        let selection = engine.execute(Stage::Trial, &LABELS).await.unwrap();
        assert_eq!(selection.piece_id, "bare");
        assert!(selection.results.is_empty());
    }

    #[tokio::test]
    async fn test_success_requires_prior_execute() {
        let (_, engine) = setup_engine().await;
        engine.create(Stage::Trial, &LABELS, "p1", vec![]).await.unwrap();

        let err = engine.success(&LABELS).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::KeyNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_purges_namespace() {
        let (store, engine) = setup_engine().await;
        let keys = engine.key_space().keys_for(&LABELS);
        let other = ["other"];

        engine.create(Stage::Trial, &LABELS, "p1", vec![json!(1)]).await.unwrap();
        engine.create(Stage::Trial, &other, "p1", vec![json!(2)]).await.unwrap();

        engine.delete(&LABELS).await.unwrap();
        engine.delete(&LABELS).await.unwrap();

        assert!(!store.exists(&keys.ruler_list).await.unwrap());
        assert!(!store.exists(&keys.piece_list).await.unwrap());
        assert!(engine.cache().get(&keys.piece_key("p1")).is_none());
        assert_eq!(engine.cache().len(), 1);

        let selection = engine.execute(Stage::Trial, &other).await.unwrap();
        assert_eq!(selection.results, vec![json!(2)]);
    }
}
