//! Everything shared by one training-and-scan run.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::cache::NearestExpressionCache;
use crate::compacter::ExpressionCompacter;
use crate::config::{Level, ScanConfig};
use crate::error::FlagError;
use crate::model::{self, Model};
use crate::search::SearchAlgorithm;
use crate::trie::Trie;

/// Configuration, compacter, one trie and one cache per configured level.
///
/// Built once, then shared read-only (apart from the compacter's and the
/// caches' interior locks) by every scanner thread.
pub struct ScanContext {
    config: ScanConfig,
    compacter: Arc<ExpressionCompacter>,
    /// Parallel to `caches`, in `config.levels` order.
    tries: Vec<Trie>,
    caches: Vec<NearestExpressionCache>,
}

impl ScanContext {
    /// Train one trie per configured level from a corpus.
    pub fn train(corpus: &Path, config: ScanConfig) -> Result<Self, FlagError> {
        let config = config.normalized();
        let compacter = Arc::new(ExpressionCompacter::new());
        let start = Instant::now();

        let mut tries = Vec::with_capacity(config.levels.len());
        for &level in &config.levels {
            tries.push(Trie::build(corpus, level, &compacter)?);
        }
        info!(
            corpus = %corpus.display(),
            levels = tries.len(),
            tokens = compacter.len(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Training complete"
        );
        Self::from_parts(config, compacter, tries)
    }

    /// Use a previously saved model. Every configured level must be present.
    pub fn from_model(model: Model, config: ScanConfig) -> Result<Self, FlagError> {
        let (compacter, tries) = model.into_parts();
        Self::from_parts(config, Arc::new(compacter), tries)
    }

    /// Assemble a context from already-built parts. Tries for levels that are
    /// not configured are dropped.
    pub fn from_parts(
        config: ScanConfig,
        compacter: Arc<ExpressionCompacter>,
        tries: Vec<Trie>,
    ) -> Result<Self, FlagError> {
        let config = config.normalized();
        let mut available = tries;
        let mut tries = Vec::with_capacity(config.levels.len());
        let mut caches = Vec::with_capacity(config.levels.len());
        for &level in &config.levels {
            let idx = available
                .iter()
                .position(|t| t.level() == level)
                .ok_or_else(|| FlagError::MissingLevel { level: level.to_string() })?;
            let mut trie = available.swap_remove(idx);
            if config.algorithm == SearchAlgorithm::SymmetricDelete {
                trie.prepare_symmetric_delete(config.max_cost);
            }
            tries.push(trie);
            caches.push(NearestExpressionCache::new(level));
        }
        Ok(Self { config, compacter, tries, caches })
    }

    pub fn save_model(&self, path: &Path) -> Result<(), FlagError> {
        model::save_model(path, &self.compacter, &self.tries)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn compacter(&self) -> &ExpressionCompacter {
        &self.compacter
    }

    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.tries.iter().map(Trie::level)
    }

    pub fn trie(&self, level: Level) -> Result<&Trie, FlagError> {
        self.position(level).map(|i| &self.tries[i])
    }

    pub fn cache(&self, level: Level) -> Result<&NearestExpressionCache, FlagError> {
        self.position(level).map(|i| &self.caches[i])
    }

    pub fn log_cache_stats(&self) {
        for cache in &self.caches {
            cache.log_stats();
        }
    }

    fn position(&self, level: Level) -> Result<usize, FlagError> {
        self.tries
            .iter()
            .position(|t| t.level() == level)
            .ok_or_else(|| FlagError::MissingLevel { level: level.to_string() })
    }
}
