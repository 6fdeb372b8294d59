//! Per-level memo of ranked nearest-expression searches, shared by all
//! scanner threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::config::Level;
use crate::search::NearestExpression;

/// Ranked (untruncated) search results for one compacted expression.
pub type CachedResults = Arc<Vec<NearestExpression>>;

/// Hit/miss counters of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Compacted expression → ranked nearest expressions.
///
/// Lookups take the shared lock, inserts the exclusive one. Two threads that
/// miss on the same key both search; the first insert wins and the second
/// caller gets the stored value back, so every reader sees one result per key.
pub struct NearestExpressionCache {
    level: Level,
    entries: RwLock<HashMap<String, CachedResults>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl NearestExpressionCache {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn lookup(&self, expression: &str) -> Option<CachedResults> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(expression) {
            Some(results) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(results))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `results` unless the key is already present; returns what the
    /// cache holds for `expression` afterwards.
    pub fn insert(&self, expression: &str, results: Vec<NearestExpression>) -> CachedResults {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            entries
                .entry(expression.to_string())
                .or_insert_with(|| Arc::new(results)),
        )
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            level = %self.level,
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entries,
            "Nearest-expression cache stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: usize) -> Vec<NearestExpression> {
        (0..n).map(|i| NearestExpression::new(format!("({})", i), i, 1)).collect()
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = NearestExpressionCache::new(Level::One);
        assert!(cache.lookup("(0)").is_none());
        cache.insert("(0)", results(2));
        let hit = cache.lookup("(0)").unwrap();
        assert_eq!(hit.len(), 2);
        assert_eq!(
            cache.stats(),
            CacheStats { hits: 1, misses: 1, entries: 1 }
        );
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = NearestExpressionCache::new(Level::Two);
        let first = cache.insert("(0)", results(1));
        let second = cache.insert("(0)", results(3));
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.lookup("(0)").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_results_are_cached() {
        let cache = NearestExpressionCache::new(Level::One);
        cache.insert("(9)", Vec::new());
        assert!(cache.lookup("(9)").unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_inserts_agree() {
        let cache = NearestExpressionCache::new(Level::One);
        let seen: Vec<CachedResults> = std::thread::scope(|s| {
            let handles: Vec<_> = (1..=8)
                .map(|n| {
                    let cache = &cache;
                    s.spawn(move || {
                        cache.lookup("(0)");
                        cache.insert("(0)", results(n))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for r in &seen {
            assert!(Arc::ptr_eq(r, &seen[0]));
        }
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits + stats.misses, 8);
    }
}
