//! Scan orchestrator: evaluates every conditional expression of a work list
//! against the trained tries, on a fixed pool of worker threads.
//!
//! Workers claim the next unprocessed item from a shared atomic cursor, so
//! items complete in no particular order. Per expression and level the
//! pipeline is: compact → exact lookup → cached or fresh search (ranked) →
//! truncate to `max_autocorrections` → anomaly check → [`ReportSink`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::CachedResults;
use crate::clean_expression;
use crate::config::Level;
use crate::context::ScanContext;
use crate::corpus::{ExpressionParser, ParsedSource};
use crate::error::FlagError;
use crate::ranking::{is_potential_anomaly, sort_and_rank_results};

// ─── Reporting types ─────────────────────────────────────────────────

/// One suggested correction, expanded back to token form.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub expression: String,
    pub cost: usize,
    pub occurrences: usize,
    pub contributors: usize,
}

/// Verdict for one expression at one level.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ScanRecord {
    /// File path, or `query` for ad-hoc expressions.
    pub source: String,
    /// 1-based (row, column) when the parser knows it.
    pub position: Option<(usize, usize)>,
    pub level: Level,
    /// Cleaned abstracted expression.
    pub expression: String,
    /// Original source text of the expression.
    pub original: String,
    pub found: bool,
    pub anomalous: bool,
    /// Ranked, truncated to `max_autocorrections`.
    pub suggestions: Vec<Suggestion>,
}

/// Receiver of scan records; called concurrently from every worker.
pub trait ReportSink: Sync {
    fn report(&self, record: &ScanRecord) -> Result<(), FlagError>;
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<ScanRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_records(self) -> Vec<ScanRecord> {
        self.records.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReportSink for CollectingSink {
    fn report(&self, record: &ScanRecord) -> Result<(), FlagError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}

/// Totals of one scan run, merged from every worker.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Work items (files or queries) processed.
    pub items: usize,
    /// Work items that could not be parsed.
    pub skipped_items: usize,
    /// Expressions evaluated at one or more levels.
    pub expressions: usize,
    /// (expression, level) pairs that failed and were skipped.
    pub skipped_expressions: usize,
    /// Expressions stored in the trie of at least one level.
    pub found: usize,
    /// Expressions stored in none of the evaluated levels.
    pub not_found: usize,
    /// Expressions flagged at one or more levels.
    pub anomalies: usize,
    /// level → (found in that level's trie, not found)
    pub lookups: BTreeMap<Level, (usize, usize)>,
    /// level → (cache hits, cache misses)
    pub cache: BTreeMap<Level, (usize, usize)>,
}

impl ScanSummary {
    fn merge(&mut self, other: ScanSummary) {
        self.items += other.items;
        self.skipped_items += other.skipped_items;
        self.expressions += other.expressions;
        self.skipped_expressions += other.skipped_expressions;
        self.found += other.found;
        self.not_found += other.not_found;
        self.anomalies += other.anomalies;
        merge_counts(&mut self.lookups, other.lookups);
        merge_counts(&mut self.cache, other.cache);
    }

    /// `ONE_hit:1 ONE_miss:0 TWO_hit:0 TWO_miss:1`, from trie lookups.
    fn lookup_line(&self) -> String {
        self.lookups
            .iter()
            .map(|(level, (hits, misses))| format!("{}_hit:{} {}_miss:{}", level, hits, level, misses))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn merge_counts(into: &mut BTreeMap<Level, (usize, usize)>, from: BTreeMap<Level, (usize, usize)>) {
    for (level, (hits, misses)) in from {
        let entry = into.entry(level).or_insert((0, 0));
        entry.0 += hits;
        entry.1 += misses;
    }
}

fn count(counts: &mut BTreeMap<Level, (usize, usize)>, level: Level, hit: bool) {
    let entry = counts.entry(level).or_insert((0, 0));
    if hit {
        entry.0 += 1;
    } else {
        entry.1 += 1;
    }
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// Result of evaluating one rendered expression at one level.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub found: bool,
    pub anomalous: bool,
    pub suggestions: Vec<Suggestion>,
    pub cache_hit: bool,
}

// ─── Scanner ─────────────────────────────────────────────────────────

pub struct Scanner<'a, P: ExpressionParser> {
    context: &'a ScanContext,
    parser: &'a P,
    cancel: Arc<AtomicBool>,
}

impl<'a, P: ExpressionParser> Scanner<'a, P> {
    pub fn new(context: &'a ScanContext, parser: &'a P) -> Self {
        Self {
            context,
            parser,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag (e.g. with an interrupt handler). Workers
    /// check it between work items.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn scan_files(
        &self,
        files: &[PathBuf],
        sink: &dyn ReportSink,
    ) -> Result<ScanSummary, FlagError> {
        self.run(files, |path| self.parser.parse_file(path), sink)
    }

    pub fn scan_queries(
        &self,
        queries: &[String],
        sink: &dyn ReportSink,
    ) -> Result<ScanSummary, FlagError> {
        self.run(queries, |query| self.parser.parse_query(query), sink)
    }

    /// Evaluate one rendered expression against the trie of `level`.
    pub fn evaluate(&self, rendered: &str, level: Level) -> Result<Evaluation, FlagError> {
        let config = self.context.config();
        let trie = self.context.trie(level)?;
        let cache = self.context.cache(level)?;
        let compacter = self.context.compacter();

        let compacted = compacter.compact_for_lookup(rendered);
        let found = trie.lookup(&compacted).is_some();

        let (results, cache_hit): (CachedResults, bool) = match cache.lookup(&compacted) {
            Some(results) => (results, true),
            None => {
                let start = Instant::now();
                let mut results = trie.search_nearest_expressions(
                    &compacted,
                    config.max_cost,
                    config.num_threads,
                    config.algorithm,
                );
                debug!(
                    level = %level,
                    results = results.len(),
                    algorithm = %config.algorithm,
                    "Autocorrect search took {:.6} secs",
                    start.elapsed().as_secs_f64()
                );
                sort_and_rank_results(&mut results);
                (cache.insert(&compacted, results), false)
            }
        };

        let top = &results[..results.len().min(config.max_autocorrections)];
        let anomalous = is_potential_anomaly(top, config.anomaly_threshold);
        let suggestions = top
            .iter()
            .map(|r| {
                Ok(Suggestion {
                    expression: clean_expression(&compacter.expand(&r.expression)?),
                    cost: r.cost,
                    occurrences: r.occurrences,
                    contributors: r.contributors,
                })
            })
            .collect::<Result<Vec<_>, FlagError>>()?;

        Ok(Evaluation {
            found,
            anomalous,
            suggestions,
            cache_hit,
        })
    }

    fn run<T, F>(&self, items: &[T], parse: F, sink: &dyn ReportSink) -> Result<ScanSummary, FlagError>
    where
        T: Sync,
        F: Fn(&T) -> Result<ParsedSource<P::Node>, FlagError> + Sync,
    {
        let start = Instant::now();
        let cursor = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let fatal: Mutex<Option<FlagError>> = Mutex::new(None);
        let progress_step = (items.len() / 10).max(1);
        let workers = self.context.config().num_threads.clamp(1, items.len().max(1));

        let worker = || {
            let mut summary = ScanSummary::default();
            loop {
                if self.cancel.load(Ordering::Relaxed) || has_failed(&fatal) {
                    break;
                }
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(idx) else { break };

                let outcome = match parse(item) {
                    Ok(parsed) => self.scan_item(&parsed, sink, &mut summary),
                    Err(e) if e.is_invariant_violation() => Err(e),
                    Err(e) => {
                        warn!(error = %e, "Skipping unparsable input");
                        summary.skipped_items += 1;
                        Ok(())
                    }
                };
                if let Err(e) = outcome {
                    fatal.lock().unwrap_or_else(|p| p.into_inner()).get_or_insert(e);
                    break;
                }
                summary.items += 1;

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % progress_step == 0 || done == items.len() {
                    info!("Scan progress: {}/{}", done, items.len());
                }
            }
            summary
        };

        let mut summary = ScanSummary::default();
        if workers == 1 {
            summary = worker();
        } else {
            let per_worker: Vec<ScanSummary> = std::thread::scope(|s| {
                let handles: Vec<_> = (0..workers).map(|_| s.spawn(&worker)).collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join().unwrap_or_else(|_| {
                            warn!("Scan worker panicked; its partial results are lost");
                            ScanSummary::default()
                        })
                    })
                    .collect()
            });
            for part in per_worker {
                summary.merge(part);
            }
        }

        if let Some(e) = fatal.into_inner().unwrap_or_else(|p| p.into_inner()) {
            return Err(e);
        }

        info!(
            items = summary.items,
            expressions = summary.expressions,
            found = summary.found,
            not_found = summary.not_found,
            anomalies = summary.anomalies,
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Scan complete"
        );
        self.context.log_cache_stats();

        if self.cancel.load(Ordering::Relaxed) && summary.items < items.len() {
            warn!(
                processed = summary.items,
                total = items.len(),
                "Scan cancelled"
            );
            return Err(FlagError::Cancelled);
        }
        Ok(summary)
    }

    /// Evaluate every expression of one parsed item at every configured level.
    /// Per-expression input errors are logged and skipped; an error returned
    /// from here ends the run (invariant violation or a failing sink).
    fn scan_item(
        &self,
        parsed: &ParsedSource<P::Node>,
        sink: &dyn ReportSink,
        summary: &mut ScanSummary,
    ) -> Result<(), FlagError> {
        let mut item = ScanSummary::default();

        for node in &parsed.nodes {
            let mut evaluated = false;
            let mut found_anywhere = false;
            let mut anomalous_anywhere = false;

            for level in self.context.levels() {
                let rendered = match self.parser.render(node, level) {
                    Ok(r) => r,
                    Err(e) => {
                        debug!(source = %parsed.name, level = %level, error = %e, "Skipping expression");
                        item.skipped_expressions += 1;
                        continue;
                    }
                };
                let evaluation = match self.evaluate(&rendered, level) {
                    Ok(ev) => ev,
                    Err(e) if e.is_invariant_violation() => return Err(e),
                    Err(e) => {
                        warn!(source = %parsed.name, level = %level, error = %e, "Skipping expression");
                        item.skipped_expressions += 1;
                        continue;
                    }
                };

                evaluated = true;
                found_anywhere |= evaluation.found;
                anomalous_anywhere |= evaluation.anomalous;
                count(&mut item.lookups, level, evaluation.found);
                count(&mut item.cache, level, evaluation.cache_hit);

                sink.report(&ScanRecord {
                    source: parsed.name.clone(),
                    position: self.parser.position(node),
                    level,
                    expression: clean_expression(&rendered),
                    original: self.parser.original_source(node, &parsed.contents),
                    found: evaluation.found,
                    anomalous: evaluation.anomalous,
                    suggestions: evaluation.suggestions,
                })?;
            }

            if evaluated {
                item.expressions += 1;
                if found_anywhere {
                    item.found += 1;
                } else {
                    item.not_found += 1;
                }
                if anomalous_anywhere {
                    item.anomalies += 1;
                }
            }
        }

        debug!(
            source = %parsed.name,
            "SUMMARY Total:{} Found:{} Not_found:{} {}",
            item.expressions,
            item.found,
            item.not_found,
            item.lookup_line()
        );
        summary.merge(item);
        Ok(())
    }
}

fn has_failed(fatal: &Mutex<Option<FlagError>>) -> bool {
    fatal.lock().unwrap_or_else(|p| p.into_inner()).is_some()
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
