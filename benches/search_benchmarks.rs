//! Criterion benchmarks for the nearest-expression search and its helpers.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the core operations in isolation,
//! using synthetic data to ensure reproducibility across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use condflag::{
    edit_distance, is_potential_anomaly, sort_and_rank_results, ExpressionCompacter, Level,
    SearchAlgorithm, Trie,
};

// ─── Helpers ─────────────────────────────────────────────────────────

const OPERATORS: &[&str] = &["==", "!=", "<", "<=", ">", ">=", "&&", "||", "=", "&", "|"];
const OPERANDS: &[&str] = &[
    "identifier",
    "number_literal",
    "field_expression",
    "call_expression",
    "pointer_expression",
    "null",
    "char_literal",
    "string_literal",
];

/// Synthetic abstracted expressions: every operator over every operand pair,
/// with skewed repetition so some shapes are common and some rare.
fn synthetic_expressions() -> Vec<(String, usize)> {
    let mut expressions = Vec::new();
    for (i, op) in OPERATORS.iter().enumerate() {
        for (j, lhs) in OPERANDS.iter().enumerate() {
            for (k, rhs) in OPERANDS.iter().enumerate() {
                let expression = format!(
                    "(parenthesized_expression (binary_expression (\"{}\") ({}) ({})))",
                    op, lhs, rhs
                );
                let repeats = 1 + (i * 7 + j * 3 + k) % 40;
                expressions.push((expression, repeats));
            }
        }
    }
    expressions
}

fn build_trie(compacter: &ExpressionCompacter) -> Trie {
    let mut trie = Trie::new(Level::One);
    let mut contributor = 0;
    for (expression, repeats) in synthetic_expressions() {
        for _ in 0..repeats {
            contributor += 1;
            trie.insert(&expression, contributor, compacter);
        }
    }
    trie
}

const QUERY: &str = "(parenthesized_expression (binary_expression (\"=\") (identifier) (number_literal)))";

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_search_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_expressions");
    let compacter = ExpressionCompacter::new();
    let mut trie = build_trie(&compacter);
    trie.prepare_symmetric_delete(2);
    let target = compacter.compact(QUERY);

    for algorithm in [
        SearchAlgorithm::TrieTraversal,
        SearchAlgorithm::CandidateGeneration,
        SearchAlgorithm::SymmetricDelete,
    ] {
        for max_cost in [1usize, 2] {
            group.bench_with_input(
                BenchmarkId::new(algorithm.as_str(), max_cost),
                &max_cost,
                |b, &max_cost| {
                    b.iter(|| {
                        let results =
                            trie.search_nearest_expressions(black_box(&target), max_cost, 1, algorithm);
                        black_box(results.len());
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_traversal_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("trie_traversal_threads");
    let compacter = ExpressionCompacter::new();
    let trie = build_trie(&compacter);
    let target = compacter.compact(QUERY);

    for threads in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let results = trie.search_nearest_expressions(
                    black_box(&target),
                    2,
                    threads,
                    SearchAlgorithm::TrieTraversal,
                );
                black_box(results.len());
            })
        });
    }
    group.finish();
}

fn bench_rank_and_classify(c: &mut Criterion) {
    let compacter = ExpressionCompacter::new();
    let trie = build_trie(&compacter);
    let target = compacter.compact(QUERY);
    let results = trie.search_nearest_expressions(&target, 3, 1, SearchAlgorithm::TrieTraversal);

    c.bench_function("rank_and_classify", |b| {
        b.iter(|| {
            let mut ranked = results.clone();
            sort_and_rank_results(&mut ranked);
            black_box(is_potential_anomaly(&ranked, 5.0));
        })
    });
}

fn bench_edit_distance(c: &mut Criterion) {
    let compacter = ExpressionCompacter::new();
    let a = compacter.compact(QUERY);
    let b_expr = compacter.compact(
        "(parenthesized_expression (binary_expression (\"!=\") (field_expression) (null)))",
    );

    c.bench_function("edit_distance_compacted", |b| {
        b.iter(|| black_box(edit_distance(black_box(&a), black_box(&b_expr))))
    });
    c.bench_function("edit_distance_expanded", |b| {
        b.iter(|| black_box(edit_distance(black_box(QUERY), black_box(QUERY.replace('=', "!").as_str()))))
    });
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("trie_build_synthetic", |b| {
        b.iter(|| {
            let compacter = ExpressionCompacter::new();
            black_box(build_trie(&compacter).len());
        })
    });
}

criterion_group!(
    benches,
    bench_search_algorithms,
    bench_traversal_threads,
    bench_rank_and_classify,
    bench_edit_distance,
    bench_build,
);
criterion_main!(benches);
