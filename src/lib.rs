//! # condflag: Conditional-Expression Anomaly Detector
//!
//! Learns which abstracted conditional expressions are common in a training
//! corpus and flags expressions under scan that are rare variants of common
//! patterns, suggesting the likely intended expression.
//!
//! ## Library usage
//!
//! The `condflag` binary drives everything from the command line; the core
//! types are exposed as a library for benchmarking and integration testing.
//!
//! ```no_run
//! use condflag::{CollectingSink, MarkerParser, ScanConfig, ScanContext, Scanner};
//!
//! let context = ScanContext::train("train.txt".as_ref(), ScanConfig::default())?;
//! let sink = CollectingSink::new();
//! Scanner::new(&context, &MarkerParser)
//!     .scan_queries(&["(parenthesized_expression (identifier))".to_string()], &sink)?;
//! for record in sink.into_records() {
//!     println!("{} {} anomalous={}", record.level, record.expression, record.anomalous);
//! }
//! # Ok::<(), condflag::FlagError>(())
//! ```

pub mod cache;
pub mod compacter;
pub mod config;
pub mod context;
pub mod corpus;
pub mod error;
pub mod model;
pub mod ranking;
pub mod scan;
pub mod search;
pub mod trie;

pub use cache::{CacheStats, NearestExpressionCache};
pub use compacter::ExpressionCompacter;
pub use config::{Level, LogLevel, ScanConfig};
pub use context::ScanContext;
pub use corpus::{ExpressionParser, MarkerParser, ParsedSource};
pub use error::FlagError;
pub use model::{load_model, save_model, Model};
pub use ranking::{is_potential_anomaly, sort_and_rank_results};
pub use scan::{CollectingSink, ReportSink, ScanRecord, ScanSummary, Scanner, Suggestion};
pub use search::{edit_distance, Cost, NearestExpression, SearchAlgorithm};
pub use trie::{Trie, TrieNode};

/// Read a file as a String, using lossy UTF-8 conversion for non-UTF8 files.
/// Returns `(content, was_lossy)` where `was_lossy` is true if replacement
/// characters were inserted.
pub fn read_file_lossy(path: &std::path::Path) -> std::io::Result<(String, bool)> {
    let raw = std::fs::read(path)?;
    match String::from_utf8(raw) {
        Ok(s) => Ok((s, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}

/// Normalize an expression for reporting: trim surrounding spaces and drop
/// newlines, tabs, vertical tabs, carriage returns and form feeds.
///
/// # Examples
///
/// ```
/// use condflag::clean_expression;
///
/// assert_eq!(clean_expression("  (a\n (b))\t"), "(a (b))");
/// ```
#[must_use]
pub fn clean_expression(expression: &str) -> String {
    let stripped: String = expression
        .chars()
        .filter(|c| !matches!(c, '\n' | '\t' | '\u{0B}' | '\r' | '\u{0C}'))
        .collect();
    stripped.trim_matches(' ').to_string()
}

#[cfg(test)]
mod lib_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_clean_expression_strips_control_chars() {
        assert_eq!(clean_expression("(a\r\n(b))"), "(a(b))");
        assert_eq!(clean_expression("\u{0B}(x)\u{0C}"), "(x)");
    }

    #[test]
    fn test_clean_expression_keeps_inner_spaces() {
        assert_eq!(clean_expression("  (a (b))  "), "(a (b))");
    }

    #[test]
    fn test_clean_expression_empty() {
        assert_eq!(clean_expression(""), "");
        assert_eq!(clean_expression(" \t "), "");
    }

    #[test]
    fn test_read_file_lossy_valid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("AST_expression:(identifier)\n".as_bytes()).unwrap();
        let (content, lossy) = read_file_lossy(file.path()).unwrap();
        assert_eq!(content, "AST_expression:(identifier)\n");
        assert!(!lossy);
    }

    #[test]
    fn test_read_file_lossy_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"if (x \x93y\x94)\n").unwrap();
        let (content, lossy) = read_file_lossy(file.path()).unwrap();
        assert!(lossy);
        assert!(content.contains('\u{FFFD}'));
    }
}
