//! Training-corpus grammar and the parser collaborator boundary.
//!
//! Corpus lines look like:
//!
//! ```text
//! if (x == 0)
//! AST_expression_ONE:(parenthesized_expression (binary_expression ("==") (identifier) (number_literal)))
//! AST_expression_TWO:(parenthesized_expression (binary_expression ("==") (identifier) (number_literal)))
//! AST_expression:(parenthesized_expression (identifier))
//! ```
//!
//! `AST_expression:` feeds every level, `AST_expression_<LEVEL>:` feeds only
//! that level, and any other line is ignored by training.

use std::ops::Range;
use std::path::Path;

use crate::config::Level;
use crate::error::FlagError;
use crate::read_file_lossy;

pub const EXPRESSION_MARKER: &str = "AST_expression";

/// Split a marker line into its level qualifier (`None` = every level) and payload.
pub fn parse_marker(line: &str) -> Option<(Option<Level>, &str)> {
    let rest = line.strip_prefix(EXPRESSION_MARKER)?;
    if let Some(payload) = rest.strip_prefix(':') {
        return Some((None, payload.trim()));
    }
    let (name, payload) = rest.strip_prefix('_')?.split_once(':')?;
    let level = match name {
        "MIN" => Level::Min,
        "ONE" => Level::One,
        "TWO" => Level::Two,
        "MAX" => Level::Max,
        _ => return None,
    };
    Some((Some(level), payload.trim()))
}

/// Payload of `line` if it is a training expression for `level`.
pub fn training_payload(line: &str, level: Level) -> Option<&str> {
    match parse_marker(line)? {
        (None, payload) => Some(payload),
        (Some(l), payload) if l == level => Some(payload),
        _ => None,
    }
}

// ─── Parser collaborator ─────────────────────────────────────────────

/// Expressions extracted from one file or one ad-hoc query.
#[derive(Debug)]
pub struct ParsedSource<N> {
    pub name: String,
    pub contents: String,
    pub nodes: Vec<N>,
}

/// Whatever turns source text into conditional-expression nodes and renders
/// them at an abstraction level. The scan orchestrator only talks to this.
pub trait ExpressionParser: Sync {
    type Node: Send + Sync;

    fn parse_file(&self, path: &Path) -> Result<ParsedSource<Self::Node>, FlagError>;

    fn parse_query(&self, query: &str) -> Result<ParsedSource<Self::Node>, FlagError>;

    /// Canonical abstracted string for `node` at `level`.
    fn render(&self, node: &Self::Node, level: Level) -> Result<String, FlagError>;

    /// Original source substring of `node`, used only for reporting.
    fn original_source(&self, node: &Self::Node, contents: &str) -> String;

    /// 1-based (row, column) of `node` in its source, when known.
    fn position(&self, _node: &Self::Node) -> Option<(usize, usize)> {
        None
    }
}

// ─── Built-in collaborator for pre-abstracted input ──────────────────

/// One expression from pre-abstracted input: an optional source line plus
/// its marker renderings.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedExpression {
    line: usize,
    column: usize,
    source: Range<usize>,
    renderings: Vec<(Option<Level>, String)>,
}

impl MarkedExpression {
    fn new(line: usize, column: usize, source: Range<usize>) -> Self {
        Self { line, column, source, renderings: Vec::new() }
    }

    fn has_rendering_for(&self, level: Option<Level>) -> bool {
        self.renderings.iter().any(|(l, _)| *l == level)
    }
}

/// Parser for input already written in the training grammar.
///
/// A non-marker, non-blank line opens a new expression whose original source
/// is that line. Marker lines attach renderings to the open expression; a
/// second marker for a level it already has opens a new one.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerParser;

impl MarkerParser {
    pub fn parse_text(
        &self,
        name: &str,
        contents: String,
    ) -> Result<ParsedSource<MarkedExpression>, FlagError> {
        let mut nodes = Vec::new();
        let mut current: Option<MarkedExpression> = None;
        let mut offset = 0;

        for (idx, raw) in contents.split_inclusive('\n').enumerate() {
            let line_start = offset;
            offset += raw.len();
            let line = raw.trim_end_matches(['\n', '\r']);

            if let Some((level, payload)) = parse_marker(line) {
                let needs_new = current
                    .as_ref()
                    .is_none_or(|node| node.has_rendering_for(level));
                if needs_new {
                    if let Some(done) = current.take().filter(|n| !n.renderings.is_empty()) {
                        nodes.push(done);
                    }
                    current = Some(MarkedExpression::new(idx + 1, 1, line_start..line_start));
                }
                if let Some(node) = current.as_mut() {
                    node.renderings.push((level, payload.to_string()));
                }
            } else if !line.trim().is_empty() {
                if let Some(done) = current.take().filter(|n| !n.renderings.is_empty()) {
                    nodes.push(done);
                }
                let indent = line.len() - line.trim_start().len();
                let start = line_start + indent;
                let end = line_start + line.trim_end().len();
                current = Some(MarkedExpression::new(idx + 1, indent + 1, start..end));
            }
        }
        if let Some(done) = current.filter(|n| !n.renderings.is_empty()) {
            nodes.push(done);
        }

        if nodes.is_empty() {
            return Err(FlagError::ParseError {
                source_name: name.to_string(),
                message: "no conditional expressions found".to_string(),
            });
        }
        Ok(ParsedSource { name: name.to_string(), contents, nodes })
    }
}

impl ExpressionParser for MarkerParser {
    type Node = MarkedExpression;

    fn parse_file(&self, path: &Path) -> Result<ParsedSource<MarkedExpression>, FlagError> {
        let (contents, _was_lossy) = read_file_lossy(path)?;
        self.parse_text(&path.display().to_string(), contents)
    }

    /// A query without any marker line is a single level-agnostic expression.
    fn parse_query(&self, query: &str) -> Result<ParsedSource<MarkedExpression>, FlagError> {
        if query.lines().any(|l| parse_marker(l).is_some()) {
            return self.parse_text("query", query.to_string());
        }
        let expression = query.trim();
        if expression.is_empty() {
            return Err(FlagError::ParseError {
                source_name: "query".to_string(),
                message: "empty expression".to_string(),
            });
        }
        let mut node = MarkedExpression::new(1, 1, 0..query.len());
        node.renderings.push((None, expression.to_string()));
        Ok(ParsedSource {
            name: "query".to_string(),
            contents: query.to_string(),
            nodes: vec![node],
        })
    }

    fn render(&self, node: &MarkedExpression, level: Level) -> Result<String, FlagError> {
        node.renderings
            .iter()
            .find(|(l, _)| *l == Some(level))
            .or_else(|| node.renderings.iter().find(|(l, _)| l.is_none()))
            .map(|(_, text)| text.clone())
            .ok_or_else(|| FlagError::MissingLevel { level: level.to_string() })
    }

    fn original_source(&self, node: &MarkedExpression, contents: &str) -> String {
        contents.get(node.source.clone()).unwrap_or("").to_string()
    }

    fn position(&self, node: &MarkedExpression) -> Option<(usize, usize)> {
        Some((node.line, node.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
if (x == 0)
AST_expression_ONE:(parenthesized_expression (binary_expression (\"==\") (identifier) (number_literal)))
AST_expression_TWO:(parenthesized_expression (binary_expression (\"==\") (identifier) (number_literal)))

  if (ptr)
AST_expression:(parenthesized_expression (identifier))
";

    #[test]
    fn test_parse_marker_variants() {
        assert_eq!(parse_marker("AST_expression:(a)"), Some((None, "(a)")));
        assert_eq!(parse_marker("AST_expression_TWO: (b) "), Some((Some(Level::Two), "(b)")));
        assert_eq!(parse_marker("AST_expression_FOO:(c)"), None);
        assert_eq!(parse_marker("if (x)"), None);
        assert_eq!(parse_marker("// AST_expression:(a)"), None);
    }

    #[test]
    fn test_training_payload_filters_by_level() {
        assert_eq!(training_payload("AST_expression_ONE:(a)", Level::One), Some("(a)"));
        assert_eq!(training_payload("AST_expression_ONE:(a)", Level::Two), None);
        assert_eq!(training_payload("AST_expression:(a)", Level::Two), Some("(a)"));
    }

    #[test]
    fn test_marker_parser_groups_renderings() {
        let parsed = MarkerParser.parse_text("sample", SAMPLE.to_string()).unwrap();
        assert_eq!(parsed.nodes.len(), 2);

        let first = &parsed.nodes[0];
        assert_eq!(MarkerParser.position(first), Some((1, 1)));
        assert_eq!(MarkerParser.original_source(first, &parsed.contents), "if (x == 0)");
        assert!(MarkerParser.render(first, Level::One).unwrap().contains("binary_expression"));
        assert!(MarkerParser.render(first, Level::Max).is_err());

        let second = &parsed.nodes[1];
        assert_eq!(MarkerParser.position(second), Some((5, 3)));
        assert_eq!(MarkerParser.original_source(second, &parsed.contents), "if (ptr)");
        assert_eq!(
            MarkerParser.render(second, Level::Two).unwrap(),
            "(parenthesized_expression (identifier))"
        );
    }

    #[test]
    fn test_repeated_level_opens_new_expression() {
        let text = "AST_expression_ONE:(a)\nAST_expression_ONE:(b)\n".to_string();
        let parsed = MarkerParser.parse_text("t", text).unwrap();
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(MarkerParser.render(&parsed.nodes[1], Level::One).unwrap(), "(b)");
        assert_eq!(MarkerParser.original_source(&parsed.nodes[1], &parsed.contents), "");
    }

    #[test]
    fn test_source_line_without_markers_is_dropped() {
        let text = "if (a)\nif (b)\nAST_expression:(x)\n".to_string();
        let parsed = MarkerParser.parse_text("t", text).unwrap();
        assert_eq!(parsed.nodes.len(), 1);
        assert_eq!(MarkerParser.original_source(&parsed.nodes[0], &parsed.contents), "if (b)");
    }

    #[test]
    fn test_no_expressions_is_parse_error() {
        let err = MarkerParser.parse_text("empty.c", "int main() {}\n".to_string()).unwrap_err();
        assert!(matches!(err, FlagError::ParseError { .. }));
        assert!(err.to_string().contains("empty.c"));
    }

    #[test]
    fn test_plain_query_is_level_agnostic() {
        let parsed = MarkerParser.parse_query("  (parenthesized_expression (identifier)) ").unwrap();
        assert_eq!(parsed.nodes.len(), 1);
        for level in Level::ALL {
            assert_eq!(
                MarkerParser.render(&parsed.nodes[0], level).unwrap(),
                "(parenthesized_expression (identifier))"
            );
        }
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(MarkerParser.parse_query("   ").is_err());
    }

    #[test]
    fn test_parse_missing_file_is_io_error() {
        let err = MarkerParser.parse_file(Path::new("/nonexistent/scan.txt")).unwrap_err();
        assert!(matches!(err, FlagError::Io(_)));
    }
}
