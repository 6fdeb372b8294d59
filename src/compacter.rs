//! Expression compacter: bijective token ⇄ numeric ID mapping.
//!
//! Abstracted expressions such as
//! `(parenthesized_expression (binary_expression ("==") (identifier) (number_literal)))`
//! are shrunk to `(0 (1 ("==") (2) (3)))` before they are stored or searched,
//! which keeps the trie shallow and makes edit distances count whole tokens.
//!
//! A token is a maximal run of ASCII alphanumerics and underscores. Digits are
//! part of tokens, so after compaction every digit run is an ID and `expand`
//! is an exact inverse of `compact` for any input.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use regex::Regex;

use crate::error::FlagError;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("token regex is valid"));

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("id regex is valid"));

#[derive(Default)]
struct TokenTable {
    ids: HashMap<String, usize>,
    /// id → token. IDs are positions in this vec, so they are never reused.
    tokens: Vec<String>,
}

/// Run-wide token dictionary shared by training and every scanner thread.
///
/// Reads (`expand`, lookup compaction) take the shared lock; registering a
/// novel token during training takes the exclusive lock.
#[derive(Default)]
pub struct ExpressionCompacter {
    table: RwLock<TokenTable>,
}

impl ExpressionCompacter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a compacter from a persisted token list (index = ID).
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        let ids = tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id))
            .collect();
        Self {
            table: RwLock::new(TokenTable { ids, tokens }),
        }
    }

    /// Snapshot of all registered tokens in ID order.
    pub fn tokens(&self) -> Vec<String> {
        self.table.read().unwrap_or_else(|e| e.into_inner()).tokens.clone()
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(|e| e.into_inner()).tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace every token with its ID, registering novel tokens on the way.
    pub fn compact(&self, source: &str) -> String {
        let mut result = String::with_capacity(source.len());
        let mut last = 0;
        for m in TOKEN_RE.find_iter(source) {
            result.push_str(&source[last..m.start()]);
            result.push_str(&self.id_for(m.as_str()).to_string());
            last = m.end();
        }
        result.push_str(&source[last..]);
        result
    }

    /// Compact for lookup against tries built by this compacter, under the
    /// shared lock only. Every unseen token becomes the first unassigned ID,
    /// which no stored expression contains; the result depends only on the
    /// registered tokens, never on the order of earlier lookups.
    pub fn compact_for_lookup(&self, source: &str) -> String {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        let unknown = table.tokens.len().to_string();
        let mut result = String::with_capacity(source.len());
        let mut last = 0;
        for m in TOKEN_RE.find_iter(source) {
            result.push_str(&source[last..m.start()]);
            match table.ids.get(m.as_str()) {
                Some(id) => result.push_str(&id.to_string()),
                None => result.push_str(&unknown),
            }
            last = m.end();
        }
        result.push_str(&source[last..]);
        result
    }

    /// Compact without registering anything. Returns `None` if the source
    /// contains a token that was never seen, i.e. it cannot be in any trie.
    pub fn try_compact(&self, source: &str) -> Option<String> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        let mut result = String::with_capacity(source.len());
        let mut last = 0;
        for m in TOKEN_RE.find_iter(source) {
            result.push_str(&source[last..m.start()]);
            result.push_str(&table.ids.get(m.as_str())?.to_string());
            last = m.end();
        }
        result.push_str(&source[last..]);
        Some(result)
    }

    /// Inverse of [`compact`](Self::compact).
    ///
    /// An unknown ID means the compacted string did not come from this
    /// compacter, which is reported as an invariant violation.
    pub fn expand(&self, compacted: &str) -> Result<String, FlagError> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        let mut result = String::with_capacity(compacted.len() * 4);
        let mut last = 0;
        for m in ID_RE.find_iter(compacted) {
            result.push_str(&compacted[last..m.start()]);
            let id: usize = m.as_str().parse().map_err(|_| FlagError::MalformedCompacted {
                input: compacted.to_string(),
            })?;
            let token = table.tokens.get(id).ok_or_else(|| FlagError::MissingTokenId {
                id: m.as_str().to_string(),
            })?;
            result.push_str(token);
            last = m.end();
        }
        result.push_str(&compacted[last..]);
        Ok(result)
    }

    fn id_for(&self, token: &str) -> usize {
        if let Some(&id) = self.table.read().unwrap_or_else(|e| e.into_inner()).ids.get(token) {
            return id;
        }
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        // Another writer may have registered it between the two locks.
        if let Some(&id) = table.ids.get(token) {
            return id;
        }
        let id = table.tokens.len();
        table.tokens.push(token.to_string());
        table.ids.insert(token.to_string(), id);
        id
    }
}
