//! Unified error type for training, search and scanning.

use thiserror::Error;

/// All errors that can occur while training or scanning.
#[derive(Error, Debug)]
pub enum FlagError {
    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error (bincode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// A compacted expression referenced an ID that was never registered.
    #[error("Compacted expression references unknown token id {id}")]
    MissingTokenId { id: String },

    /// A compacted expression could not be decoded at all.
    #[error("Malformed compacted expression '{input}'")]
    MalformedCompacted { input: String },

    /// Training corpus does not exist or cannot be opened
    #[error("Training dataset not found or unreadable: {path}")]
    TrainingFileNotFound { path: String },

    /// The parser collaborator rejected an input
    #[error("Parse error in {source_name}: {message}")]
    ParseError {
        source_name: String,
        message: String,
    },

    /// An expression node has no rendering for the requested abstraction level
    #[error("Expression has no rendering at level {level}")]
    MissingLevel { level: String },

    /// Failed to load a persisted model from disk
    #[error("Failed to load model from {path}: {message}")]
    ModelLoad {
        path: String,
        message: String,
    },

    /// Mutually exclusive flags or other argument validation error
    #[error("{0}")]
    InvalidArgs(String),

    /// The scan was interrupted before the work list was exhausted
    #[error("Scan cancelled before completion")]
    Cancelled,
}

impl FlagError {
    /// Errors that mean shared state (the compacter mapping) is corrupt.
    /// Continuing after one of these would produce silently wrong results.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            FlagError::MissingTokenId { .. } | FlagError::MalformedCompacted { .. }
        )
    }
}
