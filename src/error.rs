//! Error types for protox

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protox operations
pub type Result<T> = std::result::Result<T, ProtoxError>;

/// Error types that can occur in protox
#[derive(Debug, Error)]
pub enum ProtoxError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid FASTA format
    #[error("Invalid FASTA format at line {line}: {msg}")]
    InvalidFastaFormat {
        /// Line number where error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Sequence is empty or whitespace-only
    ///
    /// Raised before any featurization happens; front-ends show it as a
    /// warning rather than a failure.
    #[error("Please enter a protein sequence")]
    EmptyInput,

    /// Featurization, vectorization or classification failed
    #[error("Prediction failed: {0}")]
    Inference(String),

    /// Vectorizer or classifier artifact missing or incompatible
    #[error("Failed to load {}: {msg}", path.display())]
    Load {
        /// Artifact path
        path: PathBuf,
        /// Error message
        msg: String,
    },

    /// A parameter is outside its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Training corpus cannot produce a model
    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),

    /// Configuration file could not be parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProtoxError {
    /// Build a [`ProtoxError::Load`] for `path`
    pub fn load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        ProtoxError::Load {
            path: path.into(),
            msg: msg.into(),
        }
    }

    /// Returns true for errors a front-end should present as a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, ProtoxError::EmptyInput)
    }
}
