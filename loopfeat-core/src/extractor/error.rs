//! Error Handling
//!
//! This module provides the error types for the loop feature extractor using
//! `thiserror`. All errors carry enough context (paths, underlying I/O errors)
//! to diagnose a failed run from the log alone.
//!
//! # Error Categories
//! - **Dataset errors**: opening or appending to the feature dataset
//! - **Counter errors**: persisting the run counter side store
//! - **Unit errors**: loading or validating a compilation unit

use std::path::PathBuf;
use thiserror::Error;

/// Extractor error types.
///
/// Uses `thiserror` for error handling with detailed error messages.
/// A missing run counter file is deliberately *not* an error: the counter
/// loader treats absence as the first-run state and starts from zero.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Dataset file could not be opened.
    ///
    /// Fatal for the run: without the dataset no record can be durably
    /// recorded, and the engine has no partial-output mode.
    #[error("could not open dataset file {path}: {source}\nSuggestion: {suggestion}")]
    DatasetOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        suggestion: String,
    },

    /// A record could not be appended to the dataset file.
    #[error("could not append record to dataset file {path}: {source}")]
    DatasetWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run counter could not be written back to its side store.
    ///
    /// Reported but non-fatal: dataset rows already written stay valid.
    #[error("could not persist run counter to {path}: {source}")]
    CounterPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A compilation unit file could not be read or deserialized.
    #[error("could not load compilation unit from {path}: {message}")]
    UnitLoad { path: PathBuf, message: String },

    /// A compilation unit violates the structural invariants the engine
    /// relies on (block ids, edge targets, use edges).
    #[error("malformed compilation unit: {message}")]
    MalformedUnit { message: String },
}

impl ExtractorError {
    /// Create a dataset open error with a path-specific suggestion.
    pub fn dataset_open(path: PathBuf, source: std::io::Error) -> Self {
        let suggestion = if path.parent().map(|p| !p.as_os_str().is_empty() && !p.exists()).unwrap_or(false) {
            "The parent directory does not exist. Create it before running."
        } else {
            "Check file permissions and available disk space."
        };
        Self::DatasetOpen {
            path,
            source,
            suggestion: suggestion.to_string(),
        }
    }

    /// Create a malformed-unit error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedUnit { message: message.into() }
    }
}
