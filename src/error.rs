//! Error types for the `docqa` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while storing, indexing, or querying documents.
///
/// All variants are surfaced to the interaction boundary and rendered as a
/// user-visible message; none are retried automatically and none yield a
/// partial answer.
#[derive(Debug, Error)]
pub enum QaError {
    /// The document directory contains no readable documents.
    #[error("no documents found in '{}'", dir.display())]
    NoDocuments {
        /// The directory that was scanned.
        dir: PathBuf,
    },

    /// The persisted index artifacts are unreadable or inconsistent.
    ///
    /// The caller should delete the persist directory and rebuild.
    #[error("persisted index at '{}' is corrupt: {message}", dir.display())]
    CorruptIndex {
        /// The persist directory that failed to load.
        dir: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The language-model call failed or returned empty output.
    #[error("generation failed ({provider}): {message}")]
    Generation {
        /// The language-model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A blank query was submitted.
    #[error("query must not be empty")]
    EmptyQuery,

    /// A source document could not be read or parsed.
    #[error("failed to read document '{}': {message}", path.display())]
    Document {
        /// The document that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error, including a missing credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An I/O error from the document store or index persistence.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for document-QA operations.
pub type Result<T> = std::result::Result<T, QaError>;
