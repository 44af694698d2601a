//! Configuration for the question-answering pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{QaError, Result};

/// Configuration parameters for the QA pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to keep from vector search.
    pub top_k: usize,
    /// Minimum similarity score for retrieved chunks; lower-scoring chunks
    /// are discarded after the top-k cut.
    pub similarity_cutoff: f32,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 100, top_k: 5, similarity_cutoff: 0.0 }
    }
}

impl QaConfig {
    /// Create a new builder for constructing a [`QaConfig`].
    pub fn builder() -> QaConfigBuilder {
        QaConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`QaConfig`].
#[derive(Debug, Clone, Default)]
pub struct QaConfigBuilder {
    config: QaConfig,
}

impl QaConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to keep from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score for retrieved chunks.
    pub fn similarity_cutoff(mut self, cutoff: f32) -> Self {
        self.config.similarity_cutoff = cutoff;
        self
    }

    /// Build the [`QaConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Configuration`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `similarity_cutoff` is not a finite number
    pub fn build(self) -> Result<QaConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(QaError::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(QaError::Configuration("top_k must be greater than zero".to_string()));
        }
        if !self.config.similarity_cutoff.is_finite() {
            return Err(QaError::Configuration(
                "similarity_cutoff must be a finite number".to_string(),
            ));
        }
        Ok(self.config)
    }
}
