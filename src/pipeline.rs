//! Pipeline orchestrator.
//!
//! The [`QaPipeline`] coordinates the full workflow by composing an
//! [`EmbeddingProvider`], a [`LanguageModel`], and a [`Chunker`]:
//! build-or-load the index, retrieve passages for a query, and synthesize
//! an answer with citations, either one-shot or conversationally.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa::{DocumentStore, QaConfig, QaPipeline, FixedSizeChunker};
//!
//! let pipeline = QaPipeline::builder()
//!     .config(QaConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .language_model(Arc::new(model))
//!     .chunker(Arc::new(FixedSizeChunker::new(512, 100)))
//!     .build()?;
//!
//! let store = DocumentStore::new("./uploads");
//! let index = pipeline.build_or_load(&store, Path::new("./storage")).await?;
//! let answer = pipeline.answer(&index, "What is the return of Fund X?").await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::chunking::Chunker;
use crate::config::QaConfig;
use crate::document::{Answer, ChatMessage, Citation, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{QaError, Result};
use crate::generation::{LanguageModel, SYSTEM_INSTRUCTION, condense_request, context_prompt};
use crate::index::VectorIndex;
use crate::store::DocumentStore;

/// Maximum characters of chunk text carried into a citation excerpt.
const EXCERPT_CHARS: usize = 240;

/// The question-answering pipeline orchestrator.
///
/// Construct one via [`QaPipeline::builder()`]. The pipeline itself is
/// stateless; the index and conversation history live in the caller's
/// [`Session`](crate::Session).
pub struct QaPipeline {
    config: QaConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    language_model: Arc<dyn LanguageModel>,
    chunker: Arc<dyn Chunker>,
}

impl QaPipeline {
    /// Create a new [`QaPipelineBuilder`].
    pub fn builder() -> QaPipelineBuilder {
        QaPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Build a fresh index from the store's documents, or load the one
    /// persisted at `persist_dir`. See [`VectorIndex::build_or_load`].
    pub async fn build_or_load(
        &self,
        store: &DocumentStore,
        persist_dir: &Path,
    ) -> Result<VectorIndex> {
        VectorIndex::build_or_load(
            store,
            persist_dir,
            self.chunker.as_ref(),
            self.embedding_provider.as_ref(),
        )
        .await
    }

    /// Retrieve the passages most similar to `query`: embed, rank by cosine
    /// similarity, keep the configured top-k, then drop results below the
    /// similarity cutoff.
    ///
    /// An empty result is `Ok`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::EmptyQuery`] for a blank query (checked before any
    /// embedding call) and [`QaError::Embedding`] if the provider fails.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QaError::EmptyQuery);
        }

        let query_embedding = self.embedding_provider.embed(query).await?;
        let results = index.search(&query_embedding, self.config.top_k);

        let cutoff = self.config.similarity_cutoff;
        let filtered: Vec<SearchResult> =
            results.into_iter().filter(|r| r.score >= cutoff).collect();

        debug!(results = filtered.len(), top_k = self.config.top_k, cutoff, "retrieval completed");
        Ok(filtered)
    }

    /// Answer a one-shot query: retrieve passages, send a single prompt to
    /// the language model, and return the generated text with one citation
    /// per retrieved chunk, in retrieval order.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::EmptyQuery`] for a blank query and
    /// [`QaError::Generation`] if the model call fails or returns empty
    /// output. Failures are reported, not retried.
    pub async fn answer(&self, index: &VectorIndex, query: &str) -> Result<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QaError::EmptyQuery);
        }

        let results = self.retrieve(index, query).await?;
        let prompt = context_prompt(query, &results);
        let text = self
            .language_model
            .generate(SYSTEM_INSTRUCTION, &[ChatMessage::user(prompt)])
            .await?;
        let text = non_empty(text)?;

        info!(citations = results.len(), "answered query");
        Ok(Answer { citations: citations(&results), text })
    }

    /// Run one conversational turn.
    ///
    /// When `history` is non-empty the new message is first condensed
    /// together with the prior turns into a standalone question, so
    /// follow-ups resolve pronouns against the conversation; retrieval uses
    /// the condensed question. On success the user message and the generated
    /// answer are appended to `history`.
    ///
    /// # Errors
    ///
    /// Same as [`answer`](QaPipeline::answer). `history` is left untouched
    /// when the turn fails.
    pub async fn chat(
        &self,
        index: &VectorIndex,
        history: &mut Vec<ChatMessage>,
        message: &str,
    ) -> Result<Answer> {
        let message = message.trim();
        if message.is_empty() {
            return Err(QaError::EmptyQuery);
        }

        let query = if history.is_empty() {
            message.to_string()
        } else {
            self.condense(history, message).await?
        };

        let results = self.retrieve(index, &query).await?;

        // The model sees the real conversation plus the retrieved context;
        // the condensed question is only used for retrieval.
        let mut messages = history.clone();
        messages.push(ChatMessage::user(context_prompt(message, &results)));
        let text = self.language_model.generate(SYSTEM_INSTRUCTION, &messages).await?;
        let text = non_empty(text)?;

        history.push(ChatMessage::user(message));
        history.push(ChatMessage::assistant(text.clone()));

        info!(turns = history.len(), citations = results.len(), "chat turn completed");
        Ok(Answer { citations: citations(&results), text })
    }

    /// Condense a follow-up message into a standalone question using the
    /// conversation history.
    async fn condense(&self, history: &[ChatMessage], message: &str) -> Result<String> {
        let (instruction, request) = condense_request(history, message);
        let condensed = self.language_model.generate(&instruction, &[request]).await?;
        let condensed = non_empty(condensed)?;
        debug!(condensed = %condensed, "condensed follow-up question");
        Ok(condensed)
    }
}

/// Reject empty or whitespace-only model output.
fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(QaError::Generation {
            provider: "language model".to_string(),
            message: "model returned empty output".to_string(),
        });
    }
    Ok(text)
}

/// One citation per retrieved chunk, in retrieval order.
fn citations(results: &[SearchResult]) -> Vec<Citation> {
    results
        .iter()
        .map(|result| Citation {
            file_name: result.chunk.file_name.clone(),
            page_label: result.chunk.page_label.clone(),
            score: result.score,
            excerpt: excerpt(&result.chunk.text),
        })
        .collect()
}

/// Char-boundary-safe excerpt of the cited passage.
fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((byte_offset, _)) => format!("{}...", &text[..byte_offset]),
        None => text.to_string(),
    }
}

/// Builder for constructing a [`QaPipeline`].
///
/// All fields are required except `config`, which defaults to
/// [`QaConfig::default()`].
#[derive(Default)]
pub struct QaPipelineBuilder {
    config: Option<QaConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl QaPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: QaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the language model used for answer synthesis and condensation.
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`QaPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Configuration`] if a required field is missing.
    pub fn build(self) -> Result<QaPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| QaError::Configuration("embedding_provider is required".to_string()))?;
        let language_model = self
            .language_model
            .ok_or_else(|| QaError::Configuration("language_model is required".to_string()))?;
        let chunker = self
            .chunker
            .ok_or_else(|| QaError::Configuration("chunker is required".to_string()))?;

        Ok(QaPipeline { config, embedding_provider, language_model, chunker })
    }
}
