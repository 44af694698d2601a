//! Retrieval-augmented question answering over uploaded documents.
//!
//! This crate implements the pipeline behind a document-QA app: store
//! uploaded files, build (or reload) a persistent vector index over their
//! text, retrieve the most similar passages for a natural-language query,
//! and synthesize an answer with citations via a hosted chat model.
//!
//! This crate provides:
//! - [`DocumentStore`] — uploaded documents on disk, read back page by page
//! - [`VectorIndex`] — chunk embeddings with cosine search and directory
//!   persistence (`build_or_load` caches across runs)
//! - [`QaPipeline`] — orchestrates retrieve → synthesize, one-shot
//!   ([`answer`](QaPipeline::answer)) or conversational with
//!   condense-question history resolution ([`chat`](QaPipeline::chat))
//! - [`Session`] — per-user state: cached index (invalidated when the
//!   document set changes) and conversation history
//!
//! Embedding and generation backends are pluggable via the
//! [`EmbeddingProvider`] and [`LanguageModel`] traits; OpenAI-backed
//! implementations are available behind the `openai` feature.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod session;
pub mod store;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{QaConfig, QaConfigBuilder};
pub use document::{
    Answer, ChatMessage, ChatRole, Chunk, Citation, Document, DocumentPage, SearchResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{QaError, Result};
pub use generation::{LanguageModel, SYSTEM_INSTRUCTION};
pub use index::VectorIndex;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddings};
pub use pipeline::{QaPipeline, QaPipelineBuilder};
pub use session::Session;
pub use store::DocumentStore;
