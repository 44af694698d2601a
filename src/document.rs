//! Data types for documents, chunks, retrieval results, and answers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single page of a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    /// Human-readable page label ("1", "2", ...), used in citations.
    pub page_label: String,
    /// Extracted text content of the page.
    pub text: String,
}

/// A source document loaded from the document store.
///
/// Created when the store reads an uploaded file, consumed once during
/// indexing, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The file name of the uploaded document (no directory components).
    pub file_name: String,
    /// Where the document lives on disk.
    pub path: PathBuf,
    /// Page structure with extracted text, in page order.
    pub pages: Vec<DocumentPage>,
}

/// A segment of a document's text with its vector embedding and the
/// provenance needed for citations.
///
/// Chunks are created during index build, are immutable, and are owned
/// exclusively by the [`VectorIndex`](crate::VectorIndex).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{file_stem}_{page_label}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The embedding vector for this chunk's text.
    pub embedding: Vec<f32>,
    /// File name of the source document.
    pub file_name: String,
    /// Page label of the source page.
    pub page_label: String,
    /// Position of this chunk within its page.
    pub chunk_index: usize,
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// A source reference attached to a generated answer.
///
/// Citations are assembled in retrieval order, one per retrieved chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// File name of the cited document.
    pub file_name: String,
    /// Page label within the document.
    pub page_label: String,
    /// Similarity score of the cited chunk.
    pub score: f32,
    /// A short excerpt of the cited passage.
    pub excerpt: String,
}

/// A generated answer with its supporting citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// Source citations, ordered to match the retrieval results.
    pub citations: Vec<Citation>,
}

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// A message written by the user.
    User,
    /// A message produced by the assistant.
    Assistant,
}

impl ChatRole {
    /// The wire-format role string expected by chat-completion APIs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation.
///
/// Conversation state is an append-only sequence of these, owned by the
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored this turn.
    pub role: ChatRole,
    /// The message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}
