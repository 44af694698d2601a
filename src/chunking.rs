//! Document chunking.
//!
//! The [`Chunker`] trait splits a loaded [`Document`] into embedding-ready
//! [`Chunk`]s. The provided [`FixedSizeChunker`] works page by page so every
//! chunk keeps the page label it came from.

use crate::config::QaConfig;
use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and provenance but no
/// embeddings; embeddings are attached later during index build. Chunk order
/// in the returned `Vec` is the chunk creation order the index preserves.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks. Pages with no text yield no chunks.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits each page into fixed-size character windows with overlap.
///
/// Windows are measured in characters and sliced on character boundaries, so
/// multi-byte text never panics. Chunk IDs are
/// `{file_stem}_{page_label}_{chunk_index}`.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a chunker with the given window size and overlap, both in
    /// characters. `chunk_overlap` must be less than `chunk_size`; the
    /// config builder enforces this.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Create a chunker from a validated [`QaConfig`].
    pub fn from_config(config: &QaConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let stem = file_stem(&document.file_name);
        let mut chunks = Vec::new();

        for page in &document.pages {
            for (chunk_index, text) in
                windows(&page.text, self.chunk_size, self.chunk_overlap).into_iter().enumerate()
            {
                chunks.push(Chunk {
                    id: format!("{stem}_{}_{chunk_index}", page.page_label),
                    text,
                    embedding: Vec::new(),
                    file_name: document.file_name.clone(),
                    page_label: page.page_label.clone(),
                    chunk_index,
                });
            }
        }

        chunks
    }
}

fn file_stem(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem)
}

/// Slice `text` into overlapping character windows, skipping windows that
/// are entirely whitespace.
fn windows(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character boundary, plus the end of the text.
    let bounds: Vec<usize> =
        trimmed.char_indices().map(|(i, _)| i).chain(std::iter::once(trimmed.len())).collect();
    let char_count = bounds.len() - 1;

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0;

    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        let window = &trimmed[bounds[start]..bounds[end]];
        if !window.trim().is_empty() {
            out.push(window.to_string());
        }
        if end == char_count {
            break;
        }
        start += step;
    }

    out
}
