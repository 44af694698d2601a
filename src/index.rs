//! The vector index: chunk storage, cosine search, and directory persistence.
//!
//! An index is built once from the current document set, persisted to a
//! directory, and reloaded from that directory on later runs instead of being
//! rebuilt. The persisted layout is a versioned `manifest.json` next to a
//! `chunks.json` holding every chunk with its embedding; any read or
//! consistency failure is reported as [`QaError::CorruptIndex`] and the
//! caller is expected to delete the directory and rebuild.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunking::Chunker;
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{QaError, Result};
use crate::store::DocumentStore;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const FORMAT_VERSION: u32 = 1;

/// Summary of the persisted artifacts, written alongside the chunks.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    dimensions: usize,
    chunk_count: usize,
    fingerprint: u64,
}

/// An in-memory collection of embedded chunks supporting similarity search.
///
/// Chunks are held in creation order, which gives retrieval its stable
/// tie-break: of two chunks with equal scores, the one indexed first is
/// returned first.
#[derive(Debug)]
pub struct VectorIndex {
    dimensions: usize,
    fingerprint: u64,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Assemble an index from already-embedded chunks.
    ///
    /// Chunk order defines the retrieval tie-break; callers normally go
    /// through [`build_or_load`](VectorIndex::build_or_load) instead.
    pub fn new(dimensions: usize, fingerprint: u64, chunks: Vec<Chunk>) -> Self {
        Self { dimensions, fingerprint, chunks }
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality of the stored embeddings.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Fingerprint of the document set this index was built from.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// The stored chunks in creation order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Rank all chunks by cosine similarity to `embedding` and keep the
    /// `top_k` best. Equal scores preserve chunk creation order.
    pub fn search(&self, embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let mut scored: Vec<SearchResult> = self
            .chunks
            .iter()
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(&chunk.embedding, embedding),
            })
            .collect();

        // sort_by is stable, so ties keep first-indexed-first-returned order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    /// Load a previously persisted index if one exists, otherwise read all
    /// documents from `store`, chunk and embed them, assemble the index, and
    /// persist it to `persist_dir` before returning.
    ///
    /// Idempotent: a second call with the same `persist_dir` loads the prior
    /// result rather than rebuilding.
    ///
    /// # Errors
    ///
    /// - [`QaError::NoDocuments`] if a build is needed and the store is
    ///   empty; nothing is written to `persist_dir` in that case.
    /// - [`QaError::CorruptIndex`] if persisted state exists but cannot be
    ///   read back consistently.
    /// - [`QaError::Embedding`] if the embedding collaborator fails.
    pub async fn build_or_load(
        store: &DocumentStore,
        persist_dir: &Path,
        chunker: &dyn Chunker,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        if Self::is_persisted(persist_dir) {
            info!(dir = %persist_dir.display(), "loading persisted index");
            return Self::load(persist_dir);
        }

        // Documents are checked before any artifact is written so a failed
        // build leaves the persist directory untouched.
        let documents = store.load_documents()?;
        let fingerprint = store.fingerprint()?;

        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &documents {
            chunks.extend(chunker.chunk(document));
        }
        if chunks.is_empty() {
            return Err(QaError::NoDocuments { dir: store.dir().to_path_buf() });
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let index = Self { dimensions: embedder.dimensions(), fingerprint, chunks };
        index.persist(persist_dir)?;
        info!(
            chunks = index.len(),
            documents = documents.len(),
            dir = %persist_dir.display(),
            "built and persisted index"
        );
        Ok(index)
    }

    /// Whether `dir` contains persisted index artifacts.
    pub fn is_persisted(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }

    /// Write the index artifacts to `dir`, creating it if needed.
    ///
    /// Persistence is synchronous and blocking; an interrupted write leaves
    /// state that the next [`load`](VectorIndex::load) reports as corrupt.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let chunks = serde_json::to_vec(&self.chunks).map_err(|e| QaError::CorruptIndex {
            dir: dir.to_path_buf(),
            message: format!("failed to serialize chunks: {e}"),
        })?;
        std::fs::write(dir.join(CHUNKS_FILE), chunks)?;

        let manifest = Manifest {
            version: FORMAT_VERSION,
            dimensions: self.dimensions,
            chunk_count: self.chunks.len(),
            fingerprint: self.fingerprint,
        };
        let manifest = serde_json::to_vec_pretty(&manifest).map_err(|e| QaError::CorruptIndex {
            dir: dir.to_path_buf(),
            message: format!("failed to serialize manifest: {e}"),
        })?;
        std::fs::write(dir.join(MANIFEST_FILE), manifest)?;

        debug!(dir = %dir.display(), chunks = self.chunks.len(), "persisted index artifacts");
        Ok(())
    }

    /// Load and validate persisted index artifacts from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::CorruptIndex`] if either file is missing, fails to
    /// parse, or disagrees with the manifest.
    pub fn load(dir: &Path) -> Result<Self> {
        let corrupt = |message: String| QaError::CorruptIndex { dir: dir.to_path_buf(), message };

        let manifest = std::fs::read(dir.join(MANIFEST_FILE))
            .map_err(|e| corrupt(format!("cannot read {MANIFEST_FILE}: {e}")))?;
        let manifest: Manifest = serde_json::from_slice(&manifest)
            .map_err(|e| corrupt(format!("cannot parse {MANIFEST_FILE}: {e}")))?;
        if manifest.version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                manifest.version
            )));
        }

        let chunks = std::fs::read(dir.join(CHUNKS_FILE))
            .map_err(|e| corrupt(format!("cannot read {CHUNKS_FILE}: {e}")))?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunks)
            .map_err(|e| corrupt(format!("cannot parse {CHUNKS_FILE}: {e}")))?;

        if chunks.len() != manifest.chunk_count {
            return Err(corrupt(format!(
                "manifest records {} chunks but {} were read",
                manifest.chunk_count,
                chunks.len()
            )));
        }
        if chunks.iter().any(|c| c.embedding.len() != manifest.dimensions) {
            return Err(corrupt("chunk embedding dimensions disagree with manifest".to_string()));
        }

        debug!(dir = %dir.display(), chunks = chunks.len(), "loaded index artifacts");
        Ok(Self { dimensions: manifest.dimensions, fingerprint: manifest.fingerprint, chunks })
    }
}

/// Cosine similarity between two vectors; 0.0 if either has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
