//! Session state for one interactive user.
//!
//! A [`Session`] replaces the implicit UI-global flags of a typical demo app
//! with an explicit object the presentation layer passes to each handler. It
//! owns the document store handle, the cached index, and the conversation
//! history, and is discarded when the user's session ends. Sessions are not
//! shared across users and need no locking.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{Answer, ChatMessage};
use crate::error::Result;
use crate::index::VectorIndex;
use crate::pipeline::QaPipeline;
use crate::store::DocumentStore;

/// Per-user interaction state: cached index plus conversation history.
///
/// The index cache is keyed by the document-set fingerprint. Uploading a new
/// document changes the fingerprint, which invalidates both the in-memory
/// cache and the persisted artifacts, so the next query is answered against
/// the full current document set rather than a stale index.
#[derive(Debug)]
pub struct Session {
    store: DocumentStore,
    persist_dir: PathBuf,
    index: Option<Arc<VectorIndex>>,
    history: Vec<ChatMessage>,
}

impl Session {
    /// Create a session over the given document store and persist directory.
    pub fn new(store: DocumentStore, persist_dir: impl Into<PathBuf>) -> Self {
        Self { store, persist_dir: persist_dir.into(), index: None, history: Vec::new() }
    }

    /// The session's document store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// The conversation history so far.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Store an uploaded file, dropping the cached index if the upload
    /// changed the document set.
    pub fn upload(&mut self, bytes: &[u8], file_name: &str) -> Result<PathBuf> {
        let path = self.store.save(bytes, file_name)?;
        if let Some(index) = &self.index {
            if index.fingerprint() != self.store.fingerprint()? {
                info!(file = file_name, "document set changed; invalidating cached index");
                self.index = None;
            }
        }
        Ok(path)
    }

    /// Return the session's index, building or loading it if necessary.
    ///
    /// The cached index is reused only while its fingerprint matches the
    /// current document set; on mismatch the persisted artifacts are removed
    /// and the index is rebuilt from all currently stored documents.
    pub async fn index(&mut self, pipeline: &QaPipeline) -> Result<Arc<VectorIndex>> {
        let current = self.store.fingerprint()?;

        if let Some(index) = self.index.take() {
            if index.fingerprint() == current {
                debug!("using cached index");
                self.index = Some(Arc::clone(&index));
                return Ok(index);
            }
        }

        if VectorIndex::is_persisted(&self.persist_dir) {
            match VectorIndex::load(&self.persist_dir) {
                Ok(index) if index.fingerprint() == current => {
                    let index = Arc::new(index);
                    self.index = Some(Arc::clone(&index));
                    return Ok(index);
                }
                // Stale artifacts from an earlier document set are removed
                // so build_or_load does not resurrect them. A corrupt load
                // is surfaced instead; deleting corrupt state is left to an
                // explicit user retry.
                Ok(_) => {
                    info!(dir = %self.persist_dir.display(), "persisted index is stale; rebuilding");
                    std::fs::remove_dir_all(&self.persist_dir)?;
                }
                Err(e) => return Err(e),
            }
        }

        let index = Arc::new(pipeline.build_or_load(&self.store, &self.persist_dir).await?);
        self.index = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Answer a one-shot query against the session's index. The conversation
    /// history is not consulted or modified.
    pub async fn ask(&mut self, pipeline: &QaPipeline, query: &str) -> Result<Answer> {
        let index = self.index(pipeline).await?;
        pipeline.answer(&index, query).await
    }

    /// Run one conversational turn against the session's index, appending to
    /// the session history on success.
    pub async fn chat(&mut self, pipeline: &QaPipeline, message: &str) -> Result<Answer> {
        let index = self.index(pipeline).await?;
        pipeline.chat(&index, &mut self.history, message).await
    }

    /// Forget the conversation history, keeping the cached index.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
