//! Document store: uploaded files on disk, read back with per-page text.
//!
//! The store owns a single directory. Uploads are written as-is (overwriting
//! any file of the same name); at indexing time every stored document is read
//! back with its page structure so citations can carry page labels. PDF text
//! is extracted with `lopdf`; plain-text files are treated as a single page.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::{Document, DocumentPage};
use crate::error::{QaError, Result};

/// File extensions the store accepts and knows how to read.
const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// A directory of uploaded source documents.
///
/// # Example
///
/// ```rust,ignore
/// use docqa::DocumentStore;
///
/// let store = DocumentStore::new("./uploads");
/// let path = store.save(&bytes, "report.pdf")?;
/// let documents = store.load_documents()?;
/// ```
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first [`save`](DocumentStore::save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this store reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store an uploaded file, overwriting any existing file of the same name.
    ///
    /// Only the extension is validated; content is written verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Document`] if `file_name` has directory components
    /// or an unsupported extension, and [`QaError::Io`] if the write fails.
    pub fn save(&self, bytes: &[u8], file_name: &str) -> Result<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(QaError::Document {
                path: PathBuf::from(file_name),
                message: "file name must be a bare name without directory components".to_string(),
            });
        }
        if !has_supported_extension(file_name) {
            return Err(QaError::Document {
                path: PathBuf::from(file_name),
                message: format!(
                    "unsupported file type (expected one of: {})",
                    SUPPORTED_EXTENSIONS.join(", ")
                ),
            });
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        info!(file = file_name, bytes = bytes.len(), "stored uploaded document");
        Ok(path)
    }

    /// Load every stored document with its per-page text, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::NoDocuments`] if the directory is missing or holds
    /// no supported files, and [`QaError::Document`] if a file cannot be
    /// parsed.
    pub fn load_documents(&self) -> Result<Vec<Document>> {
        let mut paths: Vec<PathBuf> = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.is_file()
                        && path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(has_supported_extension)
                })
                .collect(),
            // A directory that does not exist yet simply holds no documents;
            // any other failure (permissions, not a directory) is a real
            // I/O error and must surface as one.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if paths.is_empty() {
            return Err(QaError::NoDocuments { dir: self.dir.clone() });
        }
        // Deterministic order so chunk creation order is reproducible.
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            documents.push(load_document(&path)?);
        }
        info!(count = documents.len(), dir = %self.dir.display(), "loaded documents");
        Ok(documents)
    }

    /// Fingerprint of the current document set: file names and file contents,
    /// hashed with xxh3. Changes whenever a document is added, replaced with
    /// different content (even of the same length), or removed.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Io`] if the directory or a file cannot be read. A
    /// missing directory fingerprints as empty rather than erroring.
    pub fn fingerprint(&self) -> Result<u64> {
        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        match std::fs::read_dir(&self.dir) {
            Ok(dir) => {
                for entry in dir {
                    let entry = entry?;
                    let path = entry.path();
                    let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
                    if path.is_file() && has_supported_extension(name) {
                        entries.push((name.to_string(), path));
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        entries.sort();

        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        for (name, path) in &entries {
            hasher.update(name.as_bytes());
            hasher.update(&std::fs::read(path)?);
        }
        Ok(hasher.digest())
    }
}

fn has_supported_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

/// Read a single document with its page structure.
fn load_document(path: &Path) -> Result<Document> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| QaError::Document {
            path: path.to_path_buf(),
            message: "file name is not valid UTF-8".to_string(),
        })?
        .to_string();

    let is_pdf = Path::new(&file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let pages = if is_pdf { extract_pdf_pages(path)? } else { read_text_page(path)? };

    debug!(file = %file_name, pages = pages.len(), "read document");
    Ok(Document { file_name, path: path.to_path_buf(), pages })
}

/// Extract text page by page from a PDF.
fn extract_pdf_pages(path: &Path) -> Result<Vec<DocumentPage>> {
    let pdf = lopdf::Document::load(path).map_err(|e| QaError::Document {
        path: path.to_path_buf(),
        message: format!("failed to parse PDF: {e}"),
    })?;

    let mut pages = Vec::new();
    for page_number in pdf.get_pages().keys() {
        let text = match pdf.extract_text(&[*page_number]) {
            Ok(text) => text,
            Err(e) => {
                // A page without extractable text still keeps its slot so
                // page labels stay aligned with the source document.
                warn!(path = %path.display(), page = page_number, error = %e, "no extractable text");
                String::new()
            }
        };
        pages.push(DocumentPage { page_label: page_number.to_string(), text });
    }
    Ok(pages)
}

/// Read a plain-text file as a single-page document.
fn read_text_page(path: &Path) -> Result<Vec<DocumentPage>> {
    let text = std::fs::read_to_string(path).map_err(|e| QaError::Document {
        path: path.to_path_buf(),
        message: format!("failed to read text file: {e}"),
    })?;
    Ok(vec![DocumentPage { page_label: "1".to_string(), text }])
}
