//! Extracting per-page text from PDF files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lopdf::Document;
use tracing::{debug, warn};

use crate::document::Page;
use crate::error::{RagError, Result};

/// A source of page text for indexing.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every page of the document at `path`, in page order.
    ///
    /// Page numbers are zero-indexed.
    async fn load(&self, path: &Path) -> Result<Vec<Page>>;
}

/// Loads PDFs with [`lopdf`], one [`Page`] per PDF page.
///
/// Parsing runs on the blocking thread pool. Pages whose text cannot be
/// extracted are kept with empty text so page numbering stays aligned; a
/// document with no extractable text at all is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl PdfLoader {
    /// Create a new PDF loader.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let owned: PathBuf = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || load_pages(&owned))
            .await
            .map_err(|e| loader_error(path, format!("extraction task failed: {e}")))??;
        debug!(path = %path.display(), page_count = pages.len(), "loaded pdf");
        Ok(pages)
    }
}

fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let doc = Document::load(path).map_err(|e| loader_error(path, e.to_string()))?;
    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        let text = match doc.extract_text(&[number]) {
            Ok(raw) => normalize_text(&raw),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    page = number,
                    error = %e,
                    "page text extraction failed"
                );
                String::new()
            }
        };
        pages.push(Page::new(number.saturating_sub(1), text));
    }

    if pages.iter().all(|p| p.text.trim().is_empty()) {
        return Err(loader_error(path, "no extractable text (scanned or empty PDF?)"));
    }
    Ok(pages)
}

/// Drop NULs and trailing whitespace, collapse runs of blank lines.
fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0;
    for line in raw.replace('\0', "").lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

fn loader_error(path: &Path, message: impl Into<String>) -> RagError {
    RagError::LoaderError { path: path.display().to_string(), message: message.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_nuls_and_blank_runs() {
        let raw = "Title\0  \n\n\n\nBody line   \nnext\n\n";
        assert_eq!(normalize_text(raw), "Title\n\nBody line\nnext");
    }

    #[tokio::test]
    async fn missing_file_is_a_loader_error() {
        let err = PdfLoader::new().load(Path::new("/definitely/not/here.pdf")).await.unwrap_err();
        assert!(matches!(err, RagError::LoaderError { .. }), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_a_loader_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = PdfLoader::new().load(&path).await.unwrap_err();
        assert!(matches!(err, RagError::LoaderError { .. }));
    }
}
