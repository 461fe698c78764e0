//! Data types for pages, chunks, search results, and answers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sentinel returned whenever the PDF does not ground an answer.
pub const NOT_FOUND: &str = "Answer is not in this PDF.";

/// Returned when retrieval finds nothing at all for the question.
pub const NO_RELEVANT_CONTENT: &str = "No relevant content found in this PDF.";

/// One page of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// Zero-indexed page number. Loaders that cannot tell report 0.
    pub number: u32,
    /// The extracted text of the page.
    pub text: String,
}

impl Page {
    /// Create a page from its zero-indexed number and text.
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self { number, text: text.into() }
    }
}

/// A bounded span of a PDF's text, tagged with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Store key, `{pdf_id}_{chunk_id}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Zero-indexed page the chunk was cut from.
    #[serde(default)]
    pub page: u32,
    /// Identifier of the PDF this chunk belongs to.
    pub pdf_id: String,
    /// Sequential index within the PDF's chunk list.
    pub chunk_id: usize,
    /// The vector embedding for this chunk's text. Empty until indexed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Build an un-embedded chunk.
    pub fn new(pdf_id: &str, chunk_id: usize, page: u32, text: impl Into<String>) -> Self {
        Self {
            id: format!("{pdf_id}_{chunk_id}"),
            text: text.into(),
            page,
            pdf_id: pdf_id.to_string(),
            chunk_id,
            embedding: Vec::new(),
        }
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The response handed back to the caller of `answer`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// The model's answer, or one of the fixed sentinels.
    pub answer: String,
    /// `"Source pages: 1, 3"` or empty.
    pub source: String,
}

impl Answer {
    /// The "not in this PDF" answer with no source.
    pub fn not_found() -> Self {
        Self { answer: NOT_FOUND.to_string(), source: String::new() }
    }

    /// The answer returned when retrieval came back empty.
    pub fn no_relevant_content() -> Self {
        Self { answer: NO_RELEVANT_CONTENT.to_string(), source: String::new() }
    }

    /// Whether this is the not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        self.answer == NOT_FOUND
    }
}

/// Format the source line for a set of retrieved chunks.
///
/// Pages are converted to 1-indexed, deduplicated and sorted. Returns an
/// empty string when there are no pages.
pub fn format_source<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
    let pages: BTreeSet<u32> = chunks.into_iter().map(|c| c.page + 1).collect();
    if pages.is_empty() {
        return String::new();
    }
    let listed: Vec<String> = pages.iter().map(u32::to_string).collect();
    format!("Source pages: {}", listed.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_pages_are_one_indexed_sorted_and_distinct() {
        let chunks = vec![
            Chunk::new("doc", 0, 4, "a"),
            Chunk::new("doc", 1, 0, "b"),
            Chunk::new("doc", 2, 4, "c"),
            Chunk::new("doc", 3, 1, "d"),
        ];
        assert_eq!(format_source(&chunks), "Source pages: 1, 2, 5");
    }

    #[test]
    fn no_chunks_means_empty_source() {
        assert_eq!(format_source(&Vec::<Chunk>::new()), "");
    }

    #[test]
    fn chunk_id_is_derived_from_pdf_and_index() {
        let chunk = Chunk::new("abc", 7, 2, "text");
        assert_eq!(chunk.id, "abc_7");
        assert_eq!(chunk.chunk_id, 7);
        assert!(chunk.embedding.is_empty());
    }

    #[test]
    fn answer_serializes_with_answer_and_source_keys() {
        let json = serde_json::to_value(Answer::not_found()).unwrap();
        assert_eq!(json, serde_json::json!({"answer": "Answer is not in this PDF.", "source": ""}));
    }
}
