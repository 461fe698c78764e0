//! Splitting page text into overlapping chunks.
//!
//! This module provides the [`TextSplitter`] trait and the
//! [`RecursiveCharacterSplitter`], which prefers paragraph, then line, then
//! word boundaries, falling back to single characters.
//!
//! All sizes are counted in characters (Unicode scalar values), and chunks
//! are always cut on `char` boundaries.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::document::{Chunk, Page};

/// Separators tried in order by [`RecursiveCharacterSplitter`].
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A piece of text together with its byte offset in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// Byte offset of `text` within the text that was split.
    pub start: usize,
    /// The chunk text, trimmed of surrounding whitespace.
    pub text: String,
}

impl TextSpan {
    /// Byte offset one past the end of this span in the source text.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// A strategy for splitting text into chunks.
pub trait TextSplitter: Send + Sync {
    /// Split a single text into trimmed, non-empty spans.
    fn split_text(&self, text: &str) -> Vec<TextSpan>;

    /// Split every page and tag the results for `pdf_id`.
    ///
    /// `chunk_id`s run sequentially across pages starting at zero; each
    /// chunk keeps the number of the page it was cut from. The returned
    /// chunks carry no embeddings yet.
    fn split_pages(&self, pdf_id: &str, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for span in self.split_text(&page.text) {
                let chunk_id = chunks.len();
                chunks.push(Chunk::new(pdf_id, chunk_id, page.number, span.text));
            }
        }
        chunks
    }
}

/// A contiguous byte range of the source text and its length in chars.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

/// Splits text hierarchically by a list of separators.
///
/// The first separator present in the text is used to cut it into pieces,
/// keeping the separator attached to the preceding piece. Pieces that still
/// exceed `chunk_size` are split again with the remaining separators. The
/// pieces are then merged greedily into chunks of at most `chunk_size`
/// characters, and each new chunk begins with up to `chunk_overlap`
/// characters carried over from the end of the previous one.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{RecursiveCharacterSplitter, TextSplitter};
///
/// let splitter = RecursiveCharacterSplitter::new(900, 150);
/// let spans = splitter.split_text(&page_text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default paragraph/line/word/char separators.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a splitter using the chunk size and overlap from `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    fn split_range(
        &self,
        text: &str,
        start: usize,
        end: usize,
        separators: &[String],
        out: &mut Vec<(usize, usize)>,
    ) {
        let segment = &text[start..end];
        let position =
            separators.iter().position(|s| s.is_empty() || segment.contains(s.as_str()));
        let (separator, remaining) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &separators[separators.len()..]),
        };

        let mut fitting = Vec::new();
        for piece in pieces_of(segment, start, separator) {
            if piece.chars <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                self.merge(&fitting, out);
                fitting.clear();
            }
            if remaining.is_empty() {
                // Nothing finer to split on; keep it whole.
                out.push((piece.start, piece.end));
            } else {
                self.split_range(text, piece.start, piece.end, remaining, out);
            }
        }
        if !fitting.is_empty() {
            self.merge(&fitting, out);
        }
    }

    fn merge(&self, pieces: &[Piece], out: &mut Vec<(usize, usize)>) {
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            if total + piece.chars > self.chunk_size && !window.is_empty() {
                push_window(&window, out);
                while total > self.chunk_overlap
                    || (total + piece.chars > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(dropped) => total -= dropped.chars,
                        None => break,
                    }
                }
            }
            total += piece.chars;
            window.push_back(*piece);
        }
        push_window(&window, out);
    }
}

impl TextSplitter for RecursiveCharacterSplitter {
    fn split_text(&self, text: &str) -> Vec<TextSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let mut ranges = Vec::new();
        self.split_range(text, 0, text.len(), &self.separators, &mut ranges);
        ranges.into_iter().filter_map(|(start, end)| trimmed_span(text, start, end)).collect()
    }
}

/// Cut `segment` after every occurrence of `separator`, or into single
/// characters when the separator is empty. Offsets are shifted by `base`.
fn pieces_of(segment: &str, base: usize, separator: &str) -> Vec<Piece> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| Piece { start: base + i, end: base + i + c.len_utf8(), chars: 1 })
            .collect();
    }

    let mut pieces = Vec::new();
    let mut cursor = 0;
    while let Some(pos) = segment[cursor..].find(separator) {
        let end = cursor + pos + separator.len();
        pieces.push(Piece {
            start: base + cursor,
            end: base + end,
            chars: segment[cursor..end].chars().count(),
        });
        cursor = end;
    }
    if cursor < segment.len() {
        pieces.push(Piece {
            start: base + cursor,
            end: base + segment.len(),
            chars: segment[cursor..].chars().count(),
        });
    }
    pieces
}

fn push_window(window: &VecDeque<Piece>, out: &mut Vec<(usize, usize)>) {
    if let (Some(first), Some(last)) = (window.front(), window.back()) {
        out.push((first.start, last.end));
    }
}

fn trimmed_span(text: &str, start: usize, end: usize) -> Option<TextSpan> {
    let raw = &text[start..end];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(TextSpan { start: start + leading, text: trimmed.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(count: usize, prefix: &str) -> String {
        (0..count).map(|i| format!("{prefix}{i:04}")).collect::<Vec<_>>().join(" ")
    }

    /// Every non-whitespace byte of `text` lies inside some span.
    fn assert_covers(text: &str, spans: &[TextSpan]) {
        let mut covered = vec![false; text.len()];
        for span in spans {
            assert_eq!(&text[span.start..span.end()], span.text);
            covered[span.start..span.end()].iter_mut().for_each(|c| *c = true);
        }
        for (i, c) in text.char_indices() {
            if !c.is_whitespace() {
                assert!(covered[i], "byte {i} ({c:?}) not covered by any chunk");
            }
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let splitter = RecursiveCharacterSplitter::new(900, 150);
        let spans = splitter.split_text("  The quick brown fox.\n");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "The quick brown fox.");
        assert_eq!(spans[0].start, 2);
    }

    #[test]
    fn blank_text_yields_nothing() {
        let splitter = RecursiveCharacterSplitter::new(900, 150);
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \t").is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_boundaries() {
        let first = words(80, "a");
        let second = words(80, "b");
        let text = format!("{first}\n\n{second}");
        let splitter = RecursiveCharacterSplitter::new(900, 150);

        let spans = splitter.split_text(&text);

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, first);
        assert_eq!(spans[1].text, second);
    }

    #[test]
    fn lines_are_preferred_over_spaces() {
        let text = "alpha beta gamma\ndelta epsilon zeta\neta theta iota";
        let splitter = RecursiveCharacterSplitter::new(20, 0);

        let spans = splitter.split_text(text);

        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta gamma", "delta epsilon zeta", "eta theta iota"]);
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = words(400, "w");
        let splitter = RecursiveCharacterSplitter::new(900, 150);

        let spans = splitter.split_text(&text);

        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.text.chars().count() <= 900);
        }
        for pair in spans.windows(2) {
            assert!(pair[1].start < pair[0].end(), "consecutive chunks should overlap");
            let overlap = &text[pair[1].start..pair[0].end()];
            assert!(overlap.chars().count() <= 150);
        }
        assert_covers(&text, &spans);
    }

    #[test]
    fn two_page_document_is_covered_without_gaps() {
        // Two pages, 2000 characters in total.
        let page_one = words(200, "p")[..1000].to_string();
        let page_two = words(200, "q")[..1000].to_string();
        let pages = vec![Page::new(0, page_one.clone()), Page::new(1, page_two.clone())];
        let splitter = RecursiveCharacterSplitter::new(900, 150);

        for page in &pages {
            let spans = splitter.split_text(&page.text);
            assert!(spans.len() >= 2);
            assert!(spans.windows(2).all(|p| p[1].start < p[0].end()));
            assert_covers(&page.text, &spans);
        }

        let chunks = splitter.split_pages("doc", &pages);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, i);
            assert_eq!(chunk.pdf_id, "doc");
            assert_eq!(chunk.id, format!("doc_{i}"));
        }
        assert!(chunks.iter().any(|c| c.page == 0));
        assert!(chunks.iter().any(|c| c.page == 1));
        assert!(chunks.windows(2).all(|p| p[0].page <= p[1].page));
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let text = "é".repeat(2000);
        let splitter = RecursiveCharacterSplitter::new(900, 150);

        let spans = splitter.split_text(&text);

        assert_eq!(spans.len(), 3);
        assert!(spans.iter().all(|s| s.text.chars().count() <= 900));
        assert_eq!(spans[0].text.chars().count(), 900);
        assert_covers(&text, &spans);
    }
}
