//! Document chunking.
//!
//! [`RecursiveCharacterSplitter`] walks a document with a window of
//! `chunk_size` characters. Each window is cut after the highest-priority
//! separator it contains, and the next window starts `chunk_overlap`
//! characters before that cut. Consecutive chunks therefore share exactly
//! `chunk_overlap` characters, and no chunk exceeds `chunk_size`.
//!
//! Lengths are counted in Unicode scalar values, not bytes.

use crate::config::ChunkConfig;
use crate::document::{CHUNK_INDEX_KEY, Chunk, Document};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text on a prioritized list of separators with a fixed overlap.
///
/// Chunk IDs are generated as `{document_id}#{chunk_index}`. Each chunk
/// inherits the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use novel_rag::RecursiveCharacterSplitter;
///
/// let splitter = RecursiveCharacterSplitter::new(500, 50);
/// let chunks = splitter.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Vec<char>>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separator list.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — characters shared by consecutive chunks, clamped
    ///   below `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::with_separators(chunk_size, chunk_overlap, &ChunkConfig::default().separators)
    }

    /// Create a splitter from a [`ChunkConfig`].
    pub fn from_config(config: &ChunkConfig) -> Self {
        Self::with_separators(config.chunk_size, config.chunk_overlap, &config.separators)
    }

    /// Create a splitter with an explicit separator priority list.
    ///
    /// An empty separator stands for a hard cut at the window edge, which is
    /// always available whether or not it appears in the list.
    pub fn with_separators<S: AsRef<str>>(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: &[S],
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: separators
                .iter()
                .map(|s| s.as_ref().chars().collect::<Vec<_>>())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            if chars.len() - start <= self.chunk_size {
                pieces.push(chars[start..].iter().collect());
                break;
            }
            let end = self.find_cut(&chars, start);
            pieces.push(chars[start..end].iter().collect());
            start = end - self.chunk_overlap;
        }

        pieces
    }

    /// Choose where the chunk starting at `start` ends.
    ///
    /// The cut lies in `(start + chunk_overlap, start + chunk_size]` so the
    /// next start always advances.
    fn find_cut(&self, chars: &[char], start: usize) -> usize {
        let window_end = start + self.chunk_size;
        let min_cut = start + self.chunk_overlap + 1;

        for separator in &self.separators {
            if let Some(cut) = last_cut_after(chars, separator, start, min_cut, window_end) {
                return cut;
            }
        }
        window_end
    }
}

/// Find the largest `cut` in `[min_cut, window_end]` such that `separator`
/// ends exactly at `cut` and begins at or after `start`.
fn last_cut_after(
    chars: &[char],
    separator: &[char],
    start: usize,
    min_cut: usize,
    window_end: usize,
) -> Option<usize> {
    let lowest = min_cut.max(start + separator.len());
    (lowest..=window_end).rev().find(|&cut| chars[cut - separator.len()..cut] == *separator)
}

impl Chunker for RecursiveCharacterSplitter {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
                Chunk {
                    id: format!("{}#{i}", document.id),
                    text,
                    metadata,
                    index: i,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_paragraph_breaks_over_spaces() {
        let splitter = RecursiveCharacterSplitter::new(20, 2);
        let pieces = splitter.split_text("aaaa bbbb\n\ncccc dddd eeee ffff");
        assert_eq!(pieces[0], "aaaa bbbb\n\n");
        assert!(pieces[1].starts_with("\n\n"));
    }

    #[test]
    fn falls_back_to_hard_cut_without_separators() {
        let splitter = RecursiveCharacterSplitter::with_separators(4, 1, &["\n\n"]);
        assert_eq!(splitter.split_text("abcdefghij"), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let splitter = RecursiveCharacterSplitter::new(5, 1);
        let pieces = splitter.split_text("天地玄黄宇宙洪荒日月盈昃");
        assert!(pieces.iter().all(|p| p.chars().count() <= 5));
        assert_eq!(pieces[0], "天地玄黄宇");
        assert_eq!(pieces[1].chars().next(), Some('宇'));
    }

    #[test]
    fn sentence_punctuation_beats_commas() {
        let splitter = RecursiveCharacterSplitter::new(12, 0);
        let pieces = splitter.split_text("他来了。我走了，你呢好的好的好的");
        assert_eq!(pieces[0], "他来了。");
        assert_eq!(pieces[1], "我走了，你呢好的好的好的");
    }

    #[test]
    fn chunks_carry_source_and_position() {
        let document = Document::from_source("books/one.txt", "x".repeat(25));
        let chunks = RecursiveCharacterSplitter::new(10, 2).chunk(&document);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].id, "books/one.txt#1");
        assert_eq!(chunks[1].source(), "books/one.txt");
        assert_eq!(chunks[2].metadata.get(CHUNK_INDEX_KEY).map(String::as_str), Some("2"));
    }

    #[test]
    fn empty_document_has_no_chunks() {
        let document = Document::from_source("empty.txt", "");
        assert!(RecursiveCharacterSplitter::new(10, 2).chunk(&document).is_empty());
    }
}
