//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] — splits by character count with configurable overlap
//! - [`RecursiveChunker`] — splits on a separator hierarchy (paragraphs, lines,
//!   sentences, words), falling back to character windows
//!
//! Both count Unicode scalar values, never bytes, so a split can never land
//! inside a code point. Concatenating a chunker's output (minus overlaps)
//! reconstructs the input text exactly.

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no
/// embeddings. Embeddings are attached later by the ingestion pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text; the pipeline
    /// treats that as an ingestion failure.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Build a [`Chunk`] from a text segment, inheriting document metadata and
/// recording the chunk index.
fn make_chunk(document: &Document, index: usize, text: String) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert("chunk_index".to_string(), index.to_string());
    Chunk {
        id: format!("{}_{index}", document.id),
        text,
        embedding: Vec::new(),
        metadata,
        document_id: document.id.clone(),
    }
}

/// Split text into character windows of at most `chunk_size` characters,
/// where consecutive windows share exactly `chunk_overlap` characters.
///
/// Offsets are computed over `char_indices`, so multi-byte characters are
/// kept intact. A stride of zero (overlap >= size) stops after the first
/// window rather than looping forever; the config builder rejects that
/// combination before it reaches this point.
fn split_fixed(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    let byte_at = |pos: usize| if pos >= total { text.len() } else { offsets[pos] };
    let stride = chunk_size.saturating_sub(chunk_overlap);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        windows.push(text[byte_at(start)..byte_at(end)].to_string());
        if stride == 0 {
            break;
        }
        start += stride;
    }
    windows
}

/// Splits text into fixed-size chunks by character count with overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk
/// inherits the parent document's metadata plus a `chunk_index` field.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — characters shared between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        split_fixed(&document.text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| make_chunk(document, i, text))
            .collect()
    }
}

/// Separator hierarchy tried in order by [`RecursiveChunker`]:
/// paragraph breaks, line breaks, sentence ends, then word boundaries.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", "! ", " "];

/// Split text at a separator, keeping the separator attached to the
/// preceding segment so that concatenating the segments restores the input.
fn split_inclusive_str<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut tail = text;
    while let Some(pos) = tail.find(separator) {
        let cut = pos + separator.len();
        segments.push(&tail[..cut]);
        tail = &tail[cut..];
    }
    if !tail.is_empty() {
        segments.push(tail);
    }
    segments
}

/// Push a merged segment, recursing with the remaining separators if it
/// still exceeds `chunk_size`.
fn flush_segment(
    chunks: &mut Vec<String>,
    segment: String,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) {
    if segment.chars().count() > chunk_size {
        chunks.extend(split_recursive(&segment, chunk_size, chunk_overlap, separators));
    } else {
        chunks.push(segment);
    }
}

/// Split text on the first separator present in it, greedily merging the
/// resulting segments back into chunks of at most `chunk_size` characters.
/// Oversized segments recurse with the next separators; text containing none
/// of the separators falls back to plain character windows.
fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    let Some(pos) = separators.iter().position(|s| text.contains(s)) else {
        return split_fixed(text, chunk_size, chunk_overlap);
    };
    let separator = separators[pos];
    let remaining = &separators[pos + 1..];

    let mut chunks = Vec::new();
    let mut current = String::new();
    for segment in split_inclusive_str(text, separator) {
        let segment_len = segment.chars().count();
        if !current.is_empty() && current.chars().count() + segment_len > chunk_size {
            flush_segment(&mut chunks, std::mem::take(&mut current), chunk_size, chunk_overlap, remaining);
        }
        current.push_str(segment);
    }
    if !current.is_empty() {
        flush_segment(&mut chunks, current, chunk_size, chunk_overlap, remaining);
    }

    chunks
}

/// Splits text on a separator hierarchy: paragraphs, lines, sentences, words.
///
/// Separators are kept attached to the preceding segment, so chunks produced
/// at the separator levels are non-overlapping and concatenate back to the
/// original text. Only the character-window fallback (text with no separators
/// at all) applies `chunk_overlap`.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — overlap applied in the character-window fallback
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        split_recursive(&document.text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            .into_iter()
            .enumerate()
            .map(|(i, text)| make_chunk(document, i, text))
            .collect()
    }
}
