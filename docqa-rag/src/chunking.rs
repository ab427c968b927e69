//! Chunking strategies for parsed documents.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: overlapping windows of a fixed character count
//! - [`RecursiveChunker`]: splits by paragraphs, lines, sentences, then words
//!
//! Sizes are measured in characters, never bytes, so multi-byte text is
//! never cut inside a code point.

use serde_json::Value;

use crate::document::{Chunk, META_CHUNK_INDEX, META_PARENT_ID};

/// A strategy for splitting a parsed document into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// Chunk ids are `{parent id}_{n}`; each chunk inherits the parent's
    /// metadata plus `chunk_index` and `parent_id`.
    fn split(&self, document: &Chunk) -> Vec<Chunk>;
}

fn child(parent: &Chunk, index: usize, content: String) -> Chunk {
    let mut metadata = parent.metadata.clone();
    metadata.insert(META_CHUNK_INDEX.to_string(), Value::from(index));
    metadata.insert(META_PARENT_ID.to_string(), Value::from(parent.id.clone()));
    Chunk { id: format!("{}_{index}", parent.id), content, metadata }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits text into fixed-size windows with configurable overlap.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 200);
/// let chunks = chunker.split(&document);
/// ```
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
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

/// Character-based windows with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}

impl Chunker for FixedSizeChunker {
    fn split(&self, document: &Chunk) -> Vec<Chunk> {
        if document.content.trim().is_empty() {
            return Vec::new();
        }

        split_by_size(&document.content, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, content)| child(document, i, content))
            .collect()
    }
}

const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Splits text hierarchically: paragraphs, lines, sentences, then words.
///
/// Segments are merged greedily up to `chunk_size`. A new chunk starts with
/// up to `chunk_overlap` trailing characters of the previous one, trimmed to
/// a word boundary. Text with no separator left falls back to fixed windows.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.split(&document);
/// ```
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
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// The last `overlap` characters of `text`, starting after a whitespace if one exists.
fn overlap_tail(text: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let total = char_len(text);
    let skip = total.saturating_sub(overlap);
    let start = text.char_indices().nth(skip).map_or(text.len(), |(i, _)| i);
    let tail = &text[start..];
    match tail.find(char::is_whitespace) {
        Some(pos) if skip > 0 => tail[pos..].trim_start(),
        _ => tail,
    }
}

fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return if text.trim().is_empty() { Vec::new() } else { vec![text.to_string()] };
    }

    let Some((separator, rest)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };

    let segments = split_keeping_separator(text, separator);
    if segments.len() <= 1 {
        return split_recursive(text, chunk_size, chunk_overlap, rest);
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for segment in segments {
        if char_len(segment) > chunk_size {
            if !current.trim().is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.clear();
            chunks.extend(split_recursive(segment, chunk_size, chunk_overlap, rest));
            continue;
        }

        if char_len(&current) + char_len(segment) <= chunk_size {
            current.push_str(segment);
            continue;
        }

        let tail = overlap_tail(&current, chunk_overlap).to_string();
        if !current.trim().is_empty() {
            chunks.push(current);
        }
        current = if char_len(&tail) + char_len(segment) <= chunk_size {
            tail + segment
        } else {
            segment.to_string()
        };
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}

impl Chunker for RecursiveChunker {
    fn split(&self, document: &Chunk) -> Vec<Chunk> {
        if document.content.trim().is_empty() {
            return Vec::new();
        }

        split_recursive(&document.content, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            .into_iter()
            .enumerate()
            .map(|(i, content)| child(document, i, content))
            .collect()
    }
}
