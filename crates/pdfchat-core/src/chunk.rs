//! Recursive character-boundary page chunker.
//!
//! Splits page text into overlapping [`Chunk`]s of at most `chunk_size`
//! characters, preferring the largest semantic boundary that works.
//!
//! # Algorithm
//!
//! 1. Strip newline characters from the page text.
//! 2. Pick the first separator in [`SEPARATORS`] that occurs in the text
//!    (paragraph, line, sentence, word; `""` means single characters).
//! 3. Split on it. Punctuation in the separator stays on the piece before
//!    it and only the whitespace is consumed, so no text is lost at a chunk
//!    boundary. Pieces shorter than `chunk_size` are merged greedily into
//!    chunks; pieces that are still too long are split again with the
//!    remaining, smaller separators.
//! 4. When a chunk is flushed, pieces are dropped from its front until at
//!    most `chunk_overlap` characters remain; those carry into the next chunk.
//!
//! Lengths are measured in characters, not bytes. Each chunk also carries a
//! copy of its text truncated to `max_excerpt_bytes` bytes, which bounds the
//! metadata payload written to the vector store.
//!
//! # Example
//!
//! ```rust
//! use pdfchat_core::chunk::{split_page, ChunkParams};
//! use pdfchat_core::models::Page;
//!
//! let params = ChunkParams { chunk_size: 20, chunk_overlap: 0, ..ChunkParams::default() };
//! let chunks = split_page(&Page::new(1, "alfa bravo charlie delta echo foxtrot"), &params);
//! assert_eq!(chunks[0].content, "alfa bravo charlie");
//! assert!(chunks.iter().all(|c| c.page_number == 1));
//! ```

use std::collections::VecDeque;

use sha2::{Digest, Sha256};

use crate::models::{Chunk, Page};

/// Separators tried in order, from largest boundary to smallest.
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Byte budget for the excerpt stored with each vector.
pub const DEFAULT_MAX_EXCERPT_BYTES: usize = 36_000;

/// Chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkParams {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Byte budget for [`Chunk::source_excerpt`].
    pub max_excerpt_bytes: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_excerpt_bytes: DEFAULT_MAX_EXCERPT_BYTES,
        }
    }
}

impl ChunkParams {
    /// Check the parameter invariants, returning a description of the first
    /// violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.max_excerpt_bytes == 0 {
            return Err("max_excerpt_bytes must be > 0".to_string());
        }
        Ok(())
    }
}

/// Split one page into chunks that inherit its page number.
///
/// Returns an empty vector for pages with no text.
pub fn split_page(page: &Page, params: &ChunkParams) -> Vec<Chunk> {
    let text: String = page
        .text
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();

    let splitter = RecursiveSplitter {
        chunk_size: params.chunk_size,
        chunk_overlap: params.chunk_overlap,
    };

    splitter
        .split(&text, &SEPARATORS)
        .into_iter()
        .map(|content| Chunk {
            source_excerpt: truncate_str_by_bytes(&content, params.max_excerpt_bytes).to_string(),
            content,
            page_number: page.page_number,
        })
        .collect()
}

/// Hex SHA-256 of the chunk text, used as the vector record id.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a
/// UTF-8 character.
pub fn truncate_str_by_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, joiner(separator)));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, joiner(separator)));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let gap = if window.is_empty() { 0 } else { sep_len };

            if total + len + gap > self.chunk_size && !window.is_empty() {
                if let Some(doc) = join_trimmed(&window, separator) {
                    docs.push(doc);
                }
                // Shrink to the overlap, and far enough that the next piece fits.
                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if window.is_empty() { 0 } else { sep_len }
                            > self.chunk_size)
                {
                    let dropped_joiner = if window.len() > 1 { sep_len } else { 0 };
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total = total.saturating_sub(char_len(first) + dropped_joiner);
                }
            }

            window.push_back(piece);
            total += len + if window.len() > 1 { sep_len } else { 0 };
        }

        if let Some(doc) = join_trimmed(&window, separator) {
            docs.push(doc);
        }
        docs
    }
}

/// Split on `separator`, keeping its non-whitespace prefix (the `.` of
/// `". "`) at the end of each piece.
fn pieces<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let kept = separator.len() - joiner(separator).len();
    text.split_inclusive(separator)
        .map(|p| match p.strip_suffix(separator) {
            Some(body) => &p[..body.len() + kept],
            None => p,
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// The whitespace part of a separator, re-inserted between merged pieces.
fn joiner(separator: &str) -> &str {
    &separator[separator.trim_end().len()..]
}

fn join_trimmed(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
