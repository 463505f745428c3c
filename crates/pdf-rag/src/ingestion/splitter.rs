//! Recursive boundary-aware text splitting
//!
//! Text is cut at the coarsest separator that occurs in it (paragraph, line,
//! sentence, word) and the pieces are merged back into windows of at most
//! `chunk_size` characters, each window repeating up to `chunk_overlap`
//! characters of the previous one. Pieces that are still too long are split
//! again with the next finer separator, down to single characters.
//!
//! Every chunk is a slice of the input, so chunks carry their byte offset and
//! the original text can be recovered from them.

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};

/// Default separators, coarsest first; the empty separator cuts characters
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// A chunk of text with its byte offset in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan<'a> {
    /// Byte offset of `text` in the input
    pub offset: usize,
    /// Chunk text, trimmed
    pub text: &'a str,
}

/// Recursive splitter with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextSplitter {
    /// Maximum chunk length in characters
    chunk_size: usize,
    /// Maximum characters shared with the previous chunk
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a new splitter
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create from chunking configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator list (coarsest first)
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into trimmed, non-empty spans in document order
    pub fn split<'a>(&self, text: &'a str) -> Vec<TextSpan<'a>> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_range(text, 0..text.len(), &separators)
            .into_iter()
            .filter_map(|range| trimmed_span(text, range))
            .collect()
    }

    /// Split text into owned chunk strings
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split(text).into_iter().map(|s| s.text.to_string()).collect()
    }

    fn split_range(&self, text: &str, range: Range<usize>, separators: &[&str]) -> Vec<Range<usize>> {
        let segment = &text[range.clone()];

        let position = separators
            .iter()
            .position(|s| s.is_empty() || segment.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut fitting = Vec::new();

        for piece in pieces(segment, separator, range.start) {
            if char_len(text, &piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(text, &fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_range(text, piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(text, &fitting));
        }
        chunks
    }

    /// Greedily merge contiguous pieces into windows with overlap
    fn merge(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let mut windows = Vec::new();
        let mut current: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > self.chunk_size && !current.is_empty() {
                if let Some(window) = span_of(&current) {
                    windows.push(window);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            current.push_back((piece.clone(), len));
            total += len;
        }

        if let Some(window) = span_of(&current) {
            windows.push(window);
        }
        windows
    }
}

/// Cut `segment` after every occurrence of `separator`, keeping it attached
fn pieces(segment: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| base + i..base + i + c.len_utf8())
            .collect();
    }

    let mut out = Vec::new();
    let mut start = 0;
    for (i, _) in segment.match_indices(separator) {
        let end = i + separator.len();
        out.push(base + start..base + end);
        start = end;
    }
    if start < segment.len() {
        out.push(base + start..base + segment.len());
    }
    out
}

fn span_of(current: &VecDeque<(Range<usize>, usize)>) -> Option<Range<usize>> {
    let first = current.front()?;
    let last = current.back()?;
    Some(first.0.start..last.0.end)
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

fn trimmed_span(text: &str, range: Range<usize>) -> Option<TextSpan<'_>> {
    let raw = &text[range.clone()];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(TextSpan {
        offset: range.start + leading,
        text: trimmed,
    })
}
